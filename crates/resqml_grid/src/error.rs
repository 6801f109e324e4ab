//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Most
//! variants describe conditions that the load pipeline absorbs into diagnostics; only
//! [`Error::MalformedCell`] is expected to reach the caller of a representation load.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("accessor error: {0}")]
    Accessor(String),

    #[error("coordinate reference system of '{uuid}' is missing or partial")]
    MissingCrs { uuid: String },

    #[error("data error: {0}")]
    Data(String),

    #[error("unsupported sub-representation '{uuid}': {reason}")]
    UnsupportedSubRepresentation { uuid: String, reason: String },

    #[error("supporting grid '{uuid}' is not registered")]
    MissingSupportingGrid { uuid: String },

    #[error("malformed cell {cell}: {reason}")]
    MalformedCell { cell: u64, reason: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Returns `true` for the one error class that fails a representation load outright.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MalformedCell { .. })
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}
