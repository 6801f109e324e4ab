//! Load configuration shared by every representation handled in one process.
//!
//! [`LoadConfig`] carries the worker rank used for K-slab sharding and the policies the
//! geometry and topology stages fall back on when the accessor data is incomplete.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Position of this process among the cooperating workers loading the same grid.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WorkerRank {
    /// Zero-based index of this worker.
    pub index: u32,
    /// Total number of workers.
    pub count: u32,
}

impl WorkerRank {
    /// A single worker owning the whole grid.
    pub const SINGLE: WorkerRank = WorkerRank { index: 0, count: 1 };

    pub fn new(index: u32, count: u32) -> Self {
        Self { index, count }
    }
}

impl Default for WorkerRank {
    fn default() -> Self {
        Self::SINGLE
    }
}

/// Points produced when the coordinate reference system cannot be resolved.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CrsFallback {
    /// Zero-valued points of the expected length.
    #[default]
    ZeroPoints,
    /// Raw accessor coordinates, without origin offset or depth flip.
    IdentityOffsets,
}

/// Which grid handedness selects the swapped corner permutation.
///
/// Two historical variants of the corner mapping disagree on this guard; it is kept
/// configurable until the intended convention is settled.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HandednessConvention {
    /// Swap top and bottom corners when the grid reports right-handed.
    #[default]
    SwapWhenRightHanded,
    /// Swap top and bottom corners when the grid reports left-handed.
    SwapWhenLeftHanded,
}

impl HandednessConvention {
    /// Returns the row of the corner permutation table to use for a grid.
    pub fn table_row(&self, is_right_handed: bool) -> bool {
        match self {
            HandednessConvention::SwapWhenRightHanded => is_right_handed,
            HandednessConvention::SwapWhenLeftHanded => !is_right_handed,
        }
    }
}

/// Configuration applied to every load issued through a facade or registry.
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct LoadConfig {
    /// Rank of this process among the workers sharing the K dimension.
    pub worker: WorkerRank,
    /// Policy used when the CRS is missing or partial.
    pub crs_fallback: CrsFallback,
    /// Corner permutation guard.
    pub handedness_convention: HandednessConvention,
    /// Allows per-K-interface point retrieval. When disabled every worker reads whole grids.
    pub allow_chunked_reads: bool,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            worker: WorkerRank::SINGLE,
            crs_fallback: CrsFallback::ZeroPoints,
            handedness_convention: HandednessConvention::SwapWhenRightHanded,
            allow_chunked_reads: true,
        }
    }
}

impl LoadConfig {
    /// Creates a new [`LoadConfig`] with default policies for a single worker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the worker rank.
    pub fn with_worker(mut self, index: u32, count: u32) -> Self {
        self.worker = WorkerRank::new(index, count);
        self
    }

    /// Sets the CRS fallback policy.
    pub fn with_crs_fallback(mut self, crs_fallback: CrsFallback) -> Self {
        self.crs_fallback = crs_fallback;
        self
    }

    /// Sets the corner permutation guard.
    pub fn with_handedness_convention(mut self, convention: HandednessConvention) -> Self {
        self.handedness_convention = convention;
        self
    }

    /// Enables or disables per-K-interface point retrieval.
    pub fn with_chunked_reads(mut self, allow: bool) -> Self {
        self.allow_chunked_reads = allow;
        self
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.worker.count == 0 {
            return Err(Error::InvalidConfig("worker count must be > 0".into()));
        }
        if self.worker.index >= self.worker.count {
            return Err(Error::InvalidConfig(format!(
                "worker index {} out of range for {} workers",
                self.worker.index, self.worker.count
            )));
        }
        Ok(())
    }
}
