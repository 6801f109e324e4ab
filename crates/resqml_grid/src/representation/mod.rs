//! Representation facades, sub-representation binders and their registry.
//!
//! A [`GridRepresentation`] owns the geometry of one supporting grid and hands out
//! shared, read-only views of it. Every [`SubRepresentationBinder`] attached to it holds a
//! [`SubRepLink`] that keeps the facade's link count accurate until it is released.
//! [`GridRegistry`] ties both together by UUID.
use std::rc::Rc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::accessor::{IjkGridAccessor, UnstructuredGridAccessor};

pub mod binder;
pub mod grid;
pub mod link;
pub mod registry;

pub use binder::SubRepresentationBinder;
pub use grid::GridRepresentation;
pub use link::SubRepLink;
pub use registry::GridRegistry;

/// Grid a facade loads geometry from, dispatched once at construction.
#[derive(Clone)]
pub enum SupportingGrid {
    Ijk(Rc<dyn IjkGridAccessor>),
    Unstructured(Rc<dyn UnstructuredGridAccessor>),
}

impl SupportingGrid {
    pub fn ijk<G: IjkGridAccessor + 'static>(grid: G) -> Self {
        SupportingGrid::Ijk(Rc::new(grid))
    }

    pub fn unstructured<G: UnstructuredGridAccessor + 'static>(grid: G) -> Self {
        SupportingGrid::Unstructured(Rc::new(grid))
    }

    pub fn uuid(&self) -> &str {
        match self {
            SupportingGrid::Ijk(grid) => grid.uuid(),
            SupportingGrid::Unstructured(grid) => grid.uuid(),
        }
    }

    pub fn kind(&self) -> RepresentationKind {
        match self {
            SupportingGrid::Ijk(_) => RepresentationKind::IjkGrid,
            SupportingGrid::Unstructured(_) => RepresentationKind::UnstructuredGrid,
        }
    }
}

impl std::fmt::Debug for SupportingGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SupportingGrid")
            .field(&self.kind())
            .field(&self.uuid())
            .finish()
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RepresentationKind {
    IjkGrid,
    UnstructuredGrid,
}

/// What a binder emits for its selected elements.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubRepresentationMode {
    /// Volume cells of the supporting grid.
    SparseCells,
    /// Polygons of the supporting grid's faces.
    SparseFaces,
}
