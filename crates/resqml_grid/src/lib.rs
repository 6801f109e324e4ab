#![forbid(unsafe_code)]
//! resqml_grid: RESQML grid geometry reconstruction with K-slab partial loading.
//!
//! Modules:
//! - accessor: read-only seams onto the RESQML data access layer, plus in-memory grids
//! - partition: K-slab sharding across cooperating workers
//! - geometry: grid descriptors, CRS transforms and point materialization
//! - topology: corner mapping, IJK hexahedra, unstructured cells and face polygons
//! - representation: grid facades, sub-representation binders and their registry
//! - events, config, error: load diagnostics, configuration and error types
//!
//! For a walkthrough, see the README and the `resqml_grid_examples` binaries.
pub mod accessor;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod partition;
pub mod representation;
pub mod topology;

/// Convenient re-exports for common types. Import with `use resqml_grid::prelude::*;`.
pub mod prelude {
    pub use crate::accessor::memory::{
        InMemoryIjkGrid, InMemorySubRepresentation, InMemoryUnstructuredGrid,
    };
    pub use crate::accessor::{
        CellShape, ElementKind, IjkGridAccessor, LocalCrs, SplitInformationGuard,
        SubRepresentationAccessor, UnstructuredGridAccessor,
    };
    pub use crate::config::{CrsFallback, HandednessConvention, LoadConfig, WorkerRank};
    pub use crate::error::{Error, Result};
    pub use crate::events::{EventSink, FnSink, LoadEvent, LoadEventKind, MultiSink, VecSink};
    pub use crate::geometry::{CrsTransform, IjkGridDescriptor, PointBuffer, PointSource};
    pub use crate::partition::{
        k_interface_count, plan_interface_range, plan_range, HyperslabRange, InterfaceRange,
    };
    pub use crate::representation::{
        GridRegistry, GridRepresentation, RepresentationKind, SubRepLink,
        SubRepresentationBinder, SubRepresentationMode, SupportingGrid,
    };
    pub use crate::topology::{
        build_cells, build_unstructured_cells, corner_node_index, CellConnectivity, CellType,
        CornerMapper, UnstructuredTopology, CORRESPONDING_RESQML_CORNER_ID,
    };
}
