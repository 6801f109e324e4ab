//! K-slab partitioning of a grid across cooperating workers.
//!
//! Each worker owns a contiguous, disjoint range of K-cell layers; the union over all
//! workers covers the grid exactly once. When the grid has K-gaps, the owned cell range is
//! mapped to the closed range of K-interfaces whose points the worker has to read.
pub mod hyperslab;

pub use hyperslab::{
    k_interface_count, plan_interface_range, plan_range, HyperslabRange, InterfaceRange,
};
