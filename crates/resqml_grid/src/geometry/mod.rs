//! Point geometry of grids: descriptors, CRS handling and point materialization.
//!
//! A grid's nodes are read once per load into a [`PointBuffer`], either whole or as the
//! K-slab a worker owns, and then shared read-only with every consumer of that grid.
pub mod crs;
pub mod points;

use glam::DVec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use crs::CrsTransform;
pub use points::{materialize_points, materialize_unstructured_points, probe_k_interface_reads};

use crate::accessor::IjkGridAccessor;
use crate::events::{emit_warning, EventSink};
use crate::partition::InterfaceRange;

/// Retrieval path that produced a [`PointBuffer`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointSource {
    /// One read of every point, in global coordinates.
    WholeGrid,
    /// One read per K-interface of the owned slab, offset by the local CRS origin.
    KInterfaces(InterfaceRange),
    /// Zero-valued placeholder after an unresolvable CRS or a failed read.
    Fallback,
    /// Nothing to read: the worker owns no layer.
    Empty,
}

/// Dense node coordinates of one grid, or of one worker's slab of it.
///
/// `points[n]` holds global node `origin_node + n`. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct PointBuffer {
    points: Vec<DVec3>,
    origin_node: u64,
    k_interface_node_count: u64,
    source: PointSource,
}

impl PointBuffer {
    pub fn new(
        points: Vec<DVec3>,
        origin_node: u64,
        k_interface_node_count: u64,
        source: PointSource,
    ) -> Self {
        Self {
            points,
            origin_node,
            k_interface_node_count,
            source,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, 0, PointSource::Empty)
    }

    pub fn points(&self) -> &[DVec3] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Global index of the first node held, subtracted from every resolved corner index.
    pub fn origin_node(&self) -> u64 {
        self.origin_node
    }

    pub fn k_interface_node_count(&self) -> u64 {
        self.k_interface_node_count
    }

    pub fn source(&self) -> PointSource {
        self.source
    }

    /// Returns `true` when the buffer holds only a slab of the grid's K-interfaces.
    pub fn is_partial(&self) -> bool {
        matches!(self.source, PointSource::KInterfaces(_))
    }

    /// Converts a global node index to a position in this buffer.
    pub fn local_index(&self, global_node: u64) -> Option<usize> {
        let local = global_node.checked_sub(self.origin_node)?;
        let local = usize::try_from(local).ok()?;
        (local < self.points.len()).then_some(local)
    }

    /// Flat `x, y, z` coordinates, as consumed by VTK point arrays.
    pub fn to_flat(&self) -> Vec<f64> {
        self.points.iter().flat_map(|p| p.to_array()).collect()
    }
}

/// Immutable description of an IJK grid, read once per load.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct IjkGridDescriptor {
    pub i_cell_count: u32,
    pub j_cell_count: u32,
    pub k_cell_count: u32,
    pub is_right_handed: bool,
    pub is_depth_oriented: bool,
    pub has_active_cell_mask: bool,
    /// `true` at layer `l` when a gap interface follows it.
    pub k_gap_after_layer: Option<Vec<bool>>,
    pub is_node_geometry_compressed: bool,
}

impl IjkGridDescriptor {
    /// Reads the descriptor, absorbing unreadable gap flags or CRS into diagnostics.
    pub fn read(grid: &dyn IjkGridAccessor, sink: &mut dyn EventSink) -> Self {
        let k_gap_after_layer = if grid.k_gaps_count() > 0 {
            match grid.k_gaps() {
                Ok(gaps) => Some(gaps),
                Err(e) => {
                    emit_warning(
                        sink,
                        grid.uuid(),
                        format!("cannot read K gaps, assuming none: {e}"),
                    );
                    None
                }
            }
        } else {
            None
        };

        let is_depth_oriented = match grid.local_crs(0) {
            Ok(Some(crs)) => !crs.partial && crs.depth_oriented,
            _ => false,
        };

        Self {
            i_cell_count: grid.i_cell_count(),
            j_cell_count: grid.j_cell_count(),
            k_cell_count: grid.k_cell_count(),
            is_right_handed: grid.is_right_handed(),
            is_depth_oriented,
            has_active_cell_mask: grid.has_cell_geometry_is_defined_flags(),
            k_gap_after_layer,
            is_node_geometry_compressed: grid.is_node_geometry_compressed(),
        }
    }

    /// Number of cells in one K-layer.
    pub fn layer_cell_count(&self) -> u64 {
        self.i_cell_count as u64 * self.j_cell_count as u64
    }

    pub fn cell_count(&self) -> u64 {
        self.layer_cell_count() * self.k_cell_count as u64
    }

    pub fn k_gaps(&self) -> Option<&[bool]> {
        self.k_gap_after_layer.as_deref()
    }

    /// Linear cell index in K, J, I order.
    pub fn cell_index(&self, i: u32, j: u32, k: u32) -> u64 {
        (k as u64 * self.j_cell_count as u64 + j as u64) * self.i_cell_count as u64 + i as u64
    }

    /// Inverse of [`Self::cell_index`].
    pub fn cell_ijk(&self, cell: u64) -> (u32, u32, u32) {
        let ni = self.i_cell_count as u64;
        let nj = self.j_cell_count as u64;
        let i = cell % ni;
        let j = (cell / ni) % nj;
        let k = cell / (ni * nj);
        (i as u32, j as u32, k as u32)
    }
}
