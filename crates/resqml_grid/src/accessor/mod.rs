//! Read-only seams onto the external RESQML data access layer.
//!
//! The crate never parses EPC or HDF5 content itself. Everything it knows about a grid comes
//! through the traits defined here:
//! - [`IjkGridAccessor`] for structured corner-point grids,
//! - [`UnstructuredGridAccessor`] for face-defined polyhedral grids,
//! - [`SubRepresentationAccessor`] for sparse cell or face subsets of either.
//!
//! Point coordinates cross the seam as [`mint::Point3<f64>`] and are converted to
//! [`glam::DVec3`] on the crate side. All calls are synchronous and blocking.
//!
//! [`memory`] provides in-memory implementations used by tests, benches and demos.
use mint::Point3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod memory;

/// Local coordinate reference system of a grid patch.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocalCrs {
    /// Z values increase downwards.
    pub depth_oriented: bool,
    /// The CRS is only a reference and cannot be resolved locally.
    pub partial: bool,
    /// X ordinate of the local origin in the global frame.
    pub origin_ordinal1: f64,
    /// Y ordinate of the local origin in the global frame.
    pub origin_ordinal2: f64,
    /// Depth or elevation of the local origin, when the CRS carries one.
    pub origin_depth_or_elevation: Option<f64>,
}

/// Kind of element a sub-representation patch selects from its supporting representation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Cells,
    Faces,
    /// Any other RESQML indexable element (nodes, edges, pillars, ...).
    Other(String),
}

/// Cell shape declared by an unstructured grid.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellShape {
    Tetrahedral,
    Pyramidal,
    Prism,
    Hexahedral,
    /// Cells of mixed or arbitrary shape.
    #[default]
    Polyhedral,
}

/// Structured IJK corner-point grid.
pub trait IjkGridAccessor {
    fn uuid(&self) -> &str;

    fn i_cell_count(&self) -> u32;
    fn j_cell_count(&self) -> u32;
    fn k_cell_count(&self) -> u32;

    /// Whether the grid's corner order follows a right-handed convention.
    fn is_right_handed(&self) -> bool;

    fn xyz_point_count_of_all_patches(&self) -> u64;
    /// Node count of a single K-interface, split coordinate lines included.
    fn xyz_point_count_of_k_interface(&self) -> u64;

    /// Points of one K-interface, in local CRS coordinates.
    fn xyz_points_of_k_interface(&self, k_interface: u32) -> Result<Vec<Point3<f64>>>;
    /// Every point of the grid, in global CRS coordinates.
    fn xyz_points_of_all_patches_in_global_crs(&self) -> Result<Vec<Point3<f64>>>;

    /// Global node index of a RESQML cell corner (0..8), split pillars resolved.
    ///
    /// Requires split information to be loaded when the grid has split coordinate lines.
    fn xyz_point_index_from_cell_corner(&self, i: u32, j: u32, k: u32, corner: u8)
        -> Result<u64>;

    fn has_cell_geometry_is_defined_flags(&self) -> bool;
    /// One flag per cell of the whole grid, in K, J, I order.
    fn cell_geometry_is_defined_flags(&self) -> Result<Vec<bool>>;

    fn k_gaps_count(&self) -> u32;
    /// `k_cell_count - 1` flags; `true` when a gap follows the layer.
    fn k_gaps(&self) -> Result<Vec<bool>>;

    fn is_node_geometry_compressed(&self) -> bool;

    fn load_split_information(&self) -> Result<()>;
    fn unload_split_information(&self);

    /// `Ok(None)` when the grid references no CRS.
    fn local_crs(&self, patch_index: u32) -> Result<Option<LocalCrs>>;
}

/// Unstructured grid whose cells are described by faces.
///
/// Cumulative arrays follow the RESQML convention: entry `n` is the running total up to
/// and including element `n`, without a leading zero.
pub trait UnstructuredGridAccessor {
    fn uuid(&self) -> &str;

    fn cell_count(&self) -> u64;
    fn face_count(&self) -> u64;
    fn cell_shape(&self) -> CellShape;

    fn xyz_point_count_of_all_patches(&self) -> u64;
    fn xyz_points_of_all_patches_in_global_crs(&self) -> Result<Vec<Point3<f64>>>;

    fn cumulative_face_count_per_cell(&self) -> Result<Vec<u64>>;
    fn face_indices_of_cells(&self) -> Result<Vec<u64>>;
    fn cumulative_node_count_per_face(&self) -> Result<Vec<u64>>;
    fn node_indices_of_faces(&self) -> Result<Vec<u64>>;
    /// One flag per cell face (indexed like [`Self::face_indices_of_cells`]); `true` when
    /// the face node order yields an outward normal by the right-hand rule.
    fn cell_face_is_right_handed(&self) -> Result<Vec<bool>>;

    fn local_crs(&self, patch_index: u32) -> Result<Option<LocalCrs>>;
}

/// Sparse subset of a supporting representation's cells or faces.
pub trait SubRepresentationAccessor {
    fn uuid(&self) -> &str;
    /// UUID of the grid the element indices refer to.
    fn supporting_representation_uuid(&self) -> &str;

    fn patch_count(&self) -> u32;
    fn element_kind_of_patch(&self, patch_index: u32) -> ElementKind;
    fn element_count_of_patch(&self, patch_index: u32) -> u64;
    /// Sorted ascending element indices into the supporting representation.
    fn element_indices_of_patch(&self, patch_index: u32) -> Result<Vec<u64>>;
    fn are_element_indices_pairwise(&self, patch_index: u32) -> bool;
}

/// Keeps a grid's split information loaded for as long as it lives.
///
/// Dropping the guard unloads the information, including on early returns and unwinding.
pub struct SplitInformationGuard<'a> {
    grid: &'a dyn IjkGridAccessor,
}

impl<'a> SplitInformationGuard<'a> {
    pub fn load(grid: &'a dyn IjkGridAccessor) -> Result<Self> {
        grid.load_split_information()?;
        Ok(Self { grid })
    }
}

impl Drop for SplitInformationGuard<'_> {
    fn drop(&mut self) {
        self.grid.unload_split_information();
    }
}
