//! IJK cell corner to point-buffer index mapping.
//!
//! VTK numbers hexahedron corners 0..3 around the bottom face and 4..7 around the top one.
//! RESQML uses the same in-plane order, but which K side is "bottom" depends on the grid's
//! handedness; the swapped permutation exchanges the two faces.
use crate::accessor::IjkGridAccessor;
use crate::config::LoadConfig;
use crate::error::{Error, Result};
use crate::geometry::{IjkGridDescriptor, PointBuffer};

/// RESQML corner slot for each VTK hexahedron corner, indexed by the swap row.
pub const CORRESPONDING_RESQML_CORNER_ID: [[u8; 8]; 2] =
    [[0, 1, 2, 3, 4, 5, 6, 7], [4, 5, 6, 7, 0, 1, 2, 3]];

/// Resolves one VTK hexahedron corner of cell `(i, j, k)` to a local node index.
///
/// `k_interface_node_count * init_interface_index` is subtracted from the accessor's
/// global index when the point buffer starts at K-interface `init_interface_index`.
#[allow(clippy::too_many_arguments)]
pub fn corner_node_index(
    grid: &dyn IjkGridAccessor,
    i: u32,
    j: u32,
    k: u32,
    vtk_corner: u8,
    is_right_handed: bool,
    k_interface_node_count: u64,
    init_interface_index: u32,
) -> Result<u64> {
    let resqml_corner =
        CORRESPONDING_RESQML_CORNER_ID[usize::from(is_right_handed)][vtk_corner as usize];
    let global = grid.xyz_point_index_from_cell_corner(i, j, k, resqml_corner)?;
    let translate_point = k_interface_node_count * init_interface_index as u64;
    global.checked_sub(translate_point).ok_or_else(|| {
        Error::Data(format!(
            "corner {vtk_corner} of cell ({i}, {j}, {k}) resolves to node {global}, \
             below the first buffered node {translate_point}"
        ))
    })
}

/// Per-load constants of the corner mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CornerMapper {
    swap_row: bool,
    k_interface_node_count: u64,
    init_interface_index: u32,
    point_count: usize,
}

impl CornerMapper {
    pub fn new(
        swap_row: bool,
        k_interface_node_count: u64,
        init_interface_index: u32,
        point_count: usize,
    ) -> Self {
        Self {
            swap_row,
            k_interface_node_count,
            init_interface_index,
            point_count,
        }
    }

    /// Builds the mapper matching a grid's handedness and the buffer its indices target.
    pub fn for_buffer(
        descriptor: &IjkGridDescriptor,
        config: &LoadConfig,
        buffer: &PointBuffer,
    ) -> Self {
        let per_interface = buffer.k_interface_node_count();
        let init_interface_index = if per_interface == 0 {
            0
        } else {
            (buffer.origin_node() / per_interface) as u32
        };
        Self::new(
            config
                .handedness_convention
                .table_row(descriptor.is_right_handed),
            per_interface,
            init_interface_index,
            buffer.len(),
        )
    }

    /// Offset subtracted from every global node index.
    pub fn translate_point(&self) -> u64 {
        self.k_interface_node_count * self.init_interface_index as u64
    }

    /// Local node index of one corner, checked against the buffer length.
    pub fn node_index(
        &self,
        grid: &dyn IjkGridAccessor,
        i: u32,
        j: u32,
        k: u32,
        vtk_corner: u8,
    ) -> Result<u64> {
        let node = corner_node_index(
            grid,
            i,
            j,
            k,
            vtk_corner,
            self.swap_row,
            self.k_interface_node_count,
            self.init_interface_index,
        )?;
        if node as usize >= self.point_count {
            return Err(Error::Data(format!(
                "corner {vtk_corner} of cell ({i}, {j}, {k}) resolves to local node {node}, \
                 beyond the {} buffered points",
                self.point_count
            )));
        }
        Ok(node)
    }

    /// The eight corners of cell `(i, j, k)` in VTK hexahedron order.
    pub fn hexahedron(&self, grid: &dyn IjkGridAccessor, i: u32, j: u32, k: u32) -> Result<[u64; 8]> {
        let mut nodes = [0u64; 8];
        for (corner, node) in nodes.iter_mut().enumerate() {
            *node = self.node_index(grid, i, j, k, corner as u8)?;
        }
        Ok(nodes)
    }
}
