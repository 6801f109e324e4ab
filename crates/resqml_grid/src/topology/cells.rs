//! Hexahedral cell stream of an IJK grid's owned K-slab.
use tracing::debug;

use crate::accessor::{IjkGridAccessor, SplitInformationGuard};
use crate::events::{emit_warning, EventSink};
use crate::geometry::IjkGridDescriptor;
use crate::partition::HyperslabRange;
use crate::topology::{CellConnectivity, CellType, CornerMapper};

/// Geometry-defined flags of the cells in `range`, in K, J, I order.
///
/// Grids without flags, and flags that cannot be read, count every cell as active.
pub fn active_cell_mask(
    grid: &dyn IjkGridAccessor,
    descriptor: &IjkGridDescriptor,
    range: HyperslabRange,
    sink: &mut dyn EventSink,
) -> Vec<bool> {
    let layer = descriptor.layer_cell_count() as usize;
    let owned = layer * range.len() as usize;
    if !descriptor.has_active_cell_mask {
        return vec![true; owned];
    }
    match grid.cell_geometry_is_defined_flags() {
        Ok(flags) if flags.len() as u64 == descriptor.cell_count() => {
            let start = layer * range.init_k_index as usize;
            flags[start..start + owned].to_vec()
        }
        Ok(flags) => {
            emit_warning(
                sink,
                grid.uuid(),
                format!(
                    "{} geometry-defined flags for {} cells, treating all cells as active",
                    flags.len(),
                    descriptor.cell_count()
                ),
            );
            vec![true; owned]
        }
        Err(e) => {
            emit_warning(
                sink,
                grid.uuid(),
                format!("cannot read geometry-defined flags, treating all cells as active: {e}"),
            );
            vec![true; owned]
        }
    }
}

/// Emits one record per cell of `range`: a hexahedron for active cells, an empty
/// placeholder otherwise.
///
/// Cells are visited K-major, then J, then I, so record `n` is local cell `n` of the slab.
/// Corners that cannot be resolved inside the mapper's buffer blank their cell too; all
/// such cells are reported in a single warning.
pub fn build_cells(
    grid: &dyn IjkGridAccessor,
    descriptor: &IjkGridDescriptor,
    mapper: &CornerMapper,
    range: HyperslabRange,
    sink: &mut dyn EventSink,
) -> CellConnectivity {
    let owned = descriptor.layer_cell_count() as usize * range.len() as usize;
    let mut cells = CellConnectivity::with_capacity(owned, owned * 8);
    if owned == 0 {
        return cells;
    }

    let active = active_cell_mask(grid, descriptor, range, sink);
    let _guard = match SplitInformationGuard::load(grid) {
        Ok(guard) => Some(guard),
        Err(e) => {
            emit_warning(
                sink,
                grid.uuid(),
                format!("cannot load split information: {e}"),
            );
            None
        }
    };

    let mut unresolved = 0usize;
    let mut first_failure = None;
    let mut local = 0usize;
    for k in range.layers() {
        for j in 0..descriptor.j_cell_count {
            for i in 0..descriptor.i_cell_count {
                if !active[local] {
                    cells.push_empty();
                } else {
                    match mapper.hexahedron(grid, i, j, k) {
                        Ok(nodes) => cells.push_cell(CellType::Hexahedron, &nodes),
                        Err(e) => {
                            unresolved += 1;
                            first_failure.get_or_insert(e);
                            cells.push_empty();
                        }
                    }
                }
                local += 1;
            }
        }
    }

    if let Some(e) = first_failure {
        emit_warning(
            sink,
            grid.uuid(),
            format!("{unresolved} cells blanked after corner lookup failures, first: {e}"),
        );
    }
    debug!(
        "'{}': built {} cells for layers {}..{}",
        grid.uuid(),
        cells.len(),
        range.init_k_index,
        range.max_k_index
    );
    cells
}
