use glam::DVec3;
use resqml_grid::prelude::*;
use resqml_grid_examples::{init_tracing, log_cells};
use tracing::{info, warn};

/// A column of `n` unit hexahedra followed by a pyramid cap and a pentagonal prism.
fn build_grid(n: u64) -> InMemoryUnstructuredGrid {
    let mut points = Vec::new();
    for k in 0..=n {
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            points.push(DVec3::new(x, y, k as f64));
        }
    }
    let apex = points.len() as u64;
    points.push(DVec3::new(0.5, 0.5, n as f64 + 1.0));
    let prism = points.len() as u64;
    for z in [0.0, 1.0] {
        for step in 0..5 {
            let angle = std::f64::consts::TAU * step as f64 / 5.0;
            points.push(DVec3::new(3.0 + angle.cos(), angle.sin(), z));
        }
    }

    let mut grid = InMemoryUnstructuredGrid::new("column", points);
    for k in 0..n {
        let b = 4 * k;
        grid.add_hexahedron([b, b + 1, b + 2, b + 3, b + 4, b + 5, b + 6, b + 7]);
    }

    let top = 4 * n;
    let cap = [
        (grid.add_face(&[top, top + 3, top + 2, top + 1]), true),
        (grid.add_face(&[top, top + 1, apex]), true),
        (grid.add_face(&[top + 1, top + 2, apex]), true),
        (grid.add_face(&[top + 2, top + 3, apex]), true),
        (grid.add_face(&[top + 3, top, apex]), true),
    ];
    grid.add_cell(&cap);

    let p = |n: u64| prism + n;
    let mut faces = vec![
        (grid.add_face(&[p(0), p(4), p(3), p(2), p(1)]), true),
        (grid.add_face(&[p(5), p(6), p(7), p(8), p(9)]), true),
    ];
    for s in 0..5 {
        let t = (s + 1) % 5;
        faces.push((grid.add_face(&[p(s), p(t), p(t + 5), p(s + 5)]), true));
    }
    grid.add_cell(&faces);
    grid
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut registry = GridRegistry::new(LoadConfig::default())?;
    let grid = build_grid(5);
    let face_count = grid.face_count();
    let rep = registry.request_grid(SupportingGrid::unstructured(grid), &mut ())?;
    if let Some(points) = rep.points() {
        let flat = points.to_flat();
        info!("column: {} points, {} coordinates for the VTK point array", points.len(), flat.len());
    }
    if let Some(cells) = rep.topology() {
        log_cells("column", &cells);
        for cell in 0..cells.len() {
            if let Some(stream) = cells.face_stream(cell) {
                info!("cell {cell} kept as polyhedron, face stream of {} entries", stream.len());
            }
        }
    }

    let boundary = InMemorySubRepresentation::faces("outer-faces", "column", (0..face_count).step_by(6).collect());
    if let Some(polygons) = registry.request_sub_representation(&boundary, &mut ())? {
        log_cells("outer-faces", &polygons);
    }

    // A grid declared hexahedral fails on its first non-hexahedral cell.
    let strict = build_grid(2).with_shape(CellShape::Hexahedral);
    let mut strict = GridRepresentation::new(SupportingGrid::unstructured(strict), LoadConfig::default())?;
    match strict.load(&mut ()) {
        Ok(()) => info!("strict grid loaded"),
        Err(e) => warn!("strict grid rejected: {e}"),
    }
    Ok(())
}
