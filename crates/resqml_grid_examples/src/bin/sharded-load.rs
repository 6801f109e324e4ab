use std::rc::Rc;

use anyhow::ensure;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use resqml_grid::prelude::*;
use resqml_grid_examples::{event_logger, init_tracing, log_cells};
use tracing::info;

const WORKERS: u32 = 4;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut rng = StdRng::seed_from_u64(2024);
    let nk = 11;
    let gaps: Vec<bool> = (0..nk - 1).map(|_| rng.next_u32() % 4 == 0).collect();
    let grid: Rc<dyn IjkGridAccessor> = Rc::new(
        InMemoryIjkGrid::regular("reservoir", 6, 5, nk)
            .with_k_gaps(gaps)
            .with_split_line(16, &[(2, 2), (2, 1)])
            .with_local_crs(LocalCrs {
                depth_oriented: true,
                partial: false,
                origin_ordinal1: 450_000.0,
                origin_ordinal2: 6_780_000.0,
                origin_depth_or_elevation: Some(1_800.0),
            }),
    );

    let mut covered = 0;
    let mut total_cells = 0;
    for worker in 0..WORKERS {
        let config = LoadConfig::new().with_worker(worker, WORKERS);
        let mut rep = GridRepresentation::new(SupportingGrid::Ijk(Rc::clone(&grid)), config)?;
        rep.load(&mut event_logger())?;

        let range = rep.range().unwrap_or(HyperslabRange::EMPTY);
        let points = rep.points().map(|p| p.len()).unwrap_or(0);
        info!(
            "worker {worker}/{WORKERS}: layers {}..{}, {points} points, hyperslabbed: {}",
            range.init_k_index,
            range.max_k_index,
            rep.is_hyperslabbed()
        );
        if let Some(cells) = rep.topology() {
            log_cells(&format!("worker {worker}"), &cells);
            total_cells += cells.len();
        }
        if !range.is_empty() {
            ensure!(range.init_k_index == covered, "slab gap before worker {worker}");
            covered = range.max_k_index;
        }
    }

    let expected = (grid.i_cell_count() * grid.j_cell_count() * grid.k_cell_count()) as usize;
    ensure!(covered == nk, "slabs cover {covered} of {nk} layers");
    ensure!(total_cells == expected, "{total_cells} cells built, {expected} expected");
    info!("{WORKERS} workers cover all {nk} layers and {expected} cells exactly once");
    Ok(())
}
