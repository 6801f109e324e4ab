use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use resqml_grid::prelude::*;

fn depth_crs() -> LocalCrs {
    LocalCrs {
        depth_oriented: true,
        partial: false,
        origin_ordinal1: 1000.0,
        origin_ordinal2: 2000.0,
        origin_depth_or_elevation: Some(500.0),
    }
}

fn load(grid: &Rc<InMemoryIjkGrid>, worker: u32, workers: u32) -> GridRepresentation {
    let handle: Rc<dyn IjkGridAccessor> = grid.clone();
    let mut rep = GridRepresentation::new(
        SupportingGrid::Ijk(handle),
        LoadConfig::new().with_worker(worker, workers),
    )
    .expect("valid worker rank");
    let mut sink = VecSink::new();
    rep.load(&mut sink).expect("IJK loads never fail");
    assert!(sink.warnings().is_empty(), "{:?}", sink.warnings());
    rep
}

/// Every worker's cells match the single-worker cells they stand for, corner by corner.
fn assert_shards_match_whole(grid: InMemoryIjkGrid, workers: u32) {
    let grid = Rc::new(grid);
    let whole = load(&grid, 0, 1);
    let whole_points = whole.points().unwrap();
    let whole_cells = whole.topology().unwrap();
    let layer = (grid.i_cell_count() * grid.j_cell_count()) as usize;

    let mut next_layer = 0;
    let mut total_cells = 0;
    for worker in 0..workers {
        let rep = load(&grid, worker, workers);
        let range = rep.range().unwrap();
        if range.is_empty() {
            assert!(rep.points().unwrap().is_empty());
            continue;
        }
        assert_eq!(range.init_k_index, next_layer, "slabs are contiguous");
        next_layer = range.max_k_index;

        let points = rep.points().unwrap();
        let cells = rep.topology().unwrap();
        assert_eq!(cells.len(), layer * range.len() as usize);
        total_cells += cells.len();
        for local in 0..cells.len() {
            let global = range.init_k_index as usize * layer + local;
            assert_eq!(cells.cell_type(local), whole_cells.cell_type(global));
            for (&a, &b) in cells.cell_nodes(local).iter().zip(whole_cells.cell_nodes(global)) {
                assert_eq!(points.points()[a as usize], whole_points.points()[b as usize]);
            }
        }
    }
    assert_eq!(next_layer, grid.k_cell_count());
    assert_eq!(total_cells, whole_cells.len());
}

#[test]
fn slabs_reproduce_the_whole_grid() {
    for workers in 1..=5 {
        let grid = InMemoryIjkGrid::regular("g", 3, 2, 7).with_local_crs(depth_crs());
        assert_shards_match_whole(grid, workers);
    }
}

#[test]
fn slabs_reproduce_the_whole_grid_with_gaps() {
    let mut rng = StdRng::seed_from_u64(7);
    for nk in 2..=9u32 {
        let gaps: Vec<bool> = (0..nk - 1).map(|_| rng.next_u32() % 3 == 0).collect();
        for workers in [2, 3, 4] {
            let grid = InMemoryIjkGrid::regular("g", 2, 2, nk)
                .with_k_gaps(gaps.clone())
                .with_local_crs(depth_crs());
            assert_shards_match_whole(grid, workers);
        }
    }
}

#[test]
fn slabs_reproduce_split_pillars() {
    let grid = InMemoryIjkGrid::regular("g", 2, 2, 6)
        .with_split_line(4, &[(1, 1), (1, 0)])
        .with_right_handed(true)
        .with_k_gaps(vec![false, true, false, false, true]);
    assert_shards_match_whole(grid, 3);
}

#[test]
fn hyperslabbed_workers_read_only_their_interfaces() {
    let grid = Rc::new(InMemoryIjkGrid::regular("g", 1, 1, 10).with_k_gaps(vec![
        false, true, false, false, false, true, false, false, false,
    ]));
    let rep = load(&grid, 1, 3);
    // Layers 4..8 with a gap after layer 1 below and after layer 5 inside.
    assert_eq!(rep.range(), Some(HyperslabRange::new(4, 8)));
    assert!(rep.is_hyperslabbed());
    let points = rep.points().unwrap();
    assert_eq!(
        points.source(),
        PointSource::KInterfaces(InterfaceRange::new(5, 10))
    );
    assert_eq!(points.len(), 6 * 4);
    assert_eq!(grid.k_interface_reads(), 1 + 6);
    assert_eq!(grid.whole_grid_reads(), 0);
}

#[test]
fn compressed_geometry_disables_hyperslabbing() {
    let grid = Rc::new(InMemoryIjkGrid::regular("g", 1, 1, 4).with_compressed_geometry());
    let rep = load(&grid, 1, 2);
    assert!(!rep.is_hyperslabbed());
    assert_eq!(rep.points().unwrap().source(), PointSource::WholeGrid);
    assert_eq!(grid.k_interface_reads(), 0);
}

#[test]
fn ranges_partition_random_grids() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let k = rng.next_u32() % 64;
        let workers = 1 + rng.next_u32() % 16;
        let mut covered = 0;
        for worker in 0..workers {
            let range = plan_range(k, worker, workers);
            if !range.is_empty() {
                assert_eq!(range.init_k_index, covered);
                covered = range.max_k_index;
            }
        }
        assert_eq!(covered, k, "k={k} workers={workers}");
    }
}
