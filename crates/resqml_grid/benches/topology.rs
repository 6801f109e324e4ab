mod common;

use std::hint::black_box;
use std::rc::Rc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use resqml_grid::prelude::*;

fn load_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("topology/load");

    for &n in &[16u32, 48] {
        let nk = 32;
        let grid: Rc<dyn IjkGridAccessor> = Rc::new(common::faulted_grid("g", n, nk));
        group.throughput(common::cells_throughput(n as u64 * n as u64 * nk as u64));

        for &workers in &[1u32, 4] {
            group.bench_with_input(
                BenchmarkId::new(format!("workers_{workers}"), n),
                &n,
                |b, _| {
                    b.iter_batched(
                        || {
                            GridRepresentation::new(
                                SupportingGrid::Ijk(Rc::clone(&grid)),
                                LoadConfig::new().with_worker(0, workers),
                            )
                            .expect("valid config")
                        },
                        |mut rep| {
                            rep.load(&mut ()).expect("load");
                            black_box(rep.topology());
                        },
                        BatchSize::SmallInput,
                    );
                },
            );
        }
    }

    group.finish();
}

fn merge_join_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("topology/merge_join");
    let n = 32;
    let nk = 16;
    let cell_count = n as u64 * n as u64 * nk as u64;
    let mut parent =
        GridRepresentation::new(SupportingGrid::ijk(common::faulted_grid("g", n, nk)), LoadConfig::new())
            .expect("valid config");
    parent.load(&mut ()).expect("load");

    for &every in &[2u32, 16, 128] {
        let mut rng = StdRng::seed_from_u64(0x5EED ^ every as u64);
        let selected: Vec<u64> = (0..cell_count).filter(|_| rng.next_u32() % every == 0).collect();
        group.throughput(common::cells_throughput(selected.len() as u64));
        let sub = InMemorySubRepresentation::cells("s", "g", selected);
        let binder =
            SubRepresentationBinder::attach(&sub, &mut parent, &mut ()).expect("attach");

        group.bench_with_input(BenchmarkId::from_parameter(every), &every, |b, _| {
            b.iter(|| {
                let cells = binder.build_sparse_cells(&parent, &mut ()).expect("build");
                black_box(cells.len());
            });
        });
        binder.detach(&mut ());
    }

    group.finish();
}

fn unstructured_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("topology/unstructured");
    let n = 24u64;
    let row = n + 1;
    let layer = row * row;
    let points = vec![glam::DVec3::ZERO; (layer * (n + 1)) as usize];
    let mut grid = InMemoryUnstructuredGrid::new("u", points);
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                let p = k * layer + j * row + i;
                grid.add_hexahedron([
                    p,
                    p + 1,
                    p + row + 1,
                    p + row,
                    p + layer,
                    p + layer + 1,
                    p + layer + row + 1,
                    p + layer + row,
                ]);
            }
        }
    }
    let topology = UnstructuredTopology::read(&grid).expect("consistent faces");
    group.throughput(common::cells_throughput(topology.cell_count()));

    group.bench_function("hexahedra", |b| {
        b.iter(|| {
            let cells = topology.build_cells(0..topology.cell_count()).expect("build");
            black_box(cells.len());
        });
    });

    group.finish();
}

criterion_group! {
    name = benches;
    config = common::default_criterion();
    targets = load_benches, merge_join_benches, unstructured_benches
}
criterion_main!(benches);
