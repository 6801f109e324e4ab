use std::time::Duration;

use criterion::{Criterion, Throughput};
use resqml_grid::prelude::InMemoryIjkGrid;

pub const SAMPLE_SIZE: usize = 20;
pub const WARM_UP: Duration = Duration::from_secs(1);
pub const MEASUREMENT_TIME: Duration = Duration::from_secs(3);

pub fn default_criterion() -> Criterion {
    Criterion::default()
        .configure_from_args()
        .sample_size(SAMPLE_SIZE)
        .warm_up_time(WARM_UP)
        .measurement_time(MEASUREMENT_TIME)
}

pub fn cells_throughput(cells: u64) -> Throughput {
    Throughput::Elements(cells.max(1))
}

/// Square grid of `n * n * nk` cells with a gap after every fourth layer and one
/// faulted pillar.
pub fn faulted_grid(uuid: &str, n: u32, nk: u32) -> InMemoryIjkGrid {
    let gaps = (0..nk.saturating_sub(1)).map(|l| l % 4 == 3).collect();
    let center = (n / 2) * (n + 1) + n / 2;
    InMemoryIjkGrid::regular(uuid, n, n, nk)
        .with_k_gaps(gaps)
        .with_split_line(center, &[(n / 2, n / 2)])
}
