#![forbid(unsafe_code)]
//! Shared helpers for the `resqml_grid` demo binaries.
use std::collections::BTreeMap;

use resqml_grid::prelude::{CellConnectivity, CellType, FnSink, LoadEvent, LoadEventKind};
use tracing::info;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, defaulting to crate-level info.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,resqml_grid=info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

/// Counts cell records per type, placeholders included.
pub fn cell_type_histogram(cells: &CellConnectivity) -> BTreeMap<String, usize> {
    let mut histogram = BTreeMap::new();
    for cell_type in cells.types() {
        *histogram.entry(format!("{cell_type:?}")).or_insert(0) += 1;
    }
    histogram
}

/// Logs a one-line summary of a cell stream.
pub fn log_cells(label: &str, cells: &CellConnectivity) {
    info!(
        "{label}: {} records, {} active, {} blanked, types {:?}",
        cells.len(),
        cells.active_count(),
        cells.count_of(CellType::Empty),
        cell_type_histogram(cells)
    );
}

/// Sink that logs every event except warnings, which the library already traces.
pub fn event_logger() -> FnSink<impl FnMut(LoadEvent)> {
    FnSink::new(|event: LoadEvent| {
        if event.kind() != LoadEventKind::Warning {
            info!("event: {event:?}");
        }
    })
}
