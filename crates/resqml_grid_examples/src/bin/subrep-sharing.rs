use resqml_grid::prelude::*;
use resqml_grid_examples::{event_logger, init_tracing, log_cells};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut collected = VecSink::new();
    let mut logger = event_logger();
    let mut sink = MultiSink::with_sinks(vec![&mut collected as &mut dyn EventSink, &mut logger]);

    let mut registry = GridRegistry::new(LoadConfig::default())?;
    let grid = InMemoryIjkGrid::regular("grid", 4, 4, 3);
    registry.request_grid(SupportingGrid::ijk(grid), &mut sink)?;

    let channel = InMemorySubRepresentation::cells("channel", "grid", (0..48).step_by(5).collect());
    let layer = InMemorySubRepresentation::cells("top-layer", "grid", (0..16).collect());
    for sub in [&channel, &layer] {
        if let Some(cells) = registry.request_sub_representation(sub, &mut sink)? {
            log_cells(sub.uuid(), &cells);
        }
    }
    if let (Some(descriptor), Some(&first)) = (
        registry.grid("grid").and_then(GridRepresentation::descriptor),
        registry
            .sub_representation("channel")
            .and_then(|binder| binder.elements().first()),
    ) {
        let (i, j, k) = descriptor.cell_ijk(first);
        info!("'channel' starts at cell {first} = ({i}, {j}, {k})");
    }
    let linked = registry
        .grid("grid")
        .map(GridRepresentation::sub_rep_linked_count)
        .unwrap_or(0);
    info!("'grid' is shared by {linked} sub-representations");

    // Faces of an IJK grid are not supported and only produce a warning.
    let faces = InMemorySubRepresentation::faces("faults", "grid", vec![0, 1, 2]);
    registry.request_sub_representation(&faces, &mut sink)?;

    // Unloading while linked is allowed; binders keep their point buffer.
    registry.unload_grid("grid", &mut sink);
    if let Some(binder) = registry.sub_representation("channel") {
        info!("'channel' still holds {} points", binder.points().len());
    }

    registry.release_sub_representation("channel", &mut sink);
    registry.release_sub_representation("top-layer", &mut sink);
    registry.close(&mut sink);
    drop(sink);
    info!("{} events, {} warnings reported", collected.len(), collected.warnings().len());
    Ok(())
}
