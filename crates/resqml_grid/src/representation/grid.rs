//! Facade owning the loaded geometry of one supporting grid.
use std::rc::Rc;

use tracing::{debug, info};

use crate::accessor::{IjkGridAccessor, UnstructuredGridAccessor};
use crate::config::LoadConfig;
use crate::error::Result;
use crate::events::{emit, emit_warning, EventSink, LoadEvent};
use crate::geometry::{
    materialize_points, materialize_unstructured_points, probe_k_interface_reads,
    IjkGridDescriptor, PointBuffer,
};
use crate::partition::{plan_interface_range, plan_range, HyperslabRange};
use crate::representation::link::{LinkCounter, SubRepLink};
use crate::representation::{RepresentationKind, SupportingGrid};
use crate::topology::{
    build_cells, build_unstructured_cells, CellConnectivity, CornerMapper, UnstructuredTopology,
};

struct LoadedGeometry {
    points: Rc<PointBuffer>,
    cells: Rc<CellConnectivity>,
    range: Option<HyperslabRange>,
    descriptor: Option<IjkGridDescriptor>,
    unstructured: Option<Rc<UnstructuredTopology>>,
    hyperslabbed: bool,
}

/// Loaded state of one grid: its point buffer, its cells and the sub-representations
/// linked to it.
///
/// Geometry is materialized once by [`GridRepresentation::load`] and shared as
/// `Rc<PointBuffer>`; later loads return immediately. The facade is single-threaded.
pub struct GridRepresentation {
    grid: SupportingGrid,
    config: LoadConfig,
    links: LinkCounter,
    loaded: Option<LoadedGeometry>,
}

impl GridRepresentation {
    /// Creates an unloaded facade, rejecting an invalid configuration.
    pub fn new(grid: SupportingGrid, config: LoadConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            grid,
            config,
            links: LinkCounter::default(),
            loaded: None,
        })
    }

    pub fn uuid(&self) -> &str {
        self.grid.uuid()
    }

    pub fn kind(&self) -> RepresentationKind {
        self.grid.kind()
    }

    pub fn supporting_grid(&self) -> &SupportingGrid {
        &self.grid
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Materializes points and cells on first call.
    ///
    /// Data problems are reported through `sink` and never fail the load; a malformed
    /// unstructured cell does, and leaves the facade unloaded.
    pub fn load(&mut self, sink: &mut dyn EventSink) -> Result<()> {
        if self.loaded.is_some() {
            debug!("'{}' already loaded", self.uuid());
            return Ok(());
        }
        info!("loading '{}'", self.uuid());
        emit(
            sink,
            LoadEvent::LoadStarted {
                uuid: self.uuid().to_owned(),
            },
        );

        let loaded = match &self.grid {
            SupportingGrid::Ijk(grid) => load_ijk(grid.as_ref(), &self.config, sink),
            SupportingGrid::Unstructured(grid) => {
                load_unstructured(grid.as_ref(), &self.config, sink)?
            }
        };
        emit(
            sink,
            LoadEvent::CellsBuilt {
                uuid: self.uuid().to_owned(),
                cell_count: loaded.cells.len(),
                active_count: loaded.cells.active_count(),
            },
        );
        info!(
            "loaded '{}': {} points, {} cells",
            self.uuid(),
            loaded.points.len(),
            loaded.cells.len()
        );
        self.loaded = Some(loaded);
        Ok(())
    }

    /// Drops the loaded geometry.
    ///
    /// Linked sub-representations keep their own handle on the old point buffer; unloading
    /// while any remain is reported but allowed.
    pub fn unload(&mut self, sink: &mut dyn EventSink) {
        if self.loaded.take().is_none() {
            return;
        }
        let linked_count = self.sub_rep_linked_count();
        if linked_count > 0 {
            emit_warning(
                sink,
                self.grid.uuid(),
                format!("unloaded while {linked_count} sub-representations are still linked"),
            );
        }
        info!("unloaded '{}'", self.uuid());
        emit(
            sink,
            LoadEvent::Unloaded {
                uuid: self.uuid().to_owned(),
                linked_count,
            },
        );
    }

    /// Records a new sub-representation depending on this grid.
    pub fn register_sub_rep(&self) -> SubRepLink {
        SubRepLink::acquire(&self.links, self.grid.uuid())
    }

    pub fn sub_rep_linked_count(&self) -> usize {
        self.links.get()
    }

    pub fn points(&self) -> Option<Rc<PointBuffer>> {
        self.loaded.as_ref().map(|l| Rc::clone(&l.points))
    }

    pub fn topology(&self) -> Option<Rc<CellConnectivity>> {
        self.loaded.as_ref().map(|l| Rc::clone(&l.cells))
    }

    /// K-slab owned by this worker, for IJK grids.
    pub fn range(&self) -> Option<HyperslabRange> {
        self.loaded.as_ref().and_then(|l| l.range)
    }

    pub fn descriptor(&self) -> Option<&IjkGridDescriptor> {
        self.loaded.as_ref().and_then(|l| l.descriptor.as_ref())
    }

    pub fn unstructured_topology(&self) -> Option<Rc<UnstructuredTopology>> {
        self.loaded.as_ref().and_then(|l| l.unstructured.clone())
    }

    /// Returns `true` when the point buffer holds only the owned K-slab.
    pub fn is_hyperslabbed(&self) -> bool {
        self.loaded.as_ref().is_some_and(|l| l.hyperslabbed)
    }
}

impl std::fmt::Debug for GridRepresentation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridRepresentation")
            .field("grid", &self.grid)
            .field("loaded", &self.is_loaded())
            .field("linked", &self.sub_rep_linked_count())
            .finish()
    }
}

fn load_ijk(
    grid: &dyn IjkGridAccessor,
    config: &LoadConfig,
    sink: &mut dyn EventSink,
) -> LoadedGeometry {
    let descriptor = IjkGridDescriptor::read(grid, sink);
    let k_cell_count = descriptor.k_cell_count;
    let range = plan_range(k_cell_count, config.worker.index, config.worker.count);

    let hyperslabbed = !range.is_empty()
        && !range.covers(k_cell_count)
        && !descriptor.is_node_geometry_compressed
        && config.allow_chunked_reads
        && probe_k_interface_reads(grid);
    let interfaces = hyperslabbed.then(|| plan_interface_range(descriptor.k_gaps(), range));
    emit(
        sink,
        LoadEvent::RangePlanned {
            uuid: grid.uuid().to_owned(),
            range,
            interfaces,
        },
    );

    let points = if range.is_empty() {
        debug!("'{}': worker {} owns no layer", grid.uuid(), config.worker.index);
        PointBuffer::empty()
    } else {
        materialize_points(grid, &descriptor, interfaces, config, sink)
    };
    emit(
        sink,
        LoadEvent::PointsMaterialized {
            uuid: grid.uuid().to_owned(),
            point_count: points.len(),
            source: points.source(),
        },
    );

    let mapper = CornerMapper::for_buffer(&descriptor, config, &points);
    let cells = build_cells(grid, &descriptor, &mapper, range, sink);
    LoadedGeometry {
        points: Rc::new(points),
        cells: Rc::new(cells),
        range: Some(range),
        descriptor: Some(descriptor),
        unstructured: None,
        hyperslabbed,
    }
}

fn load_unstructured(
    grid: &dyn UnstructuredGridAccessor,
    config: &LoadConfig,
    sink: &mut dyn EventSink,
) -> Result<LoadedGeometry> {
    let points = materialize_unstructured_points(grid, config, sink);
    emit(
        sink,
        LoadEvent::PointsMaterialized {
            uuid: grid.uuid().to_owned(),
            point_count: points.len(),
            source: points.source(),
        },
    );
    let (topology, cells) = build_unstructured_cells(grid, sink)?;
    Ok(LoadedGeometry {
        points: Rc::new(points),
        cells: Rc::new(cells),
        range: None,
        descriptor: None,
        unstructured: topology.map(Rc::new),
        hyperslabbed: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::memory::{InMemoryIjkGrid, InMemoryUnstructuredGrid};
    use crate::accessor::CellShape;
    use crate::error::Error;
    use crate::events::{LoadEventKind, VecSink};
    use crate::geometry::PointSource;
    use crate::partition::InterfaceRange;
    use glam::DVec3;

    fn facade(grid: InMemoryIjkGrid, config: LoadConfig) -> GridRepresentation {
        GridRepresentation::new(SupportingGrid::ijk(grid), config).unwrap()
    }

    #[test]
    fn invalid_worker_rank_is_rejected() {
        let grid = SupportingGrid::ijk(InMemoryIjkGrid::regular("g", 1, 1, 1));
        let err = GridRepresentation::new(grid, LoadConfig::new().with_worker(2, 2)).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn load_is_idempotent() {
        let mut rep = facade(InMemoryIjkGrid::regular("g", 2, 2, 2), LoadConfig::default());
        let mut sink = VecSink::new();
        rep.load(&mut sink).unwrap();
        let first = rep.points().unwrap();
        let events = sink.len();
        rep.load(&mut sink).unwrap();
        assert!(Rc::ptr_eq(&first, &rep.points().unwrap()));
        assert_eq!(sink.len(), events);
        assert_eq!(rep.topology().unwrap().len(), 8);
        assert!(!rep.is_hyperslabbed());
    }

    #[test]
    fn load_events_follow_pipeline_order() {
        let mut rep = facade(InMemoryIjkGrid::regular("g", 1, 1, 4), LoadConfig::new().with_worker(1, 2));
        let mut sink = VecSink::new();
        rep.load(&mut sink).unwrap();
        let kinds: Vec<_> = sink.as_slice().iter().map(LoadEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                LoadEventKind::LoadStarted,
                LoadEventKind::RangePlanned,
                LoadEventKind::PointsMaterialized,
                LoadEventKind::CellsBuilt,
            ]
        );
        assert_eq!(
            sink.as_slice()[1],
            LoadEvent::RangePlanned {
                uuid: "g".into(),
                range: HyperslabRange::new(2, 4),
                interfaces: Some(InterfaceRange::new(2, 4)),
            }
        );
    }

    #[test]
    fn second_worker_reads_only_its_slab() {
        let grid = Rc::new(InMemoryIjkGrid::regular("g", 2, 2, 4));
        let handle: Rc<dyn IjkGridAccessor> = grid.clone();
        let mut rep =
            GridRepresentation::new(SupportingGrid::Ijk(handle), LoadConfig::new().with_worker(1, 2))
                .unwrap();
        rep.load(&mut ()).unwrap();
        assert!(rep.is_hyperslabbed());
        assert_eq!(rep.range(), Some(HyperslabRange::new(2, 4)));
        let points = rep.points().unwrap();
        assert_eq!(points.len(), 3 * 9);
        assert_eq!(points.origin_node(), 18);
        // Probe plus three interfaces.
        assert_eq!(grid.k_interface_reads(), 4);
        assert_eq!(grid.whole_grid_reads(), 0);
        let cells = rep.topology().unwrap();
        assert_eq!(cells.len(), 8);
        assert_eq!(cells.active_count(), 8);
        assert!(cells.connectivity().iter().all(|&n| (n as usize) < points.len()));
    }

    #[test]
    fn unsupported_chunked_reads_fall_back_to_whole_grid() {
        let grid = InMemoryIjkGrid::regular("g", 1, 1, 4).without_chunked_reads();
        let mut rep = facade(grid, LoadConfig::new().with_worker(0, 2));
        let mut sink = VecSink::new();
        rep.load(&mut sink).unwrap();
        assert!(!rep.is_hyperslabbed());
        assert!(sink.warnings().is_empty());
        assert_eq!(rep.points().unwrap().source(), PointSource::WholeGrid);
        assert_eq!(rep.topology().unwrap().len(), 2);
    }

    #[test]
    fn surplus_worker_loads_nothing() {
        let mut rep = facade(InMemoryIjkGrid::regular("g", 2, 2, 2), LoadConfig::new().with_worker(3, 4));
        rep.load(&mut ()).unwrap();
        assert!(rep.is_loaded());
        assert!(rep.points().unwrap().is_empty());
        assert!(rep.topology().unwrap().is_empty());
        assert_eq!(rep.range(), Some(HyperslabRange::EMPTY));
    }

    #[test]
    fn unload_with_links_warns() {
        let mut rep = facade(InMemoryIjkGrid::regular("g", 1, 1, 1), LoadConfig::default());
        rep.load(&mut ()).unwrap();
        let link = rep.register_sub_rep();
        let mut sink = VecSink::new();
        rep.unload(&mut sink);
        assert!(!rep.is_loaded());
        assert_eq!(sink.warnings().len(), 1);
        assert_eq!(link.release(), 0);
        rep.unload(&mut sink);
        assert_eq!(sink.warnings().len(), 1);
    }

    #[test]
    fn malformed_unstructured_cell_fails_the_load() {
        let mut grid = InMemoryUnstructuredGrid::new("u", vec![DVec3::ZERO; 4])
            .with_shape(CellShape::Hexahedral);
        let ids = [
            (grid.add_face(&[0, 2, 1]), true),
            (grid.add_face(&[0, 1, 3]), true),
            (grid.add_face(&[1, 2, 3]), true),
            (grid.add_face(&[2, 0, 3]), true),
        ];
        grid.add_cell(&ids);
        let mut rep =
            GridRepresentation::new(SupportingGrid::unstructured(grid), LoadConfig::default())
                .unwrap();
        let err = rep.load(&mut ()).unwrap_err();
        assert!(err.is_fatal());
        assert!(!rep.is_loaded());
    }

    #[test]
    fn unstructured_grid_loads_whole() {
        let mut grid = InMemoryUnstructuredGrid::new("u", vec![DVec3::ONE; 8]);
        grid.add_hexahedron([0, 1, 2, 3, 4, 5, 6, 7]);
        let mut rep = GridRepresentation::new(
            SupportingGrid::unstructured(grid),
            LoadConfig::new().with_worker(1, 3),
        )
        .unwrap();
        rep.load(&mut ()).unwrap();
        assert_eq!(rep.kind(), RepresentationKind::UnstructuredGrid);
        assert_eq!(rep.points().unwrap().len(), 8);
        assert_eq!(rep.topology().unwrap().len(), 1);
        assert!(rep.range().is_none());
        assert!(rep.unstructured_topology().is_some());
    }
}
