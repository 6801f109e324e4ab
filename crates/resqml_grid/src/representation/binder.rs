//! Sparse cell and face subsets rendered on top of a loaded supporting grid.
use std::rc::Rc;

use tracing::{debug, info};

use crate::accessor::{ElementKind, IjkGridAccessor, SplitInformationGuard, SubRepresentationAccessor};
use crate::error::{Error, Result};
use crate::events::{emit, emit_warning, EventSink, LoadEvent};
use crate::geometry::{IjkGridDescriptor, PointBuffer};
use crate::partition::HyperslabRange;
use crate::representation::grid::GridRepresentation;
use crate::representation::link::SubRepLink;
use crate::representation::{SubRepresentationMode, SupportingGrid};
use crate::topology::faces::build_face_polygons;
use crate::topology::{
    active_cell_mask, CellConnectivity, CellType, CornerMapper, UnstructuredTopology,
};

/// A sub-representation attached to its supporting grid.
///
/// The binder reuses the parent's point buffer, and for unstructured parents its face
/// topology, so it keeps building after the parent unloads. It never reads points. It holds a
/// [`SubRepLink`] on the parent for its whole life; [`SubRepresentationBinder::detach`]
/// releases it, and so does dropping the binder.
#[derive(Debug)]
pub struct SubRepresentationBinder {
    uuid: String,
    mode: SubRepresentationMode,
    elements: Vec<u64>,
    points: Rc<PointBuffer>,
    topology: Option<Rc<UnstructuredTopology>>,
    link: SubRepLink,
}

impl SubRepresentationBinder {
    /// Validates `sub_rep` against `parent` and links to it, loading the parent first if
    /// needed.
    ///
    /// Rejected sub-representations leave the parent's link count unchanged.
    pub fn attach(
        sub_rep: &dyn SubRepresentationAccessor,
        parent: &mut GridRepresentation,
        sink: &mut dyn EventSink,
    ) -> Result<Self> {
        let uuid = sub_rep.uuid().to_owned();
        let unsupported = |reason: String| Error::UnsupportedSubRepresentation {
            uuid: uuid.clone(),
            reason,
        };

        if sub_rep.supporting_representation_uuid() != parent.uuid() {
            return Err(Error::MissingSupportingGrid {
                uuid: sub_rep.supporting_representation_uuid().to_owned(),
            });
        }
        if sub_rep.patch_count() != 1 {
            return Err(unsupported(format!(
                "{} patches, only single-patch subsets are supported",
                sub_rep.patch_count()
            )));
        }
        if sub_rep.are_element_indices_pairwise(0) {
            return Err(unsupported("pairwise element indices".into()));
        }
        let mode = match (sub_rep.element_kind_of_patch(0), parent.supporting_grid()) {
            (ElementKind::Cells, _) => SubRepresentationMode::SparseCells,
            (ElementKind::Faces, SupportingGrid::Unstructured(_)) => {
                SubRepresentationMode::SparseFaces
            }
            (ElementKind::Faces, SupportingGrid::Ijk(_)) => {
                return Err(unsupported("faces of an IJK grid".into()))
            }
            (ElementKind::Other(kind), _) => {
                return Err(unsupported(format!("element kind '{kind}'")))
            }
        };

        parent.load(sink)?;

        let elements = sub_rep.element_indices_of_patch(0)?;
        if elements.len() as u64 != sub_rep.element_count_of_patch(0) {
            return Err(Error::Data(format!(
                "'{uuid}' advertises {} elements but holds {}",
                sub_rep.element_count_of_patch(0),
                elements.len()
            )));
        }
        if elements.windows(2).any(|w| w[0] >= w[1]) {
            return Err(unsupported("element indices are not strictly ascending".into()));
        }
        let bound = element_bound(parent, mode)?;
        if let Some(&last) = elements.last() {
            if last >= bound {
                return Err(unsupported(format!(
                    "element index {last} out of range for {bound} elements"
                )));
            }
        }

        let points = parent
            .points()
            .ok_or_else(|| Error::Other(format!("'{}' has no points after load", parent.uuid())))?;
        let topology = parent.unstructured_topology();
        let link = parent.register_sub_rep();
        info!(
            "attached '{uuid}' to '{}' ({} links)",
            parent.uuid(),
            link.linked_count()
        );
        emit(
            sink,
            LoadEvent::SubRepAttached {
                uuid: uuid.clone(),
                parent: parent.uuid().to_owned(),
                linked_count: link.linked_count(),
            },
        );
        Ok(Self {
            uuid,
            mode,
            elements,
            points,
            topology,
            link,
        })
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn parent_uuid(&self) -> &str {
        self.link.parent_uuid()
    }

    pub fn mode(&self) -> SubRepresentationMode {
        self.mode
    }

    /// Selected element indices, ascending.
    pub fn elements(&self) -> &[u64] {
        &self.elements
    }

    /// The parent's point buffer, shared.
    pub fn points(&self) -> Rc<PointBuffer> {
        Rc::clone(&self.points)
    }

    /// Builds one record per selected element.
    ///
    /// IJK cells are found by walking the parent's full cell space in K, J, I order and
    /// emitting on index match. Selected cells that are inactive, or whose corners lie
    /// outside the parent's buffer when it holds a single K-slab, are blanked.
    pub fn build_sparse_cells(
        &self,
        parent: &GridRepresentation,
        sink: &mut dyn EventSink,
    ) -> Result<CellConnectivity> {
        if parent.uuid() != self.parent_uuid() {
            return Err(Error::MissingSupportingGrid {
                uuid: self.parent_uuid().to_owned(),
            });
        }
        let cells = match (parent.supporting_grid(), self.mode) {
            (SupportingGrid::Ijk(grid), _) => {
                let descriptor = match parent.descriptor() {
                    Some(descriptor) => descriptor.clone(),
                    None => IjkGridDescriptor::read(grid.as_ref(), sink),
                };
                let mapper = CornerMapper::for_buffer(&descriptor, parent.config(), &self.points);
                self.merge_join(grid.as_ref(), &descriptor, &mapper, sink)
            }
            (SupportingGrid::Unstructured(_), mode) => {
                let topology = self.topology.as_deref().ok_or_else(|| {
                    Error::Data(format!("faces of '{}' could not be read", parent.uuid()))
                })?;
                match mode {
                    SubRepresentationMode::SparseCells => {
                        topology.build_cells(self.elements.iter().copied())?
                    }
                    SubRepresentationMode::SparseFaces => {
                        build_face_polygons(topology, &self.elements, &self.uuid, sink)
                    }
                }
            }
        };
        emit(
            sink,
            LoadEvent::CellsBuilt {
                uuid: self.uuid.clone(),
                cell_count: cells.len(),
                active_count: cells.active_count(),
            },
        );
        Ok(cells)
    }

    fn merge_join(
        &self,
        grid: &dyn IjkGridAccessor,
        descriptor: &IjkGridDescriptor,
        mapper: &CornerMapper,
        sink: &mut dyn EventSink,
    ) -> CellConnectivity {
        let mut cells = CellConnectivity::with_capacity(self.elements.len(), self.elements.len() * 8);
        if self.elements.is_empty() {
            return cells;
        }
        let active = active_cell_mask(
            grid,
            descriptor,
            HyperslabRange::whole(descriptor.k_cell_count),
            sink,
        );
        let _guard = match SplitInformationGuard::load(grid) {
            Ok(guard) => Some(guard),
            Err(e) => {
                emit_warning(sink, &self.uuid, format!("cannot load split information: {e}"));
                None
            }
        };

        let mut cursor = 0usize;
        let mut cell_index = 0u64;
        let mut outside = 0usize;
        'walk: for k in 0..descriptor.k_cell_count {
            for j in 0..descriptor.j_cell_count {
                for i in 0..descriptor.i_cell_count {
                    if self.elements[cursor] == cell_index {
                        if !active[cell_index as usize] {
                            cells.push_empty();
                        } else {
                            match mapper.hexahedron(grid, i, j, k) {
                                Ok(nodes) => cells.push_cell(CellType::Hexahedron, &nodes),
                                Err(_) => {
                                    outside += 1;
                                    cells.push_empty();
                                }
                            }
                        }
                        cursor += 1;
                        if cursor == self.elements.len() {
                            break 'walk;
                        }
                    }
                    cell_index += 1;
                }
            }
        }

        if outside > 0 {
            emit_warning(
                sink,
                &self.uuid,
                format!("{outside} selected cells lie outside the loaded points of '{}'", self.parent_uuid()),
            );
        }
        debug!(
            "'{}': {} of {} selected cells built",
            self.uuid,
            cells.active_count(),
            self.elements.len()
        );
        cells
    }

    /// Releases the link on the parent and returns its remaining count.
    pub fn detach(self, sink: &mut dyn EventSink) -> usize {
        let uuid = self.uuid;
        let parent = self.link.parent_uuid().to_owned();
        let linked_count = self.link.release();
        info!("detached '{uuid}' from '{parent}' ({linked_count} links)");
        emit(
            sink,
            LoadEvent::SubRepDetached {
                uuid,
                parent,
                linked_count,
            },
        );
        linked_count
    }
}

fn element_bound(parent: &GridRepresentation, mode: SubRepresentationMode) -> Result<u64> {
    match parent.supporting_grid() {
        SupportingGrid::Ijk(grid) => Ok(grid.i_cell_count() as u64
            * grid.j_cell_count() as u64
            * grid.k_cell_count() as u64),
        SupportingGrid::Unstructured(_) => {
            let topology = parent.unstructured_topology().ok_or_else(|| {
                Error::Data(format!("faces of '{}' could not be read", parent.uuid()))
            })?;
            Ok(match mode {
                SubRepresentationMode::SparseCells => topology.cell_count(),
                SubRepresentationMode::SparseFaces => topology.face_count(),
            })
        }
    }
}
