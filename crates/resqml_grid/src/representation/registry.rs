//! UUID-keyed registry of grid facades and their attached sub-representations.
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::info;

use crate::accessor::SubRepresentationAccessor;
use crate::config::LoadConfig;
use crate::error::{Error, Result};
use crate::events::{emit_warning, EventSink};
use crate::representation::{GridRepresentation, SubRepresentationBinder, SupportingGrid};
use crate::topology::CellConnectivity;

/// Keeps one [`GridRepresentation`] per supporting grid and one
/// [`SubRepresentationBinder`] per sub-representation.
pub struct GridRegistry {
    config: LoadConfig,
    grids: HashMap<String, GridRepresentation>,
    sub_reps: HashMap<String, SubRepresentationBinder>,
}

impl GridRegistry {
    pub fn new(config: LoadConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            grids: HashMap::new(),
            sub_reps: HashMap::new(),
        })
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    pub fn grid_count(&self) -> usize {
        self.grids.len()
    }

    pub fn sub_representation_count(&self) -> usize {
        self.sub_reps.len()
    }

    pub fn grid(&self, uuid: &str) -> Option<&GridRepresentation> {
        self.grids.get(uuid)
    }

    pub fn sub_representation(&self, uuid: &str) -> Option<&SubRepresentationBinder> {
        self.sub_reps.get(uuid)
    }

    /// Returns the loaded facade of `grid`, creating and loading it on first request.
    pub fn request_grid(
        &mut self,
        grid: SupportingGrid,
        sink: &mut dyn EventSink,
    ) -> Result<&GridRepresentation> {
        let uuid = grid.uuid().to_owned();
        let representation = match self.grids.entry(uuid) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                entry.insert(GridRepresentation::new(grid, self.config.clone())?)
            }
        };
        representation.load(sink)?;
        Ok(&*representation)
    }

    /// Attaches `sub_rep` to its registered supporting grid and builds its cells.
    ///
    /// Configuration problems (unknown supporting grid, unsupported subset) are reported
    /// and yield `Ok(None)`; only a malformed cell is returned as an error.
    pub fn request_sub_representation(
        &mut self,
        sub_rep: &dyn SubRepresentationAccessor,
        sink: &mut dyn EventSink,
    ) -> Result<Option<CellConnectivity>> {
        let uuid = sub_rep.uuid();
        let supporting = sub_rep.supporting_representation_uuid();
        let Some(parent) = self.grids.get_mut(supporting) else {
            let err = Error::MissingSupportingGrid {
                uuid: supporting.to_owned(),
            };
            emit_warning(sink, uuid, err.to_string());
            return Ok(None);
        };

        if !self.sub_reps.contains_key(uuid) {
            match SubRepresentationBinder::attach(sub_rep, parent, sink) {
                Ok(binder) => {
                    self.sub_reps.insert(uuid.to_owned(), binder);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    emit_warning(sink, uuid, e.to_string());
                    return Ok(None);
                }
            }
        }

        let Some(binder) = self.sub_reps.get(uuid) else {
            return Ok(None);
        };
        match binder.build_sparse_cells(parent, sink) {
            Ok(cells) => Ok(Some(cells)),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                emit_warning(sink, uuid, e.to_string());
                Ok(None)
            }
        }
    }

    /// Detaches a sub-representation. Returns `false` when it was not attached.
    pub fn release_sub_representation(&mut self, uuid: &str, sink: &mut dyn EventSink) -> bool {
        match self.sub_reps.remove(uuid) {
            Some(binder) => {
                binder.detach(sink);
                true
            }
            None => false,
        }
    }

    /// Unloads a grid's geometry, keeping its facade registered. Returns `false` for an
    /// unknown grid.
    pub fn unload_grid(&mut self, uuid: &str, sink: &mut dyn EventSink) -> bool {
        match self.grids.get_mut(uuid) {
            Some(representation) => {
                representation.unload(sink);
                true
            }
            None => false,
        }
    }

    /// Detaches every sub-representation, then unloads and drops every grid.
    pub fn close(&mut self, sink: &mut dyn EventSink) {
        if self.grids.is_empty() && self.sub_reps.is_empty() {
            return;
        }
        let mut sub_reps: Vec<_> = self.sub_reps.drain().collect();
        sub_reps.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, binder) in sub_reps {
            binder.detach(sink);
        }
        let mut grids: Vec<_> = self.grids.drain().collect();
        grids.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, mut representation) in grids {
            representation.unload(sink);
        }
        info!("registry closed");
    }
}

impl Drop for GridRegistry {
    fn drop(&mut self) {
        self.close(&mut ());
    }
}
