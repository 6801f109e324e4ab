//! Event types and sinks for observing representation loads.
//!
//! This module defines [`LoadEvent`] and a set of sinks to emit, collect, or forward
//! events while a [`crate::representation::GridRepresentation`] loads or a
//! [`crate::representation::SubRepresentationBinder`] attaches. Recoverable data and
//! configuration problems surface here as [`LoadEvent::Warning`] in addition to the
//! `tracing` log line.
use crate::geometry::PointSource;
use crate::partition::{HyperslabRange, InterfaceRange};

/// Describes events emitted while loading representations.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    /// Emitted when a facade starts materializing a representation.
    LoadStarted {
        /// UUID of the representation.
        uuid: String,
    },

    /// Emitted once the K-slab owned by this worker is known.
    RangePlanned {
        uuid: String,
        /// Owned half-open K-cell range.
        range: HyperslabRange,
        /// Closed K-interface range whose points are read, if read per interface.
        interfaces: Option<InterfaceRange>,
    },

    /// Emitted after the point buffer was filled.
    PointsMaterialized {
        uuid: String,
        /// Number of points held by this worker.
        point_count: usize,
        /// Retrieval path that produced the points.
        source: PointSource,
    },

    /// Emitted after the cell or face connectivity was built.
    CellsBuilt {
        uuid: String,
        /// Number of cell records, including blanked placeholders.
        cell_count: usize,
        /// Number of records that are not blanked placeholders.
        active_count: usize,
    },

    /// Emitted when a sub-representation attached to its supporting grid.
    SubRepAttached {
        uuid: String,
        parent: String,
        /// Link count of the parent after attaching.
        linked_count: usize,
    },

    /// Emitted when a sub-representation released its supporting grid.
    SubRepDetached {
        uuid: String,
        parent: String,
        /// Link count of the parent after detaching.
        linked_count: usize,
    },

    /// Emitted when a facade released its geometry.
    Unloaded {
        uuid: String,
        /// Sub-representations still linked at release time.
        linked_count: usize,
    },

    /// Non-fatal diagnostic.
    Warning {
        /// Context string (e.g. representation uuid).
        context: String,
        /// Human-readable message.
        message: String,
    },
}

/// Discriminant of [`LoadEvent`] used for filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoadEventKind {
    LoadStarted,
    RangePlanned,
    PointsMaterialized,
    CellsBuilt,
    SubRepAttached,
    SubRepDetached,
    Unloaded,
    Warning,
}

impl LoadEvent {
    pub fn kind(&self) -> LoadEventKind {
        match self {
            LoadEvent::LoadStarted { .. } => LoadEventKind::LoadStarted,
            LoadEvent::RangePlanned { .. } => LoadEventKind::RangePlanned,
            LoadEvent::PointsMaterialized { .. } => LoadEventKind::PointsMaterialized,
            LoadEvent::CellsBuilt { .. } => LoadEventKind::CellsBuilt,
            LoadEvent::SubRepAttached { .. } => LoadEventKind::SubRepAttached,
            LoadEvent::SubRepDetached { .. } => LoadEventKind::SubRepDetached,
            LoadEvent::Unloaded { .. } => LoadEventKind::Unloaded,
            LoadEvent::Warning { .. } => LoadEventKind::Warning,
        }
    }

    pub fn warning(context: impl Into<String>, message: impl Into<String>) -> Self {
        LoadEvent::Warning {
            context: context.into(),
            message: message.into(),
        }
    }
}

/// A generic event sink that accepts [`LoadEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: LoadEvent);

    /// Lets producers skip building events nobody listens to.
    fn wants(&self, _kind: LoadEventKind) -> bool {
        true
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    #[inline]
    fn send(&mut self, event: LoadEvent) {
        (**self).send(event);
    }

    #[inline]
    fn wants(&self, kind: LoadEventKind) -> bool {
        (**self).wants(kind)
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: LoadEvent) {}

    #[inline]
    fn wants(&self, _kind: LoadEventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(LoadEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(LoadEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(LoadEvent),
{
    #[inline]
    fn send(&mut self, event: LoadEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects all events in a `Vec`.
#[derive(Default)]
pub struct VecSink {
    events: Vec<LoadEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn into_inner(self) -> Vec<LoadEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[LoadEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Messages of all collected warnings, in emission order.
    pub fn warnings(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                LoadEvent::Warning { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: LoadEvent) {
        self.events.push(event);
    }
}

/// Fan-out sink that forwards each event to every contained sink that wants it.
///
/// Holding `&mut dyn EventSink` entries lets a caller combine a collector and a logger
/// and read the collector back once the fan-out is dropped.
pub struct MultiSink<S: EventSink> {
    sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn into_sinks(self) -> Vec<S> {
        self.sinks
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: LoadEvent) {
        let kind = event.kind();
        let Some(last_idx) = self.sinks.iter().rposition(|s| s.wants(kind)) else {
            return;
        };
        for sink in &mut self.sinks[..last_idx] {
            if sink.wants(kind) {
                sink.send(event.clone());
            }
        }
        self.sinks[last_idx].send(event);
    }

    fn wants(&self, kind: LoadEventKind) -> bool {
        self.sinks.iter().any(|s| s.wants(kind))
    }
}

/// Forwards an event if the sink listens to its kind.
pub(crate) fn emit(sink: &mut dyn EventSink, event: LoadEvent) {
    if sink.wants(event.kind()) {
        sink.send(event);
    }
}

/// Logs a warning and forwards it to the sink.
pub(crate) fn emit_warning(sink: &mut dyn EventSink, context: &str, message: String) {
    tracing::warn!("{}: {}", context, message);
    if sink.wants(LoadEventKind::Warning) {
        sink.send(LoadEvent::Warning {
            context: context.to_owned(),
            message,
        });
    }
}
