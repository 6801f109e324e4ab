//! Face lookups through cumulative counts, and polygon streams for face subsets.
use std::ops::Range;

use crate::events::{emit_warning, EventSink};
use crate::topology::unstructured::UnstructuredTopology;
use crate::topology::{CellConnectivity, CellType};

/// Span of element `index` in a flat array described by a cumulative count array.
///
/// `cumulative[n]` is the running total up to and including element `n`, without a
/// leading zero. Returns `None` for an index past the end or a decreasing count.
pub fn prefix_span(cumulative: &[u64], index: usize) -> Option<Range<usize>> {
    let end = *cumulative.get(index)? as usize;
    let start = match index {
        0 => 0,
        _ => cumulative[index - 1] as usize,
    };
    (start <= end).then_some(start..end)
}

/// Emits one polygon per selected face, typed by node count.
///
/// Faces with fewer than three nodes or nodes outside the point buffer are blanked and
/// reported together.
pub fn build_face_polygons(
    topology: &UnstructuredTopology,
    faces: &[u64],
    context: &str,
    sink: &mut dyn EventSink,
) -> CellConnectivity {
    let mut polygons = CellConnectivity::with_capacity(faces.len(), faces.len() * 4);
    let mut blanked = 0usize;
    for &face in faces {
        match topology.face_nodes(face) {
            Some(nodes)
                if nodes.len() >= 3 && nodes.iter().all(|&n| n < topology.point_count()) =>
            {
                polygons.push_cell(CellType::polygon(nodes.len()), nodes);
            }
            _ => {
                blanked += 1;
                polygons.push_empty();
            }
        }
    }
    if blanked > 0 {
        emit_warning(
            sink,
            context,
            format!("{blanked} of {} faces have no valid polygon", faces.len()),
        );
    }
    polygons
}
