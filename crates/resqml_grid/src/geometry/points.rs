//! Point materialization for IJK and unstructured grids.
//!
//! [`materialize_points`] reads either the whole grid in one call or the closed range of
//! K-interfaces a worker owns, one interface at a time. Data problems never fail the load:
//! they are reported and replaced by zero-valued points of the expected length so that
//! corner indices keep resolving.
use glam::DVec3;
use tracing::debug;

use crate::accessor::{IjkGridAccessor, UnstructuredGridAccessor};
use crate::config::{CrsFallback, LoadConfig};
use crate::events::{emit_warning, EventSink};
use crate::geometry::crs::{resolve_crs, CrsTransform};
use crate::geometry::{IjkGridDescriptor, PointBuffer, PointSource};
use crate::partition::InterfaceRange;

/// Tries to read K-interface 0, reporting whether per-interface retrieval works.
///
/// A failing read is the expected signal for data stores without hyperslab support and is
/// never propagated.
pub fn probe_k_interface_reads(grid: &dyn IjkGridAccessor) -> bool {
    match grid.xyz_points_of_k_interface(0) {
        Ok(_) => true,
        Err(e) => {
            debug!(
                "'{}' has no per-K-interface reads, using whole-grid retrieval: {}",
                grid.uuid(),
                e
            );
            false
        }
    }
}

/// Produces the point buffer of an IJK grid.
///
/// `interfaces` is the closed K-interface range to read, or `None` to read the whole grid.
/// Compressed node geometry always takes the whole-grid path.
pub fn materialize_points(
    grid: &dyn IjkGridAccessor,
    descriptor: &IjkGridDescriptor,
    interfaces: Option<InterfaceRange>,
    config: &LoadConfig,
    sink: &mut dyn EventSink,
) -> PointBuffer {
    let per_interface = grid.xyz_point_count_of_k_interface();
    let interfaces = interfaces.filter(|_| !descriptor.is_node_geometry_compressed);

    let (origin_node, expected) = match interfaces {
        Some(range) => (
            range.init_interface_index as u64 * per_interface,
            range.len() as u64 * per_interface,
        ),
        None => (0, grid.xyz_point_count_of_all_patches()),
    };
    let fallback = || zero_points(expected, origin_node, per_interface);

    // The descriptor decides the Z flip; the CRS only supplies the offset.
    let transform = match resolve_crs(grid.uuid(), grid.local_crs(0), sink) {
        Some(t) => CrsTransform {
            depth_oriented: descriptor.is_depth_oriented,
            ..t
        },
        None => match config.crs_fallback {
            CrsFallback::ZeroPoints => return fallback(),
            CrsFallback::IdentityOffsets => CrsTransform::IDENTITY,
        },
    };

    let Some(range) = interfaces else {
        return match grid.xyz_points_of_all_patches_in_global_crs() {
            Ok(raw) if raw.len() as u64 == expected => {
                let points = raw
                    .into_iter()
                    .map(|p| transform.orient(DVec3::from(p)))
                    .collect();
                PointBuffer::new(points, 0, per_interface, PointSource::WholeGrid)
            }
            Ok(raw) => {
                emit_warning(
                    sink,
                    grid.uuid(),
                    format!("expected {expected} points, accessor returned {}", raw.len()),
                );
                fallback()
            }
            Err(e) => {
                emit_warning(sink, grid.uuid(), format!("cannot read points: {e}"));
                fallback()
            }
        };
    };

    let mut points = Vec::with_capacity(expected as usize);
    for k_interface in range.iter() {
        match grid.xyz_points_of_k_interface(k_interface) {
            Ok(raw) if raw.len() as u64 == per_interface => {
                points.extend(
                    raw.into_iter()
                        .map(|p| transform.local_to_global(DVec3::from(p))),
                );
            }
            Ok(raw) => {
                emit_warning(
                    sink,
                    grid.uuid(),
                    format!(
                        "K-interface {k_interface} holds {} points, expected {per_interface}",
                        raw.len()
                    ),
                );
                return fallback();
            }
            Err(e) => {
                emit_warning(
                    sink,
                    grid.uuid(),
                    format!("cannot read K-interface {k_interface}: {e}"),
                );
                return fallback();
            }
        }
    }
    debug!(
        "'{}': read {} points from K-interfaces {}..={}",
        grid.uuid(),
        points.len(),
        range.init_interface_index,
        range.max_interface_index
    );
    PointBuffer::new(
        points,
        origin_node,
        per_interface,
        PointSource::KInterfaces(range),
    )
}

/// Produces the point buffer of an unstructured grid, always read whole.
pub fn materialize_unstructured_points(
    grid: &dyn UnstructuredGridAccessor,
    config: &LoadConfig,
    sink: &mut dyn EventSink,
) -> PointBuffer {
    let expected = grid.xyz_point_count_of_all_patches();
    let transform = match resolve_crs(grid.uuid(), grid.local_crs(0), sink) {
        Some(t) => t,
        None => match config.crs_fallback {
            CrsFallback::ZeroPoints => return zero_points(expected, 0, 0),
            CrsFallback::IdentityOffsets => CrsTransform::IDENTITY,
        },
    };
    match grid.xyz_points_of_all_patches_in_global_crs() {
        Ok(raw) if raw.len() as u64 == expected => {
            let points = raw
                .into_iter()
                .map(|p| transform.orient(DVec3::from(p)))
                .collect();
            PointBuffer::new(points, 0, 0, PointSource::WholeGrid)
        }
        Ok(raw) => {
            emit_warning(
                sink,
                grid.uuid(),
                format!("expected {expected} points, accessor returned {}", raw.len()),
            );
            zero_points(expected, 0, 0)
        }
        Err(e) => {
            emit_warning(sink, grid.uuid(), format!("cannot read points: {e}"));
            zero_points(expected, 0, 0)
        }
    }
}

fn zero_points(count: u64, origin_node: u64, per_interface: u64) -> PointBuffer {
    PointBuffer::new(
        vec![DVec3::ZERO; count as usize],
        origin_node,
        per_interface,
        PointSource::Fallback,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::memory::InMemoryIjkGrid;
    use crate::accessor::LocalCrs;
    use crate::events::VecSink;

    fn depth_crs() -> LocalCrs {
        LocalCrs {
            depth_oriented: true,
            partial: false,
            origin_ordinal1: 10.0,
            origin_ordinal2: 20.0,
            origin_depth_or_elevation: Some(100.0),
        }
    }

    fn read(grid: &InMemoryIjkGrid, interfaces: Option<InterfaceRange>) -> (PointBuffer, VecSink) {
        let mut sink = VecSink::new();
        let descriptor = IjkGridDescriptor::read(grid, &mut sink);
        let buffer = materialize_points(
            grid,
            &descriptor,
            interfaces,
            &LoadConfig::default(),
            &mut sink,
        );
        (buffer, sink)
    }

    #[test]
    fn whole_grid_flips_depth() {
        let grid = InMemoryIjkGrid::regular("g", 1, 1, 2).with_local_crs(depth_crs());
        let (buffer, sink) = read(&grid, None);
        assert!(sink.is_empty());
        assert_eq!(buffer.len(), 12);
        assert_eq!(buffer.source(), PointSource::WholeGrid);
        // Node 11: pillar 3 (1, 1) on interface 2, global = local + origin, then flipped.
        assert_eq!(buffer.points()[11], DVec3::new(11.0, 21.0, -102.0));
        assert_eq!(grid.whole_grid_reads(), 1);
    }

    #[test]
    fn descriptor_orientation_drives_the_flip() {
        let grid = InMemoryIjkGrid::regular("g", 1, 1, 2).with_local_crs(depth_crs());
        let mut sink = VecSink::new();
        let mut descriptor = IjkGridDescriptor::read(&grid, &mut sink);
        assert!(descriptor.is_depth_oriented);
        descriptor.is_depth_oriented = false;
        let config = LoadConfig::default();
        let whole = materialize_points(&grid, &descriptor, None, &config, &mut sink);
        assert_eq!(whole.points()[11], DVec3::new(11.0, 21.0, 102.0));
        let slab = materialize_points(
            &grid,
            &descriptor,
            Some(InterfaceRange::new(1, 2)),
            &config,
            &mut sink,
        );
        assert_eq!(slab.points()[0], DVec3::new(10.0, 20.0, 101.0));
        assert!(sink.is_empty());
    }

    #[test]
    fn interface_path_offsets_then_flips() {
        let grid = InMemoryIjkGrid::regular("g", 1, 1, 4).with_local_crs(depth_crs());
        let (buffer, _) = read(&grid, Some(InterfaceRange::new(2, 3)));
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.origin_node(), 8);
        assert_eq!(buffer.points()[0], DVec3::new(10.0, 20.0, -102.0));
        assert_eq!(buffer.points()[7], DVec3::new(11.0, 21.0, -103.0));
        assert_eq!(grid.k_interface_reads(), 2);
        assert!(buffer.is_partial());
    }

    #[test]
    fn interface_and_whole_paths_agree() {
        let grid = InMemoryIjkGrid::regular("g", 2, 2, 3)
            .with_k_gaps(vec![true, false])
            .with_local_crs(depth_crs());
        let (whole, _) = read(&grid, None);
        let (slab, _) = read(&grid, Some(InterfaceRange::new(2, 4)));
        let offset = slab.origin_node() as usize;
        assert_eq!(&whole.points()[offset..offset + slab.len()], slab.points());
    }

    #[test]
    fn compressed_geometry_reads_whole_grid() {
        let grid = InMemoryIjkGrid::regular("g", 1, 1, 3).with_compressed_geometry();
        let (buffer, _) = read(&grid, Some(InterfaceRange::new(1, 2)));
        assert_eq!(buffer.source(), PointSource::WholeGrid);
        assert_eq!(buffer.origin_node(), 0);
        assert_eq!(grid.k_interface_reads(), 0);
    }

    #[test]
    fn missing_crs_falls_back_to_zero_points() {
        let grid = InMemoryIjkGrid::regular("g", 1, 1, 2).without_crs();
        let (buffer, sink) = read(&grid, Some(InterfaceRange::new(1, 2)));
        assert_eq!(buffer.source(), PointSource::Fallback);
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.origin_node(), 4);
        assert!(buffer.points().iter().all(|p| *p == DVec3::ZERO));
        assert_eq!(sink.warnings().len(), 1);
    }

    #[test]
    fn identity_fallback_keeps_raw_coordinates() {
        let grid = InMemoryIjkGrid::regular("g", 1, 1, 1).with_local_crs(LocalCrs {
            partial: true,
            ..depth_crs()
        });
        let mut sink = VecSink::new();
        let descriptor = IjkGridDescriptor::read(&grid, &mut sink);
        let config = LoadConfig::new().with_crs_fallback(CrsFallback::IdentityOffsets);
        let buffer = materialize_points(
            &grid,
            &descriptor,
            Some(InterfaceRange::new(0, 1)),
            &config,
            &mut sink,
        );
        assert_eq!(buffer.source(), PointSource::KInterfaces(InterfaceRange::new(0, 1)));
        assert_eq!(buffer.points()[7], DVec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn failed_interface_read_is_absorbed() {
        let grid = InMemoryIjkGrid::regular("g", 1, 1, 2).without_chunked_reads();
        assert!(!probe_k_interface_reads(&grid));
        let (buffer, sink) = read(&grid, Some(InterfaceRange::new(0, 2)));
        assert_eq!(buffer.source(), PointSource::Fallback);
        assert_eq!(buffer.len(), 12);
        assert_eq!(sink.warnings().len(), 1);
    }
}
