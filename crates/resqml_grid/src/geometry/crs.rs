//! Local CRS resolution and coordinate transforms.
use glam::DVec3;

use crate::accessor::LocalCrs;
use crate::error::{Error, Result};
use crate::events::{emit_warning, EventSink};

/// Transform from a grid's local CRS into the global frame used for display.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CrsTransform {
    /// Local origin expressed in the global frame.
    pub offset: DVec3,
    /// Z is flipped after offsetting.
    pub depth_oriented: bool,
}

impl CrsTransform {
    pub const IDENTITY: CrsTransform = CrsTransform {
        offset: DVec3::ZERO,
        depth_oriented: false,
    };

    pub fn from_local_crs(crs: &LocalCrs) -> Self {
        Self {
            offset: DVec3::new(
                crs.origin_ordinal1,
                crs.origin_ordinal2,
                crs.origin_depth_or_elevation.unwrap_or(0.0),
            ),
            depth_oriented: crs.depth_oriented,
        }
    }

    /// Offsets a local point by the CRS origin, then applies the depth flip.
    #[inline]
    pub fn local_to_global(&self, p: DVec3) -> DVec3 {
        self.orient(p + self.offset)
    }

    /// Applies only the depth flip, for points the accessor already returns in global CRS.
    #[inline]
    pub fn orient(&self, mut p: DVec3) -> DVec3 {
        if self.depth_oriented {
            p.z = -p.z;
        }
        p
    }
}

/// Resolves an accessor's CRS answer into a transform.
///
/// Absent, partial, or unreadable CRS yield `None` after a warning; callers pick the
/// configured fallback.
pub fn resolve_crs(
    uuid: &str,
    crs: Result<Option<LocalCrs>>,
    sink: &mut dyn EventSink,
) -> Option<CrsTransform> {
    let reason = match crs {
        Ok(Some(crs)) if !crs.partial => return Some(CrsTransform::from_local_crs(&crs)),
        Ok(Some(_)) => "is partial".to_owned(),
        Ok(None) => "is absent".to_owned(),
        Err(e) => format!("cannot be read ({e})"),
    };
    let err = Error::MissingCrs {
        uuid: uuid.to_owned(),
    };
    emit_warning(sink, uuid, format!("{err}: local CRS {reason}"));
    None
}
