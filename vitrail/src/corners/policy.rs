use glam::DVec2;

use super::{CornerKey, CornerSet};
use crate::error::DetectionFailure;

/// Fills in the one corner that was not located.
///
/// Called only when exactly three corners are known; `missing` is the absent one.
pub trait MissingCornerPolicy {
    fn reconstruct(&self, known: &CornerSet, missing: CornerKey) -> Result<DVec2, DetectionFailure>;
}

/// Completes the set as a parallelogram.
///
/// Exact for a flat sheet seen head-on, approximate under perspective.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParallelogramPolicy;

impl MissingCornerPolicy for ParallelogramPolicy {
    fn reconstruct(
        &self,
        known: &CornerSet,
        missing: CornerKey,
    ) -> Result<DVec2, DetectionFailure> {
        let get = |key: CornerKey| {
            known
                .get(key)
                .ok_or(DetectionFailure::TooFewCorners {
                    found: known.completeness(),
                })
        };

        let (tl, tr, br, bl) = (
            CornerKey::TopLeft,
            CornerKey::TopRight,
            CornerKey::BottomRight,
            CornerKey::BottomLeft,
        );

        Ok(match missing {
            CornerKey::BottomRight => get(bl)? + (get(tr)? - get(tl)?),
            CornerKey::BottomLeft => get(br)? + (get(tl)? - get(tr)?),
            CornerKey::TopRight => get(tl)? + (get(br)? - get(bl)?),
            CornerKey::TopLeft => get(tr)? + (get(bl)? - get(br)?),
        })
    }
}

/// Refuses to guess: any set with a missing corner fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectIncomplete;

impl MissingCornerPolicy for RejectIncomplete {
    fn reconstruct(
        &self,
        _known: &CornerSet,
        missing: CornerKey,
    ) -> Result<DVec2, DetectionFailure> {
        Err(DetectionFailure::ReconstructionRejected { missing })
    }
}
