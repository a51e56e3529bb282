//! Grouping of decoded markers into the four paper corners.
//!
//! Labels have the form `<key>_<pattern>` where key is one of `TL`, `TR`,
//! `BR`, `BL`. Three located corners are enough: the fourth is filled in by
//! a [`MissingCornerPolicy`].

mod policy;


pub use policy::{MissingCornerPolicy, ParallelogramPolicy, RejectIncomplete};

use std::fmt;

use glam::DVec2;
use strum::IntoEnumIterator;
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

use crate::error::DetectionFailure;
use crate::fiducial::{Marker, LABEL_DELIMITER};
use crate::math::Quad;

/// Paper corner named by a marker label, written `TL`, `TR`, `BR`, `BL`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum CornerKey {
    #[strum(serialize = "TL")]
    TopLeft,
    #[strum(serialize = "TR")]
    TopRight,
    #[strum(serialize = "BR")]
    BottomRight,
    #[strum(serialize = "BL")]
    BottomLeft,
}

impl CornerKey {
    /// Position in canonical order, matching [`Quad::points`].
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Marker whose label names one of the paper corners.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMarker {
    pub key: CornerKey,
    pub payload: Option<String>,
    pub center: DVec2,
}

impl LabeledMarker {
    /// Returns `None` if the label does not start with a corner key.
    pub fn parse(marker: &Marker) -> Option<Self> {
        let key_token = marker
            .label
            .split(LABEL_DELIMITER)
            .next()
            .unwrap_or_default();
        let key = key_token.parse().ok()?;
        Some(Self {
            key,
            payload: label_payload(&marker.label).map(str::to_string),
            center: marker.center,
        })
    }
}

/// Second `_`-separated token of the label, if present and non-empty.
pub fn label_payload(label: &str) -> Option<&str> {
    label
        .split(LABEL_DELIMITER)
        .nth(1)
        .filter(|token| !token.is_empty())
}

/// Identifier of the printed pattern on the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternId(String);

impl PatternId {
    pub const UNKNOWN: &'static str = "unknown";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn unknown() -> Self {
        Self(Self::UNKNOWN.to_string())
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Most frequent payload; ties go to the one seen first.
    pub fn vote<'a>(payloads: impl IntoIterator<Item = &'a str>) -> Self {
        let mut tally: Vec<(&str, usize)> = Vec::new();
        for payload in payloads {
            match tally.iter_mut().find(|(id, _)| *id == payload) {
                Some((_, count)) => *count += 1,
                None => tally.push((payload, 1)),
            }
        }

        let mut best: Option<(&str, usize)> = None;
        for (id, count) in tally {
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((id, count)),
            }
        }

        best.map_or_else(Self::unknown, |(id, _)| Self::new(id))
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Partially known corner positions, indexed by [`CornerKey::index`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CornerSet {
    points: [Option<DVec2>; 4],
}

impl CornerSet {
    pub fn get(&self, key: CornerKey) -> Option<DVec2> {
        self.points[key.index()]
    }

    /// Returns the previous point for `key`, if any.
    pub fn insert(&mut self, key: CornerKey, point: DVec2) -> Option<DVec2> {
        self.points[key.index()].replace(point)
    }

    pub fn completeness(&self) -> usize {
        self.points.iter().flatten().count()
    }

    /// The single absent key when exactly three corners are known.
    pub fn missing(&self) -> Option<CornerKey> {
        if self.completeness() != 3 {
            return None;
        }
        CornerKey::iter().find(|key| self.get(*key).is_none())
    }

    pub fn to_quad(&self) -> Option<Quad> {
        Some(Quad::new(
            self.get(CornerKey::TopLeft)?,
            self.get(CornerKey::TopRight)?,
            self.get(CornerKey::BottomRight)?,
            self.get(CornerKey::BottomLeft)?,
        ))
    }
}

impl FromIterator<(CornerKey, DVec2)> for CornerSet {
    fn from_iter<I: IntoIterator<Item = (CornerKey, DVec2)>>(iter: I) -> Self {
        let mut set = CornerSet::default();
        for (key, point) in iter {
            set.insert(key, point);
        }
        set
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCorners {
    pub quad: Quad,
    pub pattern: PatternId,
    /// Corner filled in by the missing-corner policy.
    pub reconstructed: Option<CornerKey>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CornerSetResolver<P = ParallelogramPolicy> {
    policy: P,
}

impl CornerSetResolver<ParallelogramPolicy> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<P: MissingCornerPolicy> CornerSetResolver<P> {
    pub fn with_policy(policy: P) -> Self {
        Self { policy }
    }

    pub fn resolve(&self, markers: &[Marker]) -> Result<ResolvedCorners, DetectionFailure> {
        let pattern = PatternId::vote(
            markers
                .iter()
                .filter(|m| m.has_payload_delimiter())
                .filter_map(|m| label_payload(&m.label)),
        );

        let mut corners = CornerSet::default();
        for labeled in markers.iter().filter_map(LabeledMarker::parse) {
            if let Some(previous) = corners.insert(labeled.key, labeled.center) {
                tracing::debug!(
                    "corner {} seen again, replacing ({:.1}, {:.1})",
                    labeled.key,
                    previous.x,
                    previous.y
                );
            }
        }

        let found = corners.completeness();
        let reconstructed = match found {
            4 => None,
            3 => {
                let missing = corners
                    .missing()
                    .ok_or(DetectionFailure::TooFewCorners { found })?;
                let point = self.policy.reconstruct(&corners, missing)?;
                corners.insert(missing, point);
                tracing::debug!(
                    "reconstructed corner {} at ({:.1}, {:.1})",
                    missing,
                    point.x,
                    point.y
                );
                Some(missing)
            }
            _ => return Err(DetectionFailure::TooFewCorners { found }),
        };

        let quad = corners
            .to_quad()
            .ok_or(DetectionFailure::TooFewCorners { found })?;

        Ok(ResolvedCorners {
            quad,
            pattern,
            reconstructed,
        })
    }
}
