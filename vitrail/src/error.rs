//! Error taxonomy for the scan and composite pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::corners::CornerKey;

/// Not enough fiducials were found to recover the paper outline.
///
/// This is an expected per-file outcome: the input goes to the error
/// directory and the worker moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionFailure {
    #[error("found {found} labeled markers, need at least {required}")]
    TooFewMarkers { found: usize, required: usize },

    #[error("resolved {found}/4 corners, need at least 3")]
    TooFewCorners { found: usize },

    #[error("corner {missing} is missing and reconstruction is disabled")]
    ReconstructionRejected { missing: CornerKey },
}

/// Geometry that cannot be warped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("corners {0} and {1} coincide")]
    CoincidentCorners(usize, usize),

    #[error("quad area {area:.3} px² is below {min_area:.3} px²")]
    DegenerateQuad { area: f64, min_area: f64 },

    #[error("warp extent {width}x{height} exceeds limit {max}")]
    TooLarge { width: u32, height: u32, max: u32 },

    #[error("homography estimation failed: {0}")]
    Homography(&'static str),

    #[error("polygon has {0} points, expected 4 or 5")]
    InvalidPolygon(usize),

    #[error("corner ordering is ambiguous: one point claims two corners")]
    AmbiguousOrdering,
}

/// Startup configuration problems. Fatal: nothing can be processed without geometry.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("canvas size {width}x{height} is invalid")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("zone {index}: {reason}")]
    InvalidZone { index: usize, reason: String },

    #[error("overlay file '{0}' does not exist")]
    MissingOverlay(PathBuf),

    #[error("failed to load overlay '{path}': {source}")]
    OverlayLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid setting: {0}")]
    InvalidSetting(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Detection(#[from] DetectionFailure),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to load image '{path}': {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to save image '{path}': {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
