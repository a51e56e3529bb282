//! Fiducial-driven paper rectification and window-pane compositing.
//!
//! The dewarp stage turns a photograph of a marked sheet into an upright
//! artwork image ([`fiducial`], [`corners`], [`rectify`]). The wrap stage
//! places that artwork into the panes of a window canvas and lays the frame
//! overlay on top ([`compositor`], [`overlay`]). Both stages run as
//! directory-polling workers ([`queue`], [`stages`]).

pub mod compositor;
pub mod config;
pub mod corners;
pub mod error;
pub mod fiducial;
pub mod interpolation;
pub mod math;
pub mod overlay;
pub mod queue;
pub mod rectify;
pub mod stages;

pub use compositor::{DrawingLayer, MappingConfig, ZoneCompositor, ZoneMapping};
pub use config::AppConfig;
pub use corners::{CornerKey, CornerSetResolver, PatternId, ResolvedCorners};
pub use error::{ConfigError, DetectionFailure, Error, GeometryError, Result};
pub use fiducial::{FiducialDetector, Marker};
pub use math::{Homography, Quad};
pub use overlay::{Overlay, OverlayBlender};
pub use rectify::{PerspectiveRectifier, Rotation};
