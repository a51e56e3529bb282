//! Fiducial marker detection.
//!
//! Markers are searched on a reduced copy of the photograph. If the first
//! pass finds too few labeled markers, a second pass runs on a binary
//! threshold of the same reduced image. Returned centroids are always in
//! the coordinate space of the original photograph.

mod decoder;


pub use decoder::{DecodedMarker, MarkerDecoder, QrDecoder};

use glam::DVec2;
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DetectionFailure};

/// Separates the corner key from the pattern payload, as in `TL_3`.
pub const LABEL_DELIMITER: char = '_';

/// A decoded marker with its centroid in photograph coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub label: String,
    pub center: DVec2,
}

impl Marker {
    pub fn new(label: impl Into<String>, center: DVec2) -> Self {
        Self {
            label: label.into(),
            center,
        }
    }

    /// True if the label carries the corner/payload delimiter.
    pub fn has_payload_delimiter(&self) -> bool {
        self.label.contains(LABEL_DELIMITER)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionAttempt {
    /// Grayscale of the reduced photograph.
    Direct,
    /// Binary threshold of the reduced photograph.
    Thresholded,
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub markers: Vec<Marker>,
    pub attempt: DetectionAttempt,
    /// Reduction factor applied before decoding (1.0 when not reduced).
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Longest side of the image handed to the decoder.
    pub max_dimension: u32,
    /// Minimum number of markers whose label carries the delimiter.
    pub min_markers: usize,
    /// Gray level above which the fallback pass turns a pixel white.
    pub binary_threshold: u8,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1600,
            min_markers: 3,
            binary_threshold: 100,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_dimension == 0 {
            return Err(ConfigError::InvalidSetting(
                "detection.max_dimension must be positive".to_string(),
            ));
        }
        if self.min_markers == 0 {
            return Err(ConfigError::InvalidSetting(
                "detection.min_markers must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FiducialDetector<D = QrDecoder> {
    config: DetectionConfig,
    decoder: D,
}

impl FiducialDetector<QrDecoder> {
    pub fn new(config: DetectionConfig) -> Self {
        Self::with_decoder(config, QrDecoder)
    }
}

impl<D: MarkerDecoder> FiducialDetector<D> {
    pub fn with_decoder(config: DetectionConfig, decoder: D) -> Self {
        Self { config, decoder }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn detect(&self, photo: &RgbImage) -> Result<Detection, DetectionFailure> {
        let required = self.config.min_markers;
        let (reduced, scale) = reduce(photo, self.config.max_dimension);
        let gray = imageops::grayscale(&reduced);

        let direct = self.decode_pass(&gray, scale);
        let direct_count = count_labeled(&direct);
        tracing::debug!(
            "direct pass: {} markers, {} labeled (scale {:.3})",
            direct.len(),
            direct_count,
            scale
        );

        let (markers, attempt, found) = if direct_count >= required {
            (direct, DetectionAttempt::Direct, direct_count)
        } else {
            let binary = threshold(&gray, self.config.binary_threshold);
            let thresholded = self.decode_pass(&binary, scale);
            let thresholded_count = count_labeled(&thresholded);
            tracing::debug!(
                "thresholded pass: {} markers, {} labeled",
                thresholded.len(),
                thresholded_count
            );

            if thresholded_count > direct_count {
                (thresholded, DetectionAttempt::Thresholded, thresholded_count)
            } else {
                (direct, DetectionAttempt::Direct, direct_count)
            }
        };

        if found < required {
            return Err(DetectionFailure::TooFewMarkers { found, required });
        }

        Ok(Detection {
            markers,
            attempt,
            scale,
        })
    }

    fn decode_pass(&self, image: &GrayImage, scale: f64) -> Vec<Marker> {
        self.decoder
            .decode(image)
            .into_iter()
            .filter(|m| !m.label.is_empty())
            .map(|m| Marker {
                center: m.centroid() / scale,
                label: m.label,
            })
            .collect()
    }
}

fn count_labeled(markers: &[Marker]) -> usize {
    markers.iter().filter(|m| m.has_payload_delimiter()).count()
}

/// Downscale so the longest side is at most `max_dimension`.
fn reduce(photo: &RgbImage, max_dimension: u32) -> (RgbImage, f64) {
    let (w, h) = photo.dimensions();
    let longest = w.max(h);
    if longest <= max_dimension || longest == 0 {
        return (photo.clone(), 1.0);
    }

    let scale = max_dimension as f64 / longest as f64;
    let nw = ((w as f64 * scale).round() as u32).max(1);
    let nh = ((h as f64 * scale).round() as u32).max(1);
    (
        imageops::resize(photo, nw, nh, FilterType::Triangle),
        scale,
    )
}

fn threshold(gray: &GrayImage, level: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}
