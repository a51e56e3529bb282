//! Flattening of the photographed sheet into an upright artwork image.


use image::imageops::{self, FilterType};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, GeometryError};
use crate::interpolation::warp_perspective;
use crate::math::{Homography, Quad};

/// Fixed rotation applied after flattening.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    None,
    #[default]
    Clockwise90,
    Rotate180,
    CounterClockwise90,
}

impl Rotation {
    pub fn apply(self, image: RgbImage) -> RgbImage {
        match self {
            Rotation::None => image,
            Rotation::Clockwise90 => imageops::rotate90(&image),
            Rotation::Rotate180 => imageops::rotate180(&image),
            Rotation::CounterClockwise90 => imageops::rotate270(&image),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    pub output_width: u32,
    pub output_height: u32,
    pub rotation: Rotation,
    /// Smallest accepted quad area in px².
    pub min_area: f64,
    /// Largest accepted side of the intermediate flattened image.
    pub max_dimension: u32,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            output_width: 486,
            output_height: 727,
            rotation: Rotation::Clockwise90,
            min_area: 1.0,
            max_dimension: 8192,
        }
    }
}

impl RectifyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_width == 0 || self.output_height == 0 {
            return Err(ConfigError::InvalidSetting(format!(
                "rectify output size {}x{} is invalid",
                self.output_width, self.output_height
            )));
        }
        if self.max_dimension == 0 {
            return Err(ConfigError::InvalidSetting(
                "rectify.max_dimension must be positive".to_string(),
            ));
        }
        if !self.min_area.is_finite() || self.min_area < 0.0 {
            return Err(ConfigError::InvalidSetting(format!(
                "rectify.min_area {} is invalid",
                self.min_area
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PerspectiveRectifier {
    config: RectifyConfig,
}

impl PerspectiveRectifier {
    pub fn new(config: RectifyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RectifyConfig {
        &self.config
    }

    /// Map `quad` in `photo` onto an upright `output_width x output_height` image.
    pub fn rectify(&self, photo: &RgbImage, quad: &Quad) -> Result<RgbImage, GeometryError> {
        let config = &self.config;
        quad.check_degenerate(config.min_area)?;

        let (width, height) = quad.pixel_extent();
        if width > config.max_dimension || height > config.max_dimension {
            return Err(GeometryError::TooLarge {
                width,
                height,
                max: config.max_dimension,
            });
        }

        let forward = Homography::quad_to_rect(&quad.points(), width, height)?;
        let flat = warp_perspective(photo, &forward, width, height)?;
        let rotated = config.rotation.apply(flat);

        tracing::debug!(
            "flattened {}x{}, rotated to {}x{}, resizing to {}x{}",
            width,
            height,
            rotated.width(),
            rotated.height(),
            config.output_width,
            config.output_height
        );

        if rotated.dimensions() == (config.output_width, config.output_height) {
            return Ok(rotated);
        }
        Ok(imageops::resize(
            &rotated,
            config.output_width,
            config.output_height,
            FilterType::Triangle,
        ))
    }
}
