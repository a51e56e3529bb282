//! Frame overlay composited over the drawing layer.

#[cfg(test)]
mod tests;

use std::path::Path;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};

use crate::error::ConfigError;

/// Foreground image, already sized to the canvas.
#[derive(Debug, Clone)]
pub enum Overlay {
    /// Blended with straight alpha.
    Alpha(RgbaImage),
    /// No alpha channel: replaces the drawing layer.
    Opaque(RgbImage),
}

impl Overlay {
    /// Load `path` and fit it to `width x height` with a triangle filter.
    pub fn load(path: &Path, width: u32, height: u32) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::MissingOverlay(path.to_path_buf()));
        }
        let decoded = image::open(path).map_err(|source| ConfigError::OverlayLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let overlay = if decoded.color().has_alpha() {
            Overlay::Alpha(decoded.to_rgba8())
        } else {
            tracing::warn!(
                "overlay '{}' has no alpha channel, it will replace the drawing layer",
                path.display()
            );
            Overlay::Opaque(decoded.to_rgb8())
        };

        let overlay = overlay.fit(width, height);
        tracing::info!(
            "loaded overlay '{}' ({}x{})",
            path.display(),
            width,
            height
        );
        Ok(overlay)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Overlay::Alpha(img) => img.dimensions(),
            Overlay::Opaque(img) => img.dimensions(),
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, Overlay::Alpha(_))
    }

    /// Resize to `width x height` if the size differs.
    pub fn fit(self, width: u32, height: u32) -> Self {
        if self.dimensions() == (width, height) {
            return self;
        }
        tracing::debug!(
            "resizing overlay {:?} to {}x{}",
            self.dimensions(),
            width,
            height
        );
        match self {
            Overlay::Alpha(img) => {
                Overlay::Alpha(imageops::resize(&img, width, height, FilterType::Triangle))
            }
            Overlay::Opaque(img) => {
                Overlay::Opaque(imageops::resize(&img, width, height, FilterType::Triangle))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayBlender<'a> {
    overlay: Option<&'a Overlay>,
}

impl<'a> OverlayBlender<'a> {
    pub fn new(overlay: Option<&'a Overlay>) -> Self {
        Self { overlay }
    }

    /// Composite the overlay over `layer`. Without an overlay `layer` is returned unchanged.
    pub fn blend(&self, layer: RgbImage) -> RgbImage {
        let Some(overlay) = self.overlay else {
            return layer;
        };

        let (width, height) = layer.dimensions();
        if overlay.dimensions() != (width, height) {
            let fitted = overlay.clone().fit(width, height);
            return composite(&fitted, layer);
        }
        composite(overlay, layer)
    }
}

fn composite(overlay: &Overlay, mut layer: RgbImage) -> RgbImage {
    match overlay {
        Overlay::Opaque(fg) => fg.clone(),
        Overlay::Alpha(fg) => {
            for (bg, fg) in layer.pixels_mut().zip(fg.pixels()) {
                *bg = blend_pixel(*bg, fg.0);
            }
            layer
        }
    }
}

/// `fg * a + bg * (1 - a)` with `a = alpha / 255`, truncated.
#[inline]
pub fn blend_pixel(bg: Rgb<u8>, fg: [u8; 4]) -> Rgb<u8> {
    match fg[3] {
        0 => bg,
        255 => Rgb([fg[0], fg[1], fg[2]]),
        alpha => {
            let a = alpha as f32 / 255.0;
            let mix = |f: u8, b: u8| (f as f32 * a + b as f32 * (1.0 - a)) as u8;
            Rgb([
                mix(fg[0], bg.0[0]),
                mix(fg[1], bg.0[1]),
                mix(fg[2], bg.0[2]),
            ])
        }
    }
}
