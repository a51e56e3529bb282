//! Placement of the rectified artwork into the window panes of the canvas.
//!
//! Each zone is warped in two steps: artwork quad to a flat patch sized by
//! the destination, then flat patch to the destination quad. Only pixels
//! inside the destination polygon are written. A zone that fails geometry
//! checks is skipped and the rest are still drawn.

mod mapping;


pub use mapping::{MappingConfig, ZoneMapping, MAX_CANVAS_DIMENSION};

use glam::DVec2;
use image::{GrayImage, Luma, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use crate::error::GeometryError;
use crate::interpolation::{warp_perspective, warp_perspective_masked};
use crate::math::{reduce_to_four, Homography, Quad};

/// Largest side of the intermediate flat patch.
const MAX_PATCH_DIMENSION: u32 = 8192;

/// Canvas with every drawable zone filled in.
#[derive(Debug, Clone)]
pub struct DrawingLayer {
    pub image: RgbImage,
    /// Indices of zones that could not be drawn.
    pub skipped: Vec<usize>,
}

#[derive(Debug, Clone, Copy)]
pub struct ZoneCompositor<'a> {
    mapping: &'a MappingConfig,
}

impl<'a> ZoneCompositor<'a> {
    pub fn new(mapping: &'a MappingConfig) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &MappingConfig {
        self.mapping
    }

    pub fn compose(&self, artwork: &RgbImage) -> DrawingLayer {
        let mut image = RgbImage::new(self.mapping.target_w, self.mapping.target_h);
        let mut skipped = Vec::new();

        for (index, zone) in self.mapping.mapping.iter().enumerate() {
            match draw_zone(artwork, zone, &mut image) {
                Ok(written) => {
                    tracing::debug!("zone {}: {} pixels", zone.display_name(index), written);
                }
                Err(err) => {
                    tracing::warn!("zone {} skipped: {}", zone.display_name(index), err);
                    skipped.push(index);
                }
            }
        }

        DrawingLayer { image, skipped }
    }
}

fn draw_zone(
    artwork: &RgbImage,
    zone: &ZoneMapping,
    canvas: &mut RgbImage,
) -> Result<usize, GeometryError> {
    let target = zone.target();
    let source_quad = Quad::from_unordered(reduce_to_four(&zone.source())?)?;
    let target_quad = Quad::from_unordered(reduce_to_four(&target)?)?;
    source_quad.check_degenerate(1.0)?;
    target_quad.check_degenerate(1.0)?;

    let (width, height) = target_quad.pixel_extent();
    if width > MAX_PATCH_DIMENSION || height > MAX_PATCH_DIMENSION {
        return Err(GeometryError::TooLarge {
            width,
            height,
            max: MAX_PATCH_DIMENSION,
        });
    }

    let to_flat = Homography::quad_to_rect(&source_quad.points(), width, height)?;
    let patch = warp_perspective(artwork, &to_flat, width, height)?;

    let to_canvas = Homography::rect_to_quad(width, height, &target_quad.points())?;
    let mask = polygon_mask(canvas.width(), canvas.height(), &target)?;
    warp_perspective_masked(&patch, &to_canvas, canvas, &mask)
}

/// Filled polygon mask, edges included. Coordinates are truncated toward zero.
pub fn polygon_mask(
    width: u32,
    height: u32,
    polygon: &[DVec2],
) -> Result<GrayImage, GeometryError> {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(polygon.len());
    for p in polygon {
        let point = Point::new(p.x as i32, p.y as i32);
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return Err(GeometryError::InvalidPolygon(points.len()));
    }

    let mut mask = GrayImage::new(width, height);
    draw_polygon_mut(&mut mask, &points, Luma([255u8]));
    Ok(mask)
}
