//! Inverse-mapped perspective resampling of RGB images.
//!
//! For each output pixel the source location is found through the inverse
//! homography and sampled bilinearly. Locations more than half a pixel
//! outside the source read as black.

use glam::DVec2;
use image::{GrayImage, Rgb, RgbImage};

use crate::error::GeometryError;
use crate::math::Homography;

const BORDER: Rgb<u8> = Rgb([0, 0, 0]);

/// Bilinear sample at a sub-pixel location, `None` outside the image.
///
/// Neighbours past the last row/column are clamped to the edge so that
/// samples exactly on the boundary pixel centers are not darkened.
#[inline]
pub fn bilinear_sample(src: &RgbImage, x: f64, y: f64) -> Option<Rgb<u8>> {
    let (w, h) = src.dimensions();
    if w == 0 || h == 0 || !x.is_finite() || !y.is_finite() {
        return None;
    }
    if x < -0.5 || y < -0.5 || x > w as f64 - 0.5 || y > h as f64 - 0.5 {
        return None;
    }

    let x = x.clamp(0.0, (w - 1) as f64);
    let y = y.clamp(0.0, (h - 1) as f64);
    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let p00 = src.get_pixel(x0, y0).0;
    let p10 = src.get_pixel(x1, y0).0;
    let p01 = src.get_pixel(x0, y1).0;
    let p11 = src.get_pixel(x1, y1).0;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f32 + fx * (p10[c] as f32 - p00[c] as f32);
        let bottom = p01[c] as f32 + fx * (p11[c] as f32 - p01[c] as f32);
        out[c] = (top + fy * (bottom - top)).round().clamp(0.0, 255.0) as u8;
    }
    Some(Rgb(out))
}

/// Warp `src` through `forward` (source to output coordinates) into a new
/// `width x height` image.
pub fn warp_perspective(
    src: &RgbImage,
    forward: &Homography,
    width: u32,
    height: u32,
) -> Result<RgbImage, GeometryError> {
    let inverse = forward.inverse()?;
    let mut out = RgbImage::new(width, height);

    for (x, y, pixel) in out.enumerate_pixels_mut() {
        *pixel = inverse
            .apply(DVec2::new(x as f64, y as f64))
            .and_then(|p| bilinear_sample(src, p.x, p.y))
            .unwrap_or(BORDER);
    }

    Ok(out)
}

/// Warp `src` through `forward` directly into `dst`, writing only pixels
/// where `mask` is non-zero. Masked pixels that map outside `src` are
/// written black.
pub fn warp_perspective_masked(
    src: &RgbImage,
    forward: &Homography,
    dst: &mut RgbImage,
    mask: &GrayImage,
) -> Result<usize, GeometryError> {
    debug_assert_eq!(dst.dimensions(), mask.dimensions());
    let inverse = forward.inverse()?;
    let mut written = 0;

    for (x, y, m) in mask.enumerate_pixels() {
        if m.0[0] == 0 {
            continue;
        }
        let value = inverse
            .apply(DVec2::new(x as f64, y as f64))
            .and_then(|p| bilinear_sample(src, p.x, p.y))
            .unwrap_or(BORDER);
        dst.put_pixel(x, y, value);
        written += 1;
    }

    Ok(written)
}
