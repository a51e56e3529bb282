use common::test_utils::fresh_test_dir;
use image::{Rgb, RgbImage, Rgba, RgbaImage};

use super::*;

#[test]
fn blend_pixel_alpha_bounds() {
    let bg = Rgb([10, 20, 30]);
    assert_eq!(blend_pixel(bg, [200, 100, 50, 0]), bg);
    assert_eq!(blend_pixel(bg, [200, 100, 50, 255]), Rgb([200, 100, 50]));
}

#[test]
fn blend_pixel_half_alpha_truncates() {
    // 100 * 128/255 = 50.19...
    assert_eq!(blend_pixel(Rgb([0, 0, 0]), [100, 100, 100, 128]), Rgb([50, 50, 50]));
    // 200 * (1 - 128/255) = 99.6...
    assert_eq!(blend_pixel(Rgb([200, 200, 200]), [0, 0, 0, 128]), Rgb([99, 99, 99]));
}

#[test]
fn no_overlay_passes_through() {
    let layer = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
    let out = OverlayBlender::new(None).blend(layer.clone());
    assert_eq!(out, layer);
}

#[test]
fn alpha_overlay_keeps_transparent_holes() {
    let fg = RgbaImage::from_fn(4, 2, |x, _| {
        if x < 2 {
            Rgba([50, 60, 70, 255])
        } else {
            Rgba([50, 60, 70, 0])
        }
    });
    let overlay = Overlay::Alpha(fg);
    let layer = RgbImage::from_pixel(4, 2, Rgb([200, 200, 200]));

    let out = OverlayBlender::new(Some(&overlay)).blend(layer);

    assert_eq!(*out.get_pixel(0, 0), Rgb([50, 60, 70]));
    assert_eq!(*out.get_pixel(3, 1), Rgb([200, 200, 200]));
}

#[test]
fn opaque_overlay_replaces_layer() {
    let overlay = Overlay::Opaque(RgbImage::from_pixel(3, 3, Rgb([9, 9, 9])));
    let layer = RgbImage::from_pixel(3, 3, Rgb([200, 0, 0]));
    let out = OverlayBlender::new(Some(&overlay)).blend(layer);
    assert_eq!(out, RgbImage::from_pixel(3, 3, Rgb([9, 9, 9])));
}

#[test]
fn mismatched_overlay_is_fitted_at_blend() {
    let overlay = Overlay::Opaque(RgbImage::from_pixel(2, 2, Rgb([7, 7, 7])));
    let out = OverlayBlender::new(Some(&overlay)).blend(RgbImage::new(6, 4));
    assert_eq!(out.dimensions(), (6, 4));
    assert_eq!(*out.get_pixel(5, 3), Rgb([7, 7, 7]));
}

#[test]
fn load_resizes_to_canvas_and_detects_alpha() {
    let dir = fresh_test_dir("overlay_load");

    let rgba_path = dir.join("frame.png");
    RgbaImage::from_pixel(20, 10, Rgba([0, 0, 0, 128]))
        .save(&rgba_path)
        .unwrap();
    let overlay = Overlay::load(&rgba_path, 40, 30).unwrap();
    assert!(overlay.has_alpha());
    assert_eq!(overlay.dimensions(), (40, 30));

    let rgb_path = dir.join("frame_rgb.png");
    RgbImage::from_pixel(40, 30, Rgb([1, 1, 1]))
        .save(&rgb_path)
        .unwrap();
    let overlay = Overlay::load(&rgb_path, 40, 30).unwrap();
    assert!(!overlay.has_alpha());
}

#[test]
fn load_reports_missing_and_corrupt_files() {
    let dir = fresh_test_dir("overlay_errors");
    assert!(matches!(
        Overlay::load(&dir.join("absent.png"), 10, 10),
        Err(ConfigError::MissingOverlay(_))
    ));

    let corrupt = dir.join("corrupt.png");
    std::fs::write(&corrupt, b"definitely not a png").unwrap();
    assert!(matches!(
        Overlay::load(&corrupt, 10, 10),
        Err(ConfigError::OverlayLoad { .. })
    ));
}
