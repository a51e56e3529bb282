//! Photo to composite, end to end, with a scripted marker decoder.

use std::sync::atomic::AtomicBool;

use common::file_utils::PHOTO_EXTENSIONS;
use common::test_utils::fresh_test_dir;
use glam::DVec2;
use image::{GrayImage, Rgb, RgbImage};

use vitrail::corners::CornerSetResolver;
use vitrail::fiducial::{DecodedMarker, DetectionConfig, FiducialDetector, MarkerDecoder};
use vitrail::interpolation::warp_perspective;
use vitrail::queue::{FileQueue, QueueDirs, Worker, WorkerConfig};
use vitrail::rectify::RectifyConfig;
use vitrail::stages::{DewarpJob, DewarpPipeline, WrapContext};
use vitrail::{Homography, MappingConfig, PerspectiveRectifier, Quad, Rotation, ZoneMapping};

const RED: Rgb<u8> = Rgb([220, 30, 30]);
const GREEN: Rgb<u8> = Rgb([30, 200, 40]);
const BLUE: Rgb<u8> = Rgb([20, 40, 210]);
const YELLOW: Rgb<u8> = Rgb([230, 220, 20]);

/// Markers centered on the given sheet corners.
struct CornerDecoder(Vec<(String, DVec2)>);

impl MarkerDecoder for CornerDecoder {
    fn decode(&self, _image: &GrayImage) -> Vec<DecodedMarker> {
        self.0
            .iter()
            .map(|(label, c)| DecodedMarker {
                label: label.clone(),
                corners: [
                    *c + DVec2::new(-4.0, -4.0),
                    *c + DVec2::new(4.0, -4.0),
                    *c + DVec2::new(4.0, 4.0),
                    *c + DVec2::new(-4.0, 4.0),
                ],
            })
            .collect()
    }
}

fn quadrant_sheet(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| match (x < width / 2, y < height / 2) {
        (true, true) => RED,
        (false, true) => GREEN,
        (true, false) => BLUE,
        (false, false) => YELLOW,
    })
}

fn photographed_quad() -> Quad {
    Quad::new(
        DVec2::new(120.0, 60.0),
        DVec2::new(470.0, 90.0),
        DVec2::new(500.0, 420.0),
        DVec2::new(90.0, 400.0),
    )
}

/// The sheet as a camera would see it, on a gray background.
fn photograph(sheet: &RgbImage) -> RgbImage {
    let quad = photographed_quad();
    let to_photo = Homography::rect_to_quad(sheet.width(), sheet.height(), &quad.points()).unwrap();
    let warped = warp_perspective(sheet, &to_photo, 640, 480).unwrap();
    RgbImage::from_fn(640, 480, |x, y| {
        let p = *warped.get_pixel(x, y);
        if p == Rgb([0, 0, 0]) {
            Rgb([128, 128, 128])
        } else {
            p
        }
    })
}

fn corner_decoder(labels: &[&str]) -> CornerDecoder {
    let quad = photographed_quad();
    let points = quad.points();
    CornerDecoder(
        ["TL_5", "TR_5", "BR_5", "BL_5"]
            .iter()
            .zip(points)
            .filter(|(label, _)| labels.contains(label))
            .map(|(label, p)| (label.to_string(), p))
            .collect(),
    )
}

fn upright_pipeline(decoder: CornerDecoder) -> DewarpPipeline<CornerDecoder> {
    DewarpPipeline::from_parts(
        FiducialDetector::with_decoder(DetectionConfig::default(), decoder),
        CornerSetResolver::new(),
        PerspectiveRectifier::new(RectifyConfig {
            output_width: 200,
            output_height: 300,
            rotation: Rotation::None,
            ..Default::default()
        }),
    )
}

fn assert_close(actual: Rgb<u8>, expected: Rgb<u8>) {
    for c in 0..3 {
        assert!(
            (actual.0[c] as i32 - expected.0[c] as i32).abs() <= 8,
            "{actual:?} != {expected:?}"
        );
    }
}

#[test]
fn rectification_recovers_sheet_layout() {
    let sheet = quadrant_sheet(200, 300);
    let photo = photograph(&sheet);

    let scan = upright_pipeline(corner_decoder(&["TL_5", "TR_5", "BR_5", "BL_5"]))
        .run(&photo)
        .unwrap();

    assert_eq!(scan.pattern.as_str(), "5");
    assert_eq!(scan.image.dimensions(), (200, 300));
    assert_close(*scan.image.get_pixel(50, 75), RED);
    assert_close(*scan.image.get_pixel(150, 75), GREEN);
    assert_close(*scan.image.get_pixel(50, 225), BLUE);
    assert_close(*scan.image.get_pixel(150, 225), YELLOW);
}

#[test]
fn default_output_is_rotated_clockwise() {
    let photo = photograph(&quadrant_sheet(200, 300));
    let pipeline = DewarpPipeline::from_parts(
        FiducialDetector::with_decoder(
            DetectionConfig::default(),
            corner_decoder(&["TL_5", "TR_5", "BR_5", "BL_5"]),
        ),
        CornerSetResolver::new(),
        PerspectiveRectifier::default(),
    );

    let scan = pipeline.run(&photo).unwrap();

    assert_eq!(scan.image.dimensions(), (486, 727));
    // After a clockwise quarter turn the sheet's top-left quadrant sits top-right.
    assert_close(*scan.image.get_pixel(486 * 3 / 4, 727 / 4), RED);
    assert_close(*scan.image.get_pixel(486 / 4, 727 / 4), BLUE);
}

#[test]
fn occluded_corner_still_rectifies() {
    let photo = photograph(&quadrant_sheet(200, 300));

    let scan = upright_pipeline(corner_decoder(&["TL_5", "TR_5", "BL_5"]))
        .run(&photo)
        .unwrap();

    assert_eq!(scan.reconstructed, Some(vitrail::CornerKey::BottomRight));
    // The quad is approximate, but the quadrant centers remain distinct.
    assert_close(*scan.image.get_pixel(50, 75), RED);
    assert_close(*scan.image.get_pixel(150, 75), GREEN);
}

#[test]
fn rectified_artwork_lands_in_window_panes() {
    let artwork = quadrant_sheet(486, 727);
    let full = vec![[0.0, 0.0], [485.0, 0.0], [485.0, 726.0], [0.0, 726.0]];
    let context = WrapContext {
        mapping: MappingConfig {
            target_w: 400,
            target_h: 300,
            mapping: vec![
                ZoneMapping {
                    name: Some("left".to_string()),
                    source_points: full.clone(),
                    target_points: vec![[20.0, 20.0], [179.0, 20.0], [179.0, 279.0], [20.0, 279.0]],
                },
                ZoneMapping {
                    name: Some("right arch".to_string()),
                    source_points: full,
                    target_points: vec![
                        [220.0, 80.0],
                        [300.0, 20.0],
                        [379.0, 80.0],
                        [379.0, 279.0],
                        [220.0, 279.0],
                    ],
                },
            ],
        },
        overlay: None,
    };

    let composite = context.composite(&artwork);

    assert_eq!(composite.dimensions(), (400, 300));
    assert_close(*composite.get_pixel(60, 60), RED);
    assert_close(*composite.get_pixel(140, 240), YELLOW);
    assert_close(*composite.get_pixel(250, 120), RED);
    assert_eq!(*composite.get_pixel(200, 150), Rgb([0, 0, 0]));
    assert_eq!(*composite.get_pixel(5, 5), Rgb([0, 0, 0]));
}

#[test]
fn dewarp_worker_drains_inbox() {
    let root = fresh_test_dir("pipeline_worker");
    let dirs = QueueDirs::under(&root);
    std::fs::create_dir_all(&dirs.inbox).unwrap();
    photograph(&quadrant_sheet(200, 300))
        .save(dirs.inbox.join("shot.png"))
        .unwrap();
    std::fs::write(dirs.inbox.join("notes.txt"), b"ignored").unwrap();

    let job = DewarpJob::new(
        upright_pipeline(corner_decoder(&["TL_5", "TR_5", "BR_5", "BL_5"])),
        root.join("artwork"),
    );
    let worker = Worker::new(
        FileQueue::new(dirs.clone(), PHOTO_EXTENSIONS),
        job,
        WorkerConfig {
            poll_interval_ms: 0,
            settle_delay_ms: 0,
        },
    );
    worker.queue().ensure_dirs().unwrap();

    let summary = worker.run_once(&AtomicBool::new(false)).unwrap();

    assert_eq!(summary.processed, 1);
    assert!(root.join("artwork").join("flat_p5_shot.png").exists());
    assert!(dirs.archive.join("shot.png").exists());
    assert!(dirs.inbox.join("notes.txt").exists());
}
