use std::path::{Path, PathBuf};

use image::RgbImage;

use super::{ensure_dir, file_name, load_rgb, save_rgb};
use crate::corners::{
    CornerKey, CornerSetResolver, MissingCornerPolicy, ParallelogramPolicy, PatternId,
};
use crate::error::Result;
use crate::fiducial::{DetectionConfig, FiducialDetector, MarkerDecoder, QrDecoder};
use crate::queue::Job;
use crate::rectify::{PerspectiveRectifier, RectifyConfig};

/// Upright artwork recovered from one photograph.
#[derive(Debug, Clone)]
pub struct RectifiedScan {
    pub image: RgbImage,
    pub pattern: PatternId,
    pub reconstructed: Option<CornerKey>,
}

impl RectifiedScan {
    /// `flat_p<pattern>_<original name>`. Characters of the pattern other
    /// than ASCII alphanumerics, `-` and `_` become `_`.
    pub fn output_name(&self, input_name: &str) -> String {
        format!("flat_p{}_{}", filename_token(self.pattern.as_str()), input_name)
    }
}

fn filename_token(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Detection, corner resolution and rectification.
#[derive(Debug)]
pub struct DewarpPipeline<D = QrDecoder, P = ParallelogramPolicy> {
    detector: FiducialDetector<D>,
    resolver: CornerSetResolver<P>,
    rectifier: PerspectiveRectifier,
}

impl DewarpPipeline {
    pub fn new(detection: DetectionConfig, rectify: RectifyConfig) -> Self {
        Self::from_parts(
            FiducialDetector::new(detection),
            CornerSetResolver::new(),
            PerspectiveRectifier::new(rectify),
        )
    }
}

impl<D: MarkerDecoder, P: MissingCornerPolicy> DewarpPipeline<D, P> {
    pub fn from_parts(
        detector: FiducialDetector<D>,
        resolver: CornerSetResolver<P>,
        rectifier: PerspectiveRectifier,
    ) -> Self {
        Self {
            detector,
            resolver,
            rectifier,
        }
    }

    pub fn run(&self, photo: &RgbImage) -> Result<RectifiedScan> {
        let detection = self.detector.detect(photo)?;
        let resolved = self.resolver.resolve(&detection.markers)?;
        let image = self.rectifier.rectify(photo, &resolved.quad)?;

        Ok(RectifiedScan {
            image,
            pattern: resolved.pattern,
            reconstructed: resolved.reconstructed,
        })
    }
}

pub struct DewarpJob<D = QrDecoder, P = ParallelogramPolicy> {
    pipeline: DewarpPipeline<D, P>,
    outbox: PathBuf,
}

impl<D: MarkerDecoder, P: MissingCornerPolicy> DewarpJob<D, P> {
    pub fn new(pipeline: DewarpPipeline<D, P>, outbox: impl Into<PathBuf>) -> Self {
        Self {
            pipeline,
            outbox: outbox.into(),
        }
    }
}

impl<D: MarkerDecoder, P: MissingCornerPolicy> Job for DewarpJob<D, P> {
    fn name(&self) -> &str {
        "dewarp"
    }

    fn process(&self, input: &Path) -> Result<Vec<PathBuf>> {
        let photo = load_rgb(input)?;
        let scan = self.pipeline.run(&photo)?;

        ensure_dir(&self.outbox)?;
        let output = self.outbox.join(scan.output_name(&file_name(input)?));
        save_rgb(&scan.image, &output)?;

        match scan.reconstructed {
            Some(key) => tracing::info!(
                "pattern {} (reconstructed {}) -> '{}'",
                scan.pattern,
                key,
                output.display()
            ),
            None => tracing::info!("pattern {} -> '{}'", scan.pattern, output.display()),
        }
        Ok(vec![output])
    }
}
