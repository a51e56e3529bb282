use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;

use super::{ensure_dir, file_name, load_rgb, save_rgb};
use crate::compositor::{MappingConfig, ZoneCompositor};
use crate::error::Result;
use crate::overlay::{Overlay, OverlayBlender};
use crate::queue::Job;

/// Geometry and overlay loaded once at startup.
#[derive(Debug, Clone)]
pub struct WrapContext {
    pub mapping: MappingConfig,
    pub overlay: Option<Overlay>,
}

impl WrapContext {
    /// Load the mapping and, if given, an overlay fitted to its canvas.
    pub fn load(mapping_path: &Path, overlay_path: Option<&Path>) -> Result<Self> {
        let mapping = MappingConfig::load(mapping_path)?;
        let overlay = overlay_path
            .map(|path| Overlay::load(path, mapping.target_w, mapping.target_h))
            .transpose()?;
        Ok(Self { mapping, overlay })
    }

    /// Drawing layer with the overlay on top.
    pub fn composite(&self, artwork: &RgbImage) -> RgbImage {
        let layer = ZoneCompositor::new(&self.mapping).compose(artwork);
        if !layer.skipped.is_empty() {
            tracing::warn!("{} zone(s) skipped: {:?}", layer.skipped.len(), layer.skipped);
        }
        OverlayBlender::new(self.overlay.as_ref()).blend(layer.image)
    }
}

pub struct WrapJob {
    context: WrapContext,
    outbox: PathBuf,
    extra_output_root: Option<PathBuf>,
}

impl WrapJob {
    pub fn new(
        context: WrapContext,
        outbox: impl Into<PathBuf>,
        extra_output_root: Option<PathBuf>,
    ) -> Self {
        Self {
            context,
            outbox: outbox.into(),
            extra_output_root,
        }
    }

    /// `<root>/<stem>/wrap.<ext>` for `input_name`.
    pub fn extra_output_path(root: &Path, input_name: &str) -> PathBuf {
        let name = Path::new(input_name);
        let stem = name
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut wrap_name = String::from("wrap");
        if let Some(ext) = name.extension() {
            wrap_name.push('.');
            wrap_name.push_str(&ext.to_string_lossy());
        }
        root.join(stem).join(wrap_name)
    }

    fn write_extra(&self, composite: &RgbImage, input_name: &str) -> Option<PathBuf> {
        let root = self.extra_output_root.as_ref()?;
        let path = Self::extra_output_path(root, input_name);

        let written = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .map_err(|err| err.to_string())
            .and_then(|()| save_rgb(composite, &path).map_err(|err| err.to_string()));

        match written {
            Ok(()) => Some(path),
            Err(err) => {
                tracing::warn!("failed to write '{}': {}", path.display(), err);
                None
            }
        }
    }
}

impl Job for WrapJob {
    fn name(&self) -> &str {
        "wrap"
    }

    fn process(&self, input: &Path) -> Result<Vec<PathBuf>> {
        let artwork = load_rgb(input)?;
        let composite = self.context.composite(&artwork);

        let name = file_name(input)?;
        ensure_dir(&self.outbox)?;
        let output = self.outbox.join(&name);
        save_rgb(&composite, &output)?;

        let mut outputs = vec![output];
        outputs.extend(self.write_extra(&composite, &name));
        Ok(outputs)
    }
}
