//! The two queue-driven stages: photo to artwork, artwork to composite.

mod dewarp;
mod wrap;


pub use dewarp::{DewarpJob, DewarpPipeline, RectifiedScan};
pub use wrap::{WrapContext, WrapJob};

use std::path::Path;

use image::RgbImage;

use crate::error::{Error, Result};

pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let image = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(image.to_rgb8())
}

/// Save with the format implied by the extension.
pub fn save_rgb(image: &RgbImage, path: &Path) -> Result<()> {
    image.save(path).map_err(|source| Error::ImageSave {
        path: path.to_path_buf(),
        source,
    })
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| Error::Io {
        path: dir.to_path_buf(),
        source,
    })
}

fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        })
}
