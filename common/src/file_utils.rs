//! File utility functions for listing and filtering files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Raster extensions accepted from the camera side.
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Raster extensions accepted for rectified artwork.
pub const ARTWORK_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Returns true if the path has one of the given extensions (case-insensitive).
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Returns paths to all files in a directory matching the given extensions.
/// Extensions are matched case-insensitively. A missing directory yields no files.
pub fn files_with_extensions(dir: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, extensions) {
            files.push(path);
        }
    }

    Ok(files)
}

/// Same as [`files_with_extensions`], ordered by modification time, oldest first.
///
/// Files whose metadata cannot be read sort last; ties are broken by path.
pub fn files_by_mtime(dir: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<(Option<SystemTime>, PathBuf)> = files_with_extensions(dir, extensions)?
        .into_iter()
        .map(|path| {
            let mtime = fs::metadata(&path).and_then(|m| m.modified()).ok();
            (mtime, path)
        })
        .collect();

    files.sort_by(|(a_time, a_path), (b_time, b_path)| match (a_time, b_time) {
        (Some(a), Some(b)) => a.cmp(b).then_with(|| a_path.cmp(b_path)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a_path.cmp(b_path),
    });

    Ok(files.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(has_extension(Path::new("a/photo.JPG"), PHOTO_EXTENSIONS));
        assert!(has_extension(Path::new("scan.png"), ARTWORK_EXTENSIONS));
        assert!(!has_extension(Path::new("scan.bmp"), ARTWORK_EXTENSIONS));
        assert!(!has_extension(Path::new("noext"), PHOTO_EXTENSIONS));
    }

    #[test]
    fn missing_dir_is_empty() {
        let files = files_by_mtime(Path::new("/nonexistent/vitrail/inbox"), PHOTO_EXTENSIONS)
            .unwrap();
        assert!(files.is_empty());
    }
}
