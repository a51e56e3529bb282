//! Directory-backed job queue.
//!
//! A job is a file in the inbox. Acknowledging it moves the file to the
//! archive on success or to the error directory on failure, so a restarted
//! worker never sees a finished file again.

mod worker;

#[cfg(test)]
mod tests;

pub use worker::{Job, PassSummary, Worker, WorkerConfig};

use std::fs;
use std::path::{Path, PathBuf};

use common::file_utils::files_by_mtime;

use crate::error::{Error, Result};

/// Prefix given to inputs whose processing panicked.
pub const CRASH_PREFIX: &str = "CRASH_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDirs {
    pub inbox: PathBuf,
    pub archive: PathBuf,
    pub errors: PathBuf,
}

impl QueueDirs {
    pub fn under(root: &Path) -> Self {
        Self {
            inbox: root.join("inbox"),
            archive: root.join("archive"),
            errors: root.join("errors"),
        }
    }
}

/// How a processed input is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Done,
    Failed,
    Crashed,
}

#[derive(Debug, Clone)]
pub struct FileQueue {
    dirs: QueueDirs,
    extensions: &'static [&'static str],
}

impl FileQueue {
    pub fn new(dirs: QueueDirs, extensions: &'static [&'static str]) -> Self {
        Self { dirs, extensions }
    }

    pub fn dirs(&self) -> &QueueDirs {
        &self.dirs
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.dirs.inbox, &self.dirs.archive, &self.dirs.errors] {
            fs::create_dir_all(dir).map_err(|source| Error::Io {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Pending inputs, oldest first.
    pub fn poll(&self) -> Result<Vec<PathBuf>> {
        files_by_mtime(&self.dirs.inbox, self.extensions).map_err(|source| Error::Io {
            path: self.dirs.inbox.clone(),
            source,
        })
    }

    /// Move `input` out of the inbox. Returns the new location, or `None` if
    /// the move failed (logged, never fatal).
    pub fn ack(&self, input: &Path, ack: Ack) -> Option<PathBuf> {
        let file_name = input.file_name()?.to_string_lossy().into_owned();
        let target = match ack {
            Ack::Done => self.dirs.archive.join(&file_name),
            Ack::Failed => self.dirs.errors.join(&file_name),
            Ack::Crashed => self.dirs.errors.join(format!("{CRASH_PREFIX}{file_name}")),
        };

        match move_file(input, &target) {
            Ok(()) => Some(target),
            Err(err) => {
                tracing::error!(
                    "failed to move '{}' to '{}': {}",
                    input.display(),
                    target.display(),
                    err
                );
                None
            }
        }
    }
}

/// Rename, falling back to copy and delete across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}
