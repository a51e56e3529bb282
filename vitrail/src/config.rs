//! Application configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fiducial::DetectionConfig;
use crate::queue::{QueueDirs, WorkerConfig};
use crate::rectify::RectifyConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DewarpStageConfig {
    pub inbox: PathBuf,
    pub archive: PathBuf,
    pub errors: PathBuf,
    pub outbox: PathBuf,
}

impl Default for DewarpStageConfig {
    fn default() -> Self {
        Self {
            inbox: PathBuf::from("content/raw_photo"),
            archive: PathBuf::from("content/raw_photo_archive"),
            errors: PathBuf::from("content/raw_photo_errors"),
            outbox: PathBuf::from("content/cropped"),
        }
    }
}

impl DewarpStageConfig {
    pub fn dirs(&self) -> QueueDirs {
        QueueDirs {
            inbox: self.inbox.clone(),
            archive: self.archive.clone(),
            errors: self.errors.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrapStageConfig {
    pub inbox: PathBuf,
    pub archive: PathBuf,
    pub errors: PathBuf,
    pub outbox: PathBuf,
    /// Also write `<root>/<stem>/wrap.<ext>` for every composite.
    pub extra_output_root: Option<PathBuf>,
}

impl Default for WrapStageConfig {
    fn default() -> Self {
        Self {
            inbox: PathBuf::from("content/cropped"),
            archive: PathBuf::from("content/cropped_archive"),
            errors: PathBuf::from("content/cropped_errors"),
            outbox: PathBuf::from("content/composite"),
            extra_output_root: None,
        }
    }
}

impl WrapStageConfig {
    pub fn dirs(&self) -> QueueDirs {
        QueueDirs {
            inbox: self.inbox.clone(),
            archive: self.archive.clone(),
            errors: self.errors.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mapping_path: PathBuf,
    pub overlay_path: Option<PathBuf>,
    pub detection: DetectionConfig,
    pub rectify: RectifyConfig,
    pub dewarp: DewarpStageConfig,
    pub wrap: WrapStageConfig,
    pub worker: WorkerConfig,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mapping_path: PathBuf::from("full_map_config.json"),
            overlay_path: None,
            detection: DetectionConfig::default(),
            rectify: RectifyConfig::default(),
            dewarp: DewarpStageConfig::default(),
            wrap: WrapStageConfig::default(),
            worker: WorkerConfig::default(),
            log_level: "info".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detection.validate()?;
        self.rectify.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::test_utils::fresh_test_dir;

    #[test]
    fn empty_object_is_all_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.rectify.output_width, 486);
        assert_eq!(config.detection.min_markers, 3);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "overlay_path": "frame.png",
                "detection": { "max_dimension": 1200 },
                "wrap": {
                    "inbox": "in",
                    "archive": "done",
                    "errors": "err",
                    "outbox": "out",
                    "extra_output_root": "full"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(config.overlay_path, Some(PathBuf::from("frame.png")));
        assert_eq!(config.detection.max_dimension, 1200);
        assert_eq!(config.detection.binary_threshold, 100);
        assert_eq!(config.wrap.dirs().inbox, PathBuf::from("in"));
        assert_eq!(config.wrap.extra_output_root, Some(PathBuf::from("full")));
        assert_eq!(config.dewarp, DewarpStageConfig::default());
    }

    #[test]
    fn partial_stage_sections_fill_missing_dirs() {
        let config: AppConfig = serde_json::from_str(
            r#"{
                "dewarp": { "outbox": "x" },
                "wrap": { "inbox": "from_dewarp" }
            }"#,
        )
        .unwrap();

        let dewarp_defaults = DewarpStageConfig::default();
        assert_eq!(config.dewarp.outbox, PathBuf::from("x"));
        assert_eq!(config.dewarp.dirs(), dewarp_defaults.dirs());

        let wrap_defaults = WrapStageConfig::default();
        assert_eq!(config.wrap.inbox, PathBuf::from("from_dewarp"));
        assert_eq!(config.wrap.archive, wrap_defaults.archive);
        assert_eq!(config.wrap.outbox, wrap_defaults.outbox);
        assert_eq!(config.wrap.extra_output_root, None);
    }

    #[test]
    fn load_rejects_invalid_settings() {
        let dir = fresh_test_dir("app_config");
        let path = dir.join("vitrail.json");
        fs::write(&path, r#"{ "rectify": { "output_width": 0 } }"#).unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::InvalidSetting(_))
        ));
    }
}
