use std::fs;
use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest accepted canvas side, in pixels.
pub const MAX_CANVAS_DIMENSION: u32 = 16384;

fn default_target_w() -> u32 {
    1920
}

fn default_target_h() -> u32 {
    1080
}

/// One window pane: where to take the artwork from and where to put it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Polygon in rectified artwork coordinates, 4 or 5 points.
    pub source_points: Vec<[f64; 2]>,
    /// Polygon in canvas coordinates, 4 or 5 points.
    pub target_points: Vec<[f64; 2]>,
}

impl ZoneMapping {
    pub fn source(&self) -> Vec<DVec2> {
        to_dvec(&self.source_points)
    }

    pub fn target(&self) -> Vec<DVec2> {
        to_dvec(&self.target_points)
    }

    /// Name for logging, falling back to the zone index.
    pub fn display_name(&self, index: usize) -> String {
        self.name.clone().unwrap_or_else(|| format!("#{index}"))
    }
}

fn to_dvec(points: &[[f64; 2]]) -> Vec<DVec2> {
    points.iter().map(|&[x, y]| DVec2::new(x, y)).collect()
}

/// Canvas size and zone list, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default = "default_target_w")]
    pub target_w: u32,
    #[serde(default = "default_target_h")]
    pub target_h: u32,
    #[serde(default)]
    pub mapping: Vec<ZoneMapping>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            target_w: default_target_w(),
            target_h: default_target_h(),
            mapping: Vec::new(),
        }
    }
}

impl MappingConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: MappingConfig =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        tracing::info!(
            "loaded mapping '{}': {}x{} canvas, {} zones",
            path.display(),
            config.target_w,
            config.target_h,
            config.mapping.len()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let in_range = |side: u32| (1..=MAX_CANVAS_DIMENSION).contains(&side);
        if !in_range(self.target_w) || !in_range(self.target_h) {
            return Err(ConfigError::InvalidCanvas {
                width: self.target_w,
                height: self.target_h,
            });
        }

        for (index, zone) in self.mapping.iter().enumerate() {
            check_polygon(index, "source_points", &zone.source_points)?;
            check_polygon(index, "target_points", &zone.target_points)?;
        }
        Ok(())
    }
}

fn check_polygon(index: usize, field: &str, points: &[[f64; 2]]) -> Result<(), ConfigError> {
    if !matches!(points.len(), 4 | 5) {
        return Err(ConfigError::InvalidZone {
            index,
            reason: format!("{field} has {} points, expected 4 or 5", points.len()),
        });
    }
    if points.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ConfigError::InvalidZone {
            index,
            reason: format!("{field} contains a non-finite coordinate"),
        });
    }
    Ok(())
}
