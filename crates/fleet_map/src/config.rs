//! Map surface configuration: initial viewport and base style.
//!
//! Loaded from `fleet_map.json` in the working directory when present. Every field has a
//! default so a partial file is fine; unknown fields are rejected so typos surface early.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::GeoPoint;

pub const CONFIG_FILE_NAME: &str = "fleet_map.json";
pub const CONFIG_FILE_VERSION: u32 = 1;

const ZOOM_FLOOR: u8 = 1;
const ZOOM_CEILING: u8 = 20;

/// Douala city centre.
pub const DEFAULT_CENTER: GeoPoint = GeoPoint {
    lat: 4.0511,
    lng: 9.7679,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read map config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse map config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unsupported map config version {0}")]
    Version(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BaseStyle {
    pub dark_mode: bool,
    pub show_traffic: bool,
    pub show_labels: bool,
    pub show_grid: bool,
}

impl Default for BaseStyle {
    fn default() -> Self {
        Self {
            dark_mode: true,
            show_traffic: false,
            show_labels: true,
            show_grid: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SurfaceConfig {
    pub version: u32,
    pub center: GeoPoint,
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub style: BaseStyle,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FILE_VERSION,
            center: DEFAULT_CENTER,
            zoom: 12,
            min_zoom: 3,
            max_zoom: 18,
            style: BaseStyle::default(),
        }
    }
}

impl SurfaceConfig {
    pub fn from_json_str(data: &str) -> Result<Self, ConfigError> {
        let config: SurfaceConfig = serde_json::from_str(data)?;
        if config.version != CONFIG_FILE_VERSION {
            return Err(ConfigError::Version(config.version));
        }
        Ok(config)
    }

    /// Clamp zoom bounds into the supported range and the zoom into the bounds; replace
    /// an undrawable center with the default.
    pub fn normalized(mut self) -> Self {
        self.min_zoom = self.min_zoom.clamp(ZOOM_FLOOR, ZOOM_CEILING);
        self.max_zoom = self.max_zoom.clamp(self.min_zoom, ZOOM_CEILING);
        self.zoom = self.zoom.clamp(self.min_zoom, self.max_zoom);
        if GeoPoint::new(self.center.lat, self.center.lng).is_none() {
            self.center = DEFAULT_CENTER;
        }
        self
    }
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let cwd = std::env::current_dir().map_err(|source| ConfigError::Read {
        path: PathBuf::from("."),
        source,
    })?;
    Ok(cwd.join(CONFIG_FILE_NAME))
}

/// Load and normalize a config file. A missing file yields the defaults.
pub fn load_surface_config(path: &Path) -> Result<SurfaceConfig, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            tracing::info!(target: "fleet_map::config", path = %path.display(), "config.defaults");
            return Ok(SurfaceConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let config = SurfaceConfig::from_json_str(&contents)?.normalized();
    tracing::info!(
        target: "fleet_map::config",
        path = %path.display(),
        zoom = config.zoom,
        "config.loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_test_path(label: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("fleet_map_config_tests_{label}_{nanos}.json"))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let path = unique_test_path("missing");
        let config = load_surface_config(&path).expect("missing file is not an error");
        assert_eq!(config, SurfaceConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config =
            SurfaceConfig::from_json_str(r#"{"zoom": 14, "style": {"show_traffic": true}}"#)
                .expect("partial config should parse");
        assert_eq!(config.zoom, 14);
        assert!(config.style.show_traffic);
        assert!(config.style.show_labels);
        assert_eq!(config.center, DEFAULT_CENTER);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = SurfaceConfig::from_json_str(r#"{"zooom": 14}"#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn future_version_is_rejected() {
        let result = SurfaceConfig::from_json_str(r#"{"version": 2}"#);
        assert!(matches!(result, Err(ConfigError::Version(2))));
    }

    #[test]
    fn malformed_file_is_reported() {
        let path = unique_test_path("malformed");
        fs::write(&path, "{ not json").expect("fixture should be written");
        let result = load_surface_config(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn normalization_clamps_out_of_range_values() {
        let config = SurfaceConfig {
            zoom: 30,
            min_zoom: 0,
            max_zoom: 40,
            center: GeoPoint {
                lat: 120.0,
                lng: 9.0,
            },
            ..SurfaceConfig::default()
        }
        .normalized();
        assert_eq!(config.min_zoom, 1);
        assert_eq!(config.max_zoom, 20);
        assert_eq!(config.zoom, 20);
        assert_eq!(config.center, DEFAULT_CENTER);

        let inverted = SurfaceConfig {
            zoom: 2,
            min_zoom: 10,
            max_zoom: 5,
            ..SurfaceConfig::default()
        }
        .normalized();
        assert_eq!(inverted.max_zoom, 10);
        assert_eq!(inverted.zoom, 10);
    }
}
