use std::path::{Path, PathBuf};

use crate::render::camera::{CameraConfig, OrbitSettings};
use crate::render::viewport::DEFAULT_MAX_PIXEL_RATIO;
use crate::scene::binder::MaterialPresets;
use crate::scene::environment::{Background, EnvironmentFilters};
use crate::scene::lighting::{default_rig, LightConfig};

pub const CONFIG_FILE_NAME: &str = "vitrine.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vitrine".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub root: PathBuf,
    pub environment: String,
    pub model: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("assets"),
            environment: "env.hdr".to_string(),
            model: "50g.gltf".to_string(),
        }
    }
}

impl AssetConfig {
    pub fn environment_path(&self) -> PathBuf {
        self.root.join(&self.environment)
    }

    pub fn model_path(&self) -> PathBuf {
        self.root.join(&self.model)
    }
}

/// Application settings; every field falls back to its default when absent.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub assets: AssetConfig,
    pub camera: CameraConfig,
    pub controls: OrbitSettings,
    pub lights: Vec<LightConfig>,
    pub background: Background,
    pub environment_filters: EnvironmentFilters,
    pub materials: MaterialPresets,
    pub max_pixel_ratio: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            assets: AssetConfig::default(),
            camera: CameraConfig::default(),
            controls: OrbitSettings::default(),
            lights: default_rig(),
            background: Background::default(),
            environment_filters: EnvironmentFilters::default(),
            materials: MaterialPresets::default(),
            max_pixel_ratio: DEFAULT_MAX_PIXEL_RATIO,
        }
    }
}

impl AppConfig {
    /// Reads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError};
    use std::path::Path;

    #[test]
    fn defaults_match_the_product_scene() {
        let config = AppConfig::default();
        assert_eq!(config.camera.fov_y_deg, 35.0);
        assert_eq!(config.camera.position, [0.0, 0.7, 2.0]);
        assert_eq!(config.controls.max_distance, 10.0);
        assert!(!config.controls.enable_pan);
        assert_eq!(config.lights.len(), 3);
        assert_eq!(config.max_pixel_ratio, 2.0);
        assert_eq!(config.assets.model_path(), Path::new("assets/50g.gltf"));
        assert_eq!(config.materials.glass.ior, 1.9);
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config = AppConfig::from_json(
            r#"{ "window": { "title": "Demo" }, "controls": { "max_distance": 4.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.window.title, "Demo");
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.controls.max_distance, 4.0);
        assert_eq!(config.controls.damping_factor, 0.05);
        assert_eq!(config.materials.label.textures.len(), 2);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = AppConfig::load_or_default(Path::new("definitely/missing/vitrine.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let mut path = std::env::temp_dir();
        path.push(format!("vitrine_config_{}.json", std::process::id()));
        std::fs::write(&path, "{ \"window\": 3 }").unwrap();
        let result = AppConfig::load_or_default(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
