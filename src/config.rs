use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::CameraPolicy;
use crate::route::MapPosition;

const CONFIG_FILE_NAME: &str = "tourmap.conf";

// --- Map Config ---
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    pub default_lat: f64,
    pub default_lng: f64,
    pub zoom: f64,
    pub fit_padding: f32,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_lat: 28.6139,
            default_lng: 77.209,
            zoom: 14.0,
            fit_padding: 50.0,
            width: Some(1280),
            height: Some(800),
        }
    }
}

impl MapConfig {
    pub fn camera_policy(&self) -> CameraPolicy {
        CameraPolicy {
            default_center: MapPosition::new(self.default_lat, self.default_lng),
            zoom: self.zoom,
            fit_padding: self.fit_padding,
        }
    }
}

// --- Hosted-tile backend (Google Map Tiles API) ---
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct HostedConfig {
    pub api_key: String,
    pub map_type: String,
    pub language: String,
    pub region: String,
    pub session_url: String,
    /// `{z}`, `{x}`, `{y}` are replaced per tile; session and key are appended
    pub tile_url: String,
}

impl Default for HostedConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            map_type: "roadmap".to_string(),
            language: "en-US".to_string(),
            region: "US".to_string(),
            session_url: "https://tile.googleapis.com/v1/createSession".to_string(),
            tile_url: "https://tile.googleapis.com/v1/2dtiles/{z}/{x}/{y}".to_string(),
        }
    }
}

// --- Vector-tile backend (Ola Maps) ---
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct VectorConfig {
    pub api_key: String,
    pub style_name: String,
    pub style_base_url: String,
    pub host_alias_from: String,
    pub host_alias_to: String,
    /// Raster basemap drawn when the style declares no raster source
    pub fallback_tiles: String,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            style_name: "default-light-standard".to_string(),
            style_base_url: "https://api.olamaps.io/tiles/vector/v1/styles".to_string(),
            host_alias_from: "app.olamaps.io".to_string(),
            host_alias_to: "api.olamaps.io".to_string(),
            fallback_tiles: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
        }
    }
}

impl VectorConfig {
    pub fn style_url(&self) -> String {
        format!("{}/{}/style.json", self.style_base_url.trim_end_matches('/'), self.style_name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api_base_url: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub hosted: HostedConfig,
    #[serde(default)]
    pub vector: VectorConfig,
}

fn default_poll_interval() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            poll_interval_secs: default_poll_interval(),
            map: MapConfig::default(),
            hosted: HostedConfig::default(),
            vector: VectorConfig::default(),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("No config dir found")?;
        Ok(config_dir.join(CONFIG_FILE_NAME))
    }

    /// Load the config, creating it with defaults or filling in missing sections.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save(path)?;
            tracing::info!("[CONFIG] Created default config at {:?}", path);
            return Ok(config);
        }

        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        let config = Self::parse(&content).with_context(|| format!("Failed to parse {:?}", path))?;

        let raw_value: toml::Value = toml::from_str(&content)?;
        let missing: Vec<&str> = ["map", "hosted", "vector"]
            .into_iter()
            .filter(|section| raw_value.get(section).is_none())
            .collect();
        if !missing.is_empty() {
            tracing::debug!("[CONFIG] Writing back defaults for {:?}", missing);
            config.save(path)?;
        }
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn api_configured(&self) -> bool {
        !self.api_base_url.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_gets_defaults() {
        let cfg = Config::parse(
            r#"
            api_base_url = "https://tours.example.com"

            [vector]
            api_key = "k"
            style_name = "default-dark-standard"
            style_base_url = "https://api.olamaps.io/tiles/vector/v1/styles/"
            "#,
        )
        .unwrap();

        assert!(cfg.api_configured());
        assert_eq!(cfg.poll_interval(), Duration::from_secs(60));
        assert_eq!(cfg.hosted, HostedConfig::default());
        assert_eq!(
            cfg.vector.style_url(),
            "https://api.olamaps.io/tiles/vector/v1/styles/default-dark-standard/style.json"
        );
        assert_eq!(cfg.map.camera_policy(), CameraPolicy::default());
    }

    #[test]
    fn test_empty_config_is_unconfigured() {
        let cfg = Config::parse("").unwrap();
        assert!(!cfg.api_configured());
        assert!(cfg.hosted.api_key.is_empty());
        assert!(cfg.vector.api_key.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join(format!("tourmap-config-{}", std::process::id()));
        let path = dir.join(CONFIG_FILE_NAME);
        let _ = fs::remove_file(&path);

        let created = Config::load_or_create(&path).unwrap();
        assert_eq!(created, Config::default());

        let mut changed = created.clone();
        changed.api_base_url = "http://localhost:3000".to_string();
        changed.save(&path).unwrap();
        assert_eq!(Config::load_or_create(&path).unwrap(), changed);

        let _ = fs::remove_dir_all(&dir);
    }
}
