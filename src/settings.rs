use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    EXPORT_IMAGE_TIMEOUT_MS, EXPORT_SETTLE_MS, NOMINATIM_BASE, REQUEST_TIMEOUT_MS,
    THUMBNAIL_IMAGE_TIMEOUT_MS, THUMBNAIL_SETTLE_MS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Where saved maps are kept; defaults to the app data directory
    pub storage_dir: Option<String>,
    /// Where exports are written; defaults to ~/Downloads
    pub download_dir: Option<String>,
    pub mapbox_api_key: Option<String>,
    pub nominatim_url: String,
    pub request_timeout_ms: u64,
    pub export_settle_ms: u64,
    pub thumbnail_settle_ms: u64,
    pub export_image_timeout_ms: u64,
    pub thumbnail_image_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            storage_dir: None,
            download_dir: None,
            mapbox_api_key: None,
            nominatim_url: NOMINATIM_BASE.to_string(),
            request_timeout_ms: REQUEST_TIMEOUT_MS,
            export_settle_ms: EXPORT_SETTLE_MS,
            thumbnail_settle_ms: THUMBNAIL_SETTLE_MS,
            export_image_timeout_ms: EXPORT_IMAGE_TIMEOUT_MS,
            thumbnail_image_timeout_ms: THUMBNAIL_IMAGE_TIMEOUT_MS,
        }
    }
}

impl Settings {
    /// Reads the INI file (if any) and applies the `MAPBOX_API_KEY` override
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&Self::config_path())?;
        if let Ok(key) = std::env::var("MAPBOX_API_KEY") {
            if !key.trim().is_empty() {
                settings.mapbox_api_key = Some(key);
            }
        }
        Ok(settings)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        Ok(Self::parse(&content))
    }

    /// Parses `key = value` lines; unknown keys and bad values are ignored
    pub fn parse(content: &str) -> Self {
        let mut settings = Settings::default();
        let mut config_map = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                config_map.insert(key.trim().to_string(), value.trim().trim_matches('"').to_string());
            }
        }

        let text = |key: &str| config_map.get(key).filter(|v| !v.is_empty()).cloned();
        let number = |key: &str| config_map.get(key).and_then(|v| v.parse::<u64>().ok());

        settings.storage_dir = text("storage_dir");
        settings.download_dir = text("download_dir");
        settings.mapbox_api_key = text("mapbox_api_key");
        if let Some(url) = text("nominatim_url") {
            settings.nominatim_url = url;
        }
        if let Some(ms) = number("request_timeout_ms") {
            settings.request_timeout_ms = ms;
        }
        if let Some(ms) = number("export_settle_ms") {
            settings.export_settle_ms = ms;
        }
        if let Some(ms) = number("thumbnail_settle_ms") {
            settings.thumbnail_settle_ms = ms;
        }
        if let Some(ms) = number("export_image_timeout_ms") {
            settings.export_image_timeout_ms = ms;
        }
        if let Some(ms) = number("thumbnail_image_timeout_ms") {
            settings.thumbnail_image_timeout_ms = ms;
        }

        settings
    }

    pub fn to_ini(&self) -> String {
        let mut content = String::new();
        content.push_str("# MapFlam Configuration File\n");

        if let Some(ref dir) = self.storage_dir {
            content.push_str(&format!("storage_dir = \"{}\"\n", dir));
        }
        if let Some(ref dir) = self.download_dir {
            content.push_str(&format!("download_dir = \"{}\"\n", dir));
        }
        if let Some(ref key) = self.mapbox_api_key {
            content.push_str(&format!("mapbox_api_key = \"{}\"\n", key));
        }
        content.push_str(&format!("nominatim_url = \"{}\"\n", self.nominatim_url));
        content.push_str(&format!("request_timeout_ms = {}\n", self.request_timeout_ms));
        content.push_str(&format!("export_settle_ms = {}\n", self.export_settle_ms));
        content.push_str(&format!("thumbnail_settle_ms = {}\n", self.thumbnail_settle_ms));
        content.push_str(&format!("export_image_timeout_ms = {}\n", self.export_image_timeout_ms));
        content.push_str(&format!("thumbnail_image_timeout_ms = {}\n", self.thumbnail_image_timeout_ms));
        content
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Creating config directory")?;
        }
        std::fs::write(&config_path, self.to_ini()).context("Failed to write to config file")?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        crate::utils::get_config_path()
    }

    pub fn storage_path(&self) -> PathBuf {
        self.storage_dir
            .as_deref()
            .map(crate::utils::expand_home)
            .unwrap_or_else(crate::utils::get_app_data_dir)
    }

    pub fn download_path(&self) -> PathBuf {
        self.download_dir
            .as_deref()
            .map(crate::utils::expand_home)
            .unwrap_or_else(crate::utils::get_download_dir)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn export_timing(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.export_settle_ms),
            Duration::from_millis(self.export_image_timeout_ms),
        )
    }

    pub fn thumbnail_timing(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.thumbnail_settle_ms),
            Duration::from_millis(self.thumbnail_image_timeout_ms),
        )
    }
}
