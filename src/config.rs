use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Physical output declared by the user in place of OS enumeration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DisplayConfig {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub refresh_hz: Option<f32>,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub displays: Vec<DisplayConfig>,
    pub default_refresh_hz: f32,
    pub display_poll_ms: u64,
    pub show_fps_overlay: bool,
    pub mute_outputs: bool,
    pub video_extensions: Vec<String>,
    pub audio_extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            displays: Vec::new(),
            default_refresh_hz: 60.0,
            display_poll_ms: 2000,
            show_fps_overlay: true,
            mute_outputs: false,
            video_extensions: ["mov", "mp4", "m4v", "mkv", "avi", "webm"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            audio_extensions: ["mp3", "m4a", "aac", "wav", "flac", "ogg"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Config {
    pub fn display_poll_interval(&self) -> Duration {
        Duration::from_millis(self.display_poll_ms.max(100))
    }

    /// Extensions in both cases, for the file dialog filters.
    pub fn picker_filter(extensions: &[String]) -> Vec<String> {
        extensions
            .iter()
            .flat_map(|ext| [ext.to_lowercase(), ext.to_uppercase()])
            .collect()
    }
}

/// Get the path to the config file.
pub fn get_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CINEWALL_CONFIG") {
        return Some(PathBuf::from(path));
    }
    std::env::var("HOME")
        .ok()
        .map(|home| PathBuf::from(home).join(".cinewall").join("config.json"))
}

/// Read and parse a config file.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the config, falling back to defaults when it is missing or broken.
pub fn load() -> Config {
    let Some(path) = get_config_path() else {
        log::info!("No HOME or CINEWALL_CONFIG set, using default config");
        return Config::default();
    };

    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return Config::default();
    }

    match load_from(&path) {
        Ok(config) => {
            log::info!(
                "Loaded config from {} ({} configured displays)",
                path.display(),
                config.displays.len()
            );
            config
        }
        Err(e) => {
            log::warn!("{}; using defaults", e);
            Config::default()
        }
    }
}
