//! Application configuration
//!
//! TOML config persisted under the platform config directory so the
//! collector address and camera settings survive restarts.

use std::fs;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::capture::ResolutionPreset;
use crate::constants::{DEFAULT_PORT, DEFAULT_QUALITY};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Collector host name or IP
    pub address: String,
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Camera device identifier
    pub device: String,
    pub preset: ResolutionPreset,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "0".to_string(),
            preset: ResolutionPreset::Vga30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// JPEG quality, 1-100
    pub quality: u8,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// Directory recording sessions are created under
    pub base_dir: PathBuf,
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("recordings"),
        }
    }
}

impl AppConfig {
    /// Platform config file path, e.g. `~/.config/lan-camera-streamer/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "lan-camera-streamer")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from the default path, falling back to defaults when the file
    /// does not exist yet
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()
            .ok_or_else(|| Error::Config("no config directory available".to_string()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        fs::write(path, raw)?;
        Ok(())
    }
}
