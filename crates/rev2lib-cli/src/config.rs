//! Configuration file support for rev2lib
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/rev2lib/config.toml`
//! - macOS: `~/Library/Application Support/rev2lib/config.toml`
//! - Windows: `%APPDATA%\rev2lib\config.toml`

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use rev2lib_core::MidiChannel;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = r#"# rev2lib configuration file

[device]
# MIDI channel the Rev2 listens on (1-16)
channel = 1

[output]
# Print reports as JSON instead of text
json = false
"#;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device configuration
    pub device: DeviceSettings,
    /// Report output configuration
    pub output: OutputSettings,
}

impl Config {
    /// Load configuration from the default config file location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Load configuration or return default if not found
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Using default configuration: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "rev2lib")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or_else(|| anyhow!("Could not determine config directory"))
    }

    /// Create the config file at `path`.
    ///
    /// With no command line overrides this is the commented default file,
    /// otherwise the defaults with the overrides applied.
    pub fn create_config_file(path: &Path, channel: Option<u8>, json: bool) -> Result<()> {
        if channel.is_none() && !json {
            return write_default_config(path);
        }
        let mut config = Self::default();
        if let Some(channel) = channel {
            config.device.channel = channel;
        }
        config.output.json = json;
        config.device.midi_channel()?;
        config.save_to(path)
    }
}

/// Write the commented default configuration to `path`.
pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write config file {}", path.display()))
}

/// Device settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// MIDI channel (1-16)
    pub channel: u8,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self { channel: 1 }
    }
}

impl DeviceSettings {
    pub fn midi_channel(&self) -> Result<MidiChannel> {
        MidiChannel::from_one_based(self.channel)
            .ok_or_else(|| anyhow!("MIDI channel must be 1-16, got {}", self.channel))
    }
}

/// Report output settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Print reports as JSON
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.device.channel, 1);
        assert!(!config.output.json);
        assert_eq!(config.device.midi_channel().unwrap().zero_based(), 0);
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = Config::default();
        config.device.channel = 9;
        config.output.json = true;
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_default_file_matches_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        write_default_config(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[output]\njson = true\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert!(config.output.json);
        assert_eq!(config.device.channel, 1);
    }

    #[test]
    fn test_create_config_file_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.toml");
        Config::create_config_file(&plain, None, false).unwrap();
        assert!(fs::read_to_string(&plain).unwrap().starts_with("# rev2lib"));

        let path = dir.path().join("config.toml");
        Config::create_config_file(&path, Some(4), true).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.device.channel, 4);
        assert!(loaded.output.json);

        let bad = dir.path().join("bad.toml");
        assert!(Config::create_config_file(&bad, Some(0), false).is_err());
        assert!(!bad.exists());
    }

    #[test]
    fn test_save_and_invalid_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.device.channel = 17;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.device.channel, 17);
        assert!(loaded.device.midi_channel().is_err());
    }
}
