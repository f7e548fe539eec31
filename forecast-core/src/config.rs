use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::client::Coordinate;

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// secret_key = "..."
/// base_url = "https://api.darksky.net"
///
/// [default_location]
/// latitude = 37.8267
/// longitude = -122.4233
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Credential embedded in every forecast request path.
    pub secret_key: Option<String>,

    /// Optional override of the provider host.
    pub base_url: Option<String>,

    /// Location used when `forecast show` is run without coordinates.
    pub default_location: Option<Coordinate>,
}

impl Config {
    /// Returns the secret key, if one is set and non-blank.
    pub fn secret_key(&self) -> Option<&str> {
        self.secret_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn set_secret_key(&mut self, key: impl Into<String>) {
        self.secret_key = Some(key.into());
    }

    pub fn is_configured(&self) -> bool {
        self.secret_key().is_some()
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "forecast", "forecast-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("forecast-core-test-{}-{name}", std::process::id()))
            .join("config.toml")
    }

    #[test]
    fn secret_key_is_none_when_not_set() {
        let cfg = Config::default();

        assert_eq!(cfg.secret_key(), None);
        assert!(!cfg.is_configured());
    }

    #[test]
    fn blank_secret_key_counts_as_unset() {
        let mut cfg = Config::default();
        cfg.set_secret_key("   ");

        assert_eq!(cfg.secret_key(), None);
        assert!(!cfg.is_configured());
    }

    #[test]
    fn set_secret_key_trims_on_read() {
        let mut cfg = Config::default();
        cfg.set_secret_key(" SECRET\n");

        assert_eq!(cfg.secret_key(), Some("SECRET"));
        assert!(cfg.is_configured());
    }

    #[test]
    fn load_missing_file_returns_default() {
        let cfg = Config::load_from(&temp_path("missing")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn save_then_load_keeps_every_field() {
        let path = temp_path("save");
        let mut cfg = Config::default();
        cfg.set_secret_key("SECRET");
        cfg.base_url = Some("https://mirror.example.com".into());
        cfg.default_location = Some(Coordinate::new(37.8267, -122.4233));

        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded, cfg);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn parse_error_names_the_file() {
        let path = temp_path("broken");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "secret_key = [").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
