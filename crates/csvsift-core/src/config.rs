//! Configuration management for csvsift.
//!
//! This module provides configuration loading, saving, and defaults.
//! Configuration is stored in TOML format in a platform-appropriate location.

use crate::error::{Result, SiftError};
use crate::scanner::{DEFAULT_ARCHIVE_EXTENSION, DEFAULT_ENTRY_EXTENSION};
use chrono::{DateTime, TimeZone};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure for csvsift.
///
/// ## Example Configuration File (csvsift.toml)
///
/// ```toml
/// [general]
/// log_level = "info"
///
/// [scan]
/// recursive = true
/// archive_extension = "zip"
/// entry_extension = "csv"
///
/// [export]
/// directory = "/home/me/exports"
/// file_name_format = "SearchResults_%Y%m%d_%H%M%S.csv"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Archive scanning settings
    pub scan: ScanConfig,

    /// Result export settings
    pub export: ExportConfig,
}

/// General configuration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
        }
    }
}

/// Scan configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Descend into subfolders when no flag says otherwise
    pub recursive: bool,

    /// Extension of the archives to open
    pub archive_extension: String,

    /// Extension of the archive entries to search
    pub entry_extension: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            recursive: false,
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
            entry_extension: DEFAULT_ENTRY_EXTENSION.to_string(),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Folder for exports without an explicit path (None = current directory)
    pub directory: Option<PathBuf>,

    /// strftime-style pattern for the default export file name
    pub file_name_format: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        ExportConfig {
            directory: None,
            file_name_format: "SearchResults_%Y%m%d_%H%M%S.csv".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default config if no config file exists.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        info!(path = %path.display(), "Loading configuration");
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents).map_err(|e| SiftError::ConfigError {
            reason: format!("Failed to parse config: {}", e),
        })?;

        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        info!(path = %path.display(), "Saving configuration");
        let contents = toml::to_string_pretty(self).map_err(|e| SiftError::ConfigError {
            reason: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "csvsift").ok_or_else(|| SiftError::ConfigError {
            reason: "Could not determine config directory".to_string(),
        })?;

        Ok(dirs.config_dir().join("csvsift.toml"))
    }

    /// Default export path for a run finished at `now`.
    pub fn export_path<Tz>(&self, now: &DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let file_name = now.format(&self.export.file_name_format).to_string();
        match &self.export.directory {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.scan.recursive);
        assert_eq!(config.scan.archive_extension, "zip");
        assert_eq!(config.scan.entry_extension, "csv");
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let mut config = Config::default();
        config.scan.recursive = true;
        config.export.directory = Some(PathBuf::from("/tmp/exports"));

        config.save_to(&config_path).unwrap();
        let loaded = Config::load_from(&config_path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "[scan]\nrecursive = true\n").unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert!(config.scan.recursive);
        assert_eq!(config.scan.entry_extension, "csv");
    }

    #[test]
    fn test_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        fs::write(&config_path, "[scan\n").unwrap();

        assert!(matches!(
            Config::load_from(&config_path),
            Err(SiftError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_export_path() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 13, 4, 59).unwrap();

        let config = Config::default();
        assert_eq!(
            config.export_path(&now),
            PathBuf::from("SearchResults_20240105_130459.csv")
        );

        let mut config = Config::default();
        config.export.directory = Some(PathBuf::from("out"));
        assert_eq!(
            config.export_path(&now),
            PathBuf::from("out").join("SearchResults_20240105_130459.csv")
        );
    }
}
