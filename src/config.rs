use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::overlay::PlacementRules;

pub const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine home directory")]
    NoHomeDirectory,

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::NoHomeDirectory => {
                "No home directory found; pass --config explicitly".to_string()
            }
            ConfigError::Read { path, .. } => {
                format!("Cannot read config file {}", path.display())
            }
            ConfigError::Parse { path, source } => {
                format!("Config file {} is not valid JSON: {}", path.display(), source)
            }
            ConfigError::Invalid { field, reason } => format!("{}: {}", field, reason),
        }
    }
}

/// Settings for the admin panel, stored as JSON.
///
/// Every field has a default so a partial file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Base URL of the admin backend.
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Below this terminal width the header collapses into the hamburger menu.
    pub mobile_breakpoint: u16,
    /// Opening one navigation overlay closes the others.
    pub exclusive_overlays: bool,
    /// Popover offsets, in terminal cells.
    pub popover: PlacementRules,
    pub reposition_on_resize: bool,
    pub online_enabled: bool,
    pub online_path: String,
    pub ticker_headlines: Vec<String>,
    pub ticker_interval_ms: u64,
    pub toast_secs: u64,
    /// Name shown on the account button.
    pub admin_name: String,
    /// `tracing` filter directive, overridden by `ADMIN_PANEL_LOG`.
    pub log_level: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_secs: 15,
            mobile_breakpoint: 80,
            exclusive_overlays: true,
            popover: PlacementRules { gap: 0, edge_margin: 1 },
            reposition_on_resize: true,
            online_enabled: true,
            online_path: "/admin/online/json".to_string(),
            ticker_headlines: Vec::new(),
            ticker_interval_ms: 150,
            toast_secs: 3,
            admin_name: "admin".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl PanelConfig {
    /// Default location: `<config dir>/admin-panel/config.json`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let dirs = directories::ProjectDirs::from("org", "admin-panel", "admin-panel")
            .ok_or(ConfigError::NoHomeDirectory)?;
        Ok(dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load from `path`, or the default location. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let config = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<PanelConfig>(&text).map_err(|source| {
                ConfigError::Parse {
                    path: path.clone(),
                    source,
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                PanelConfig::default()
            }
            Err(source) => return Err(ConfigError::Read { path, source }),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "base_url",
                reason: format!("expected an http(s) URL, got '{}'", self.base_url),
            });
        }
        if !self.online_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "online_path",
                reason: "must start with '/'".to_string(),
            });
        }
        if self.ticker_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "ticker_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_default() {
        let config = PanelConfig::default();
        assert!(config.exclusive_overlays);
        assert!(config.reposition_on_resize);
        assert_eq!(config.mobile_breakpoint, 80);
        assert_eq!(config.toast_secs, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PanelConfig::load(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config, PanelConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"base_url": "https://panel.example.org", "exclusive_overlays": false,
                "popover": {{"gap": 10, "edge_margin": 8}}}}"#
        )
        .unwrap();

        let config = PanelConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.base_url, "https://panel.example.org");
        assert!(!config.exclusive_overlays);
        assert_eq!(config.popover, PlacementRules::default());
        assert_eq!(config.online_path, "/admin/online/json");
    }

    #[test]
    fn test_bad_json_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = PanelConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.user_message().contains("not valid JSON"));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = PanelConfig {
            base_url: "ftp://nope".to_string(),
            ..PanelConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "base_url", .. }));
    }

    #[test]
    fn test_base_url_override() {
        let config = PanelConfig::default().with_base_url(Some("https://x.test".to_string()));
        assert_eq!(config.base_url, "https://x.test");
        let config = config.with_base_url(None);
        assert_eq!(config.base_url, "https://x.test");
    }
}
