//! Replay settings

use std::path::{Path, PathBuf};

use aura_live::{LiveError, SessionConfig};
use serde::{Deserialize, Serialize};

/// Replay tool settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Live session tunables
    pub session: SessionConfig,
    /// Filter applied when none is given on the command line
    pub default_filter: String,
    /// Maximum filtered rows printed
    pub row_limit: usize,
    /// Print a hex dump with the selected packet's detail
    pub show_hex: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            default_filter: String::new(),
            row_limit: 50,
            show_hex: true,
        }
    }
}

impl Settings {
    /// Get the XDG config directory for auracap
    /// Uses $XDG_CONFIG_HOME/auracap, falls back to ~/.config/auracap
    fn config_dir() -> Option<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_config);
            if path.is_absolute() {
                return Some(path.join("auracap"));
            }
        }

        dirs::home_dir().map(|h| h.join(".config").join("auracap"))
    }

    /// Get the default settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.json"))
    }

    /// Load settings from the default path, falling back to defaults
    pub fn load() -> Self {
        Self::settings_path()
            .and_then(|path| Self::load_from(&path).ok())
            .unwrap_or_default()
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self, LiveError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save settings to the default path
    pub fn save(&self) -> Result<PathBuf, LiveError> {
        let path = Self::settings_path().ok_or_else(|| {
            LiveError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine settings path",
            ))
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Save settings to a specific file, creating its directory
    pub fn save_to(&self, path: &Path) -> Result<(), LiveError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("auracap-settings-{}-{}", std::process::id(), name))
            .join("settings.json")
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch_file("roundtrip");
        let mut settings = Settings::default();
        settings.row_limit = 7;
        settings.session.buffer_capacity = 1_000;

        settings.save_to(&path).unwrap();
        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded, settings);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"row_limit": 3, "session": {"filter_debounce_ms": 50}}"#)
                .unwrap();

        assert_eq!(settings.row_limit, 3);
        assert!(settings.show_hex);
        assert_eq!(settings.session.filter_debounce_ms, 50);
        assert_eq!(settings.session.buffer_capacity, 50_000);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = scratch_file("missing");
        assert!(matches!(Settings::load_from(&path), Err(LiveError::Io(_))));
    }

    #[test]
    fn test_malformed_file_is_json_error() {
        let path = scratch_file("malformed");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(Settings::load_from(&path), Err(LiveError::Json(_))));

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
