//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Grid rendering settings (zoom, snapping, minimum block size)
//! - Calendar visibility selections
//! - Sync server endpoint and connectivity flag
//! - Subscribed external feeds
//! - Offline queue retry budget
//!
//! Configuration is stored at `~/.config/timegrid/config.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

use super::data_dir;
use crate::error::{ConfigError, Result};

/// Grid rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    #[serde(default = "default_pixels_per_minute")]
    pub pixels_per_minute: f64,
    #[serde(default = "default_min_block_height")]
    pub min_block_height: f64,
    #[serde(default = "default_snap_minutes")]
    pub snap_minutes: u32,
    /// Calendar assigned to entries created from grid gestures.
    #[serde(default)]
    pub default_calendar_id: Option<String>,
}

/// Calendar visibility configuration.
///
/// Native calendars and external feeds are toggled independently. Items with
/// no calendar association are always visible and never consulted here.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CalendarsConfig {
    /// Enabled native calendar ids.
    #[serde(default)]
    pub enabled: HashSet<String>,
    /// Enabled external feed ids.
    #[serde(default)]
    pub enabled_feeds: HashSet<String>,
}

/// One subscribed external event feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    pub id: String,
    pub url: String,
    /// Display color applied to events the feed itself leaves uncolored.
    #[serde(default)]
    pub color: Option<String>,
}

/// Sync server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Base URL of the sync server. Sync stays disabled while unset.
    #[serde(default)]
    pub server_url: Option<String>,
    /// Connectivity flag; the queue only drains while this is true.
    #[serde(default)]
    pub online: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/timegrid/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub calendars: CalendarsConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

// Default functions
fn default_pixels_per_minute() -> f64 {
    1.0
}
fn default_min_block_height() -> f64 {
    18.0
}
fn default_snap_minutes() -> u32 {
    15
}
fn default_max_retries() -> u32 {
    crate::queue::DEFAULT_MAX_RETRIES
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            pixels_per_minute: default_pixels_per_minute(),
            min_block_height: default_min_block_height(),
            snap_minutes: default_snap_minutes(),
            default_calendar_id: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            online: false,
            max_retries: default_max_retries(),
            feeds: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            view: ViewConfig::default(),
            calendars: CalendarsConfig::default(),
            sync: SyncConfig::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), String> {
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err("key is empty".to_string());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| "unknown key".to_string())?;
                let existing = obj.get(part).ok_or_else(|| "unknown key".to_string())?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| format!("cannot parse '{value}' as boolean"))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| format!("cannot parse '{value}' as number"))?
                        } else {
                            return Err(format!("cannot parse '{value}' as number"));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|err| err.to_string())?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| "unknown key".to_string())?;
        }

        Err("unknown key".to_string())
    }

    fn path() -> Result<PathBuf> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|err| {
                    ConfigError::LoadFailed {
                        path: path.clone(),
                        message: err.to_string(),
                    }
                })?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk as pretty-printed TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|err| ConfigError::SaveFailed {
            path: path.clone(),
            message: err.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|err| ConfigError::SaveFailed {
            path,
            message: err.to_string(),
        })?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key and persist. Returns an error if the key is
    /// unknown or the value cannot be parsed into the field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value).map_err(|message| {
            ConfigError::InvalidValue {
                key: key.to_string(),
                message,
            }
        })?;
        *self = serde_json::from_value(json)?;
        self.save()?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}
