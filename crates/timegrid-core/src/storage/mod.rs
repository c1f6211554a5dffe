mod config;
pub mod database;
pub mod token;

pub use config::{CalendarsConfig, Config, FeedConfig, SyncConfig, ViewConfig};
pub use database::{Database, Placeholder};

use std::path::PathBuf;

use crate::error::Result;

/// Returns `~/.config/timegrid[-dev]/` based on TIMEGRID_ENV.
///
/// Set TIMEGRID_ENV=dev to keep development data away from production data.
///
/// # Errors
/// Returns an error if the config directory cannot be created.
pub fn data_dir() -> Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TIMEGRID_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("timegrid-dev")
    } else {
        base_dir.join("timegrid")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
