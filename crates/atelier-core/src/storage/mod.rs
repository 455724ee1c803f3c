mod config;
pub mod db;
pub mod migrations;

pub use config::{CalendarConfig, Config, WorkConfig};
pub use db::{DraftChunkRow, StudioDb};

use std::path::PathBuf;

/// Returns `~/.config/atelier[-dev]/` based on ATELIER_ENV.
///
/// Set ATELIER_ENV=dev to use a development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("ATELIER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("atelier-dev")
    } else {
        base_dir.join("atelier")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
