pub mod analyze;
pub mod classify;
pub mod config;
pub mod import;
pub mod reconcile;
pub mod tiles;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use skyledger_core::config::IngestConfig;

/// clap value parser for `YYYY-MM-DD` arguments.
pub fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("'{s}' is not YYYY-MM-DD: {e}"))
}

/// Read a TOML config file, or fall back to defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<IngestConfig> {
    let Some(path) = path else {
        return Ok(IngestConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&contents).context("Invalid ingest config")
}
