//! CLI commands for the allocation engine.

pub mod polynomial;
pub mod show_config;
pub mod solve;

pub use polynomial::{run_polynomial, PolynomialArgs};
pub use show_config::{run_show_config, ShowConfigArgs};
pub use solve::{run_solve, SolveArgs};

use std::path::Path;

use anyhow::{Context, Result};
use risk_alloc_core::{AppConfig, ConfigLoader, OptimizationRequest};

/// Reads and validates a JSON request file.
///
/// # Errors
/// Returns an error if the file cannot be read or fails validation.
pub fn read_request(path: &Path) -> Result<OptimizationRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read request file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid optimization request in {}", path.display()))
}

/// Loads configuration from `path`, or the default location when absent.
///
/// # Errors
/// Returns an error if the configuration cannot be parsed.
pub fn load_config(path: Option<&str>, profile: Option<&str>) -> Result<AppConfig> {
    match (path, profile) {
        (Some(path), profile) => ConfigLoader::load_from(path, profile),
        (None, Some(profile)) => ConfigLoader::load_with_profile(profile),
        (None, None) => ConfigLoader::load(),
    }
}

/// Serializes `value` as JSON, indented when `pretty` is set.
///
/// # Errors
/// Returns an error if serialization fails.
pub fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}
