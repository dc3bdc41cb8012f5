//! Subcommand implementations
//!
//! Each command returns the JSON value to print so it can be tested without
//! capturing stdout.

pub mod capsule;
pub mod recommend;
pub mod score;
pub mod seal;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and parse a JSON file
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}
