// src/config/loader.rs

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::model::ConfigFile;
use crate::config::validate::validate_config;

/// Read and deserialize a `Planrun.toml` without semantic validation.
///
/// Dangling plan references, kind conflicts and cycles pass through here
/// untouched. Use [`load_and_validate`] for a config that is safe to build a
/// registry from.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading config file at {:?}", path))?;

    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML config from {:?}", path))?;

    Ok(config)
}

/// Read a `Planrun.toml` with serde defaults applied and semantic validation
/// run: exactly one kind per task, no dangling plan or watch references, no
/// plan composition cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let config = load_from_path(&path)?;
    validate_config(&config)?;
    Ok(config)
}
