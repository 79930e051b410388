// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{RawConfigFile, RootSpec};
use crate::config::validate::resolve_roots;
use crate::errors::{CmakewatchError, Result};

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (path containment, extension uniqueness, etc.). Use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file and resolve it into validated root descriptors.
///
/// This is the recommended entry point for the rest of the application:
///
/// - Reads TOML.
/// - Resolves the relative watch/output paths against `base_dir`.
/// - Checks for:
///   - at least one root, at least one group per root,
///   - extension and list-name uniqueness within a root,
///   - the output file staying inside the base directory and outside any
///     watched extension's reach.
pub fn load_and_validate(path: impl AsRef<Path>, base_dir: &Path) -> Result<Vec<RootSpec>> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CmakewatchError::ConfigError(format!(
            "config file {:?} does not exist in {:?}",
            path, base_dir
        )));
    }

    let raw = load_from_path(path)?;
    resolve_roots(&raw, base_dir)
}

/// Helper to resolve a default config path.
///
/// Currently this just returns `Cmakewatch.toml` in the current working
/// directory, but this function exists so you can later:
///
/// - Respect an env var (e.g. `CMAKEWATCH_CONFIG`).
/// - Look for multiple default locations.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Cmakewatch.toml")
}
