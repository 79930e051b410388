// src/config/validate.rs

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};

use crate::config::model::{GroupSpec, RawConfigFile, RawRootConfig, RootSpec};
use crate::errors::{CmakewatchError, Result};
use crate::watch::path_utils::extension_of;

/// Resolve a raw config into the validated root descriptors the engine
/// consumes, anchoring every relative path at `base_dir`.
pub fn resolve_roots(raw: &RawConfigFile, base_dir: &Path) -> Result<Vec<RootSpec>> {
    if raw.root.is_empty() {
        return Err(CmakewatchError::ConfigError(
            "config file does not contain any roots".to_string(),
        ));
    }

    raw.root
        .iter()
        .map(|root| resolve_root(root, base_dir))
        .collect()
}

fn resolve_root(raw: &RawRootConfig, base_dir: &Path) -> Result<RootSpec> {
    let root_path = resolve_under(base_dir, &raw.path, "watch")?;

    let groups = resolve_groups(raw)?;

    // Extension -> list map, used here only to reject overlaps and to keep
    // the generated file itself out of a watched extension's reach.
    let mut extensions: HashMap<&str, &str> = HashMap::new();
    for group in &groups {
        for ext in &group.extensions {
            if let Some(other) = extensions.insert(ext, &group.list_name) {
                return Err(CmakewatchError::ConfigError(format!(
                    "extension '{}' is used by both '{}' and '{}' within the root '{}'",
                    ext, other, group.list_name, raw.path
                )));
            }
        }
    }

    let output_path = resolve_under(base_dir, &raw.output, "output")?;

    if output_path == base_dir {
        return Err(CmakewatchError::ConfigError(format!(
            "generated file path '{}' cannot be the base directory",
            raw.output
        )));
    }

    if let Some(ext) = extension_of(&output_path) {
        if extensions.contains_key(ext.as_str()) {
            return Err(CmakewatchError::ConfigError(format!(
                "generated file path '{}' cannot use a watched extension",
                raw.output
            )));
        }
    }

    Ok(RootSpec {
        root_path,
        output_path,
        groups,
    })
}

fn resolve_groups(raw: &RawRootConfig) -> Result<Vec<GroupSpec>> {
    if raw.group.is_empty() {
        return Err(CmakewatchError::ConfigError(format!(
            "root '{}' has no pattern groups",
            raw.path
        )));
    }

    let mut names: HashSet<&str> = HashSet::new();
    let mut groups = Vec::with_capacity(raw.group.len());

    for group in &raw.group {
        if group.list_name.is_empty() {
            return Err(CmakewatchError::ConfigError(format!(
                "root '{}' contains a pattern group without a list_name",
                raw.path
            )));
        }

        if !names.insert(group.list_name.as_str()) {
            return Err(CmakewatchError::ConfigError(format!(
                "root '{}' uses the list name '{}' more than once",
                raw.path, group.list_name
            )));
        }

        if group.extensions.is_empty() {
            return Err(CmakewatchError::ConfigError(format!(
                "pattern group '{}' has no extensions",
                group.list_name
            )));
        }

        let mut extensions = Vec::with_capacity(group.extensions.len());
        for ext in &group.extensions {
            let normalized = ext.trim_start_matches('.');
            if normalized.is_empty() {
                return Err(CmakewatchError::ConfigError(format!(
                    "pattern group '{}' contains an empty extension",
                    group.list_name
                )));
            }
            extensions.push(normalized.to_string());
        }

        groups.push(GroupSpec {
            list_name: group.list_name.clone(),
            extensions,
        });
    }

    Ok(groups)
}

/// Join `relative` onto `base` and normalize it lexically, rejecting paths
/// that are absolute or climb out of the base directory.
fn resolve_under(base: &Path, relative: &str, what: &str) -> Result<PathBuf> {
    let mut resolved = base.to_path_buf();

    for component in Path::new(relative).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if resolved == base || !resolved.pop() {
                    return Err(CmakewatchError::ConfigError(format!(
                        "the {} path '{}' is not a valid relative path",
                        what, relative
                    )));
                }
            }
            Component::Normal(segment) => resolved.push(segment),
            Component::RootDir | Component::Prefix(_) => {
                return Err(CmakewatchError::ConfigError(format!(
                    "the {} path '{}' must be relative to the base directory",
                    what, relative
                )));
            }
        }
    }

    Ok(resolved)
}
