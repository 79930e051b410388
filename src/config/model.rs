// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [[root]]
/// path = "src"
/// output = "src/files.cmake"
///
/// [[root.group]]
/// list_name = "SOURCES"
/// extensions = ["cpp", "c"]
///
/// [[root.group]]
/// list_name = "HEADERS"
/// extensions = ["h", "hpp"]
/// ```
///
/// Every `[[root]]` is watched and regenerated independently of the others.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// All watched roots from `[[root]]`.
    #[serde(default)]
    pub root: Vec<RawRootConfig>,
}

/// One `[[root]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRootConfig {
    /// Directory to watch, relative to the base directory.
    pub path: String,

    /// Generated file to keep in sync, relative to the base directory.
    pub output: String,

    /// Pattern groups from `[[root.group]]`, in output order.
    #[serde(default)]
    pub group: Vec<RawGroupConfig>,
}

/// One `[[root.group]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGroupConfig {
    /// Name of the CMake list this group appends to.
    pub list_name: String,

    /// File extensions collected into this list, with or without a leading
    /// dot (`"cpp"` and `".cpp"` are equivalent).
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// A fully validated root descriptor.
///
/// The engine trusts its invariants and does not re-validate them: both
/// paths are absolute and inside the base directory, extensions are
/// normalized (no leading dot) and unique across the root's groups, and the
/// output file's extension is not watched.
#[derive(Debug, Clone)]
pub struct RootSpec {
    pub root_path: PathBuf,
    pub output_path: PathBuf,
    /// Pattern groups in configured output order.
    pub groups: Vec<GroupSpec>,
}

/// A named bucket of tracked file extensions sharing one output block.
#[derive(Debug, Clone)]
pub struct GroupSpec {
    pub list_name: String,
    pub extensions: Vec<String>,
}
