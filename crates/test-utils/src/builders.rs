#![allow(dead_code)]

use std::path::PathBuf;

use cmakewatch::config::{GroupSpec, RootSpec};

/// Builder for validated `RootSpec` descriptors, bypassing config parsing.
///
/// Paths are taken as given (tests usually use absolute mock-filesystem
/// paths like `/project/src`); extensions are stored without a leading dot,
/// the way the validation layer normalizes them.
pub struct RootSpecBuilder {
    root_path: PathBuf,
    output_path: PathBuf,
    groups: Vec<GroupSpec>,
}

impl RootSpecBuilder {
    pub fn new(root_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            root_path: root_path.into(),
            output_path: output_path.into(),
            groups: Vec::new(),
        }
    }

    pub fn group(mut self, list_name: &str, extensions: &[&str]) -> Self {
        self.groups.push(GroupSpec {
            list_name: list_name.to_string(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
        });
        self
    }

    pub fn build(self) -> RootSpec {
        RootSpec {
            root_path: self.root_path,
            output_path: self.output_path,
            groups: self.groups,
        }
    }
}
