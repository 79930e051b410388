// src/tree/mod.rs

//! In-memory index of matched files under one watched root, plus the
//! per-list output block accumulation used when regenerating the file.

pub mod path_tree;
pub mod pattern_group;

pub use path_tree::{GroupId, NodeType, PathTree, StructuralConflict};
pub use pattern_group::PatternGroup;
