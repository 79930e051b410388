// src/config/mod.rs

//! Configuration loading and validation for cmakewatch.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Resolve and validate each configured root into the `RootSpec`
//!   descriptor the engine trusts (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{GroupSpec, RawConfigFile, RawGroupConfig, RawRootConfig, RootSpec};
pub use validate::resolve_roots;
