// src/engine/mod.rs

//! Per-root watch engine.
//!
//! One [`RootController`] per configured root. Each controller drives a
//! scan -> watch -> recover state machine:
//! - subscribe to the notification source, then fully scan the root,
//! - apply change events to the path tree, regenerating the output file
//!   whenever the tree actually changed,
//! - on any failure, tear the subscription down and rebuild everything from
//!   a fresh scan after a fixed delay.
//!
//! Controllers run as independent tasks and share nothing but the
//! process-wide cancellation token. All per-root mutation is serialized
//! through one exclusive section.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::tree::StructuralConflict;

pub mod controller;

pub use controller::RootController;

/// How long a root waits after a failure before rebuilding from a fresh
/// scan. A terminated watch may have silently dropped events, so recovery
/// always re-enumerates instead of patching the tree.
pub const RECOVERY_DELAY: Duration = Duration::from_secs(2);

/// A failure raised inside a root's exclusive section.
///
/// Failures never terminate the process; they route the root into its
/// fixed-delay recovery, independently of every other root.
#[derive(Debug, Error)]
pub enum RootFailure {
    #[error(transparent)]
    Conflict(#[from] StructuralConflict),

    #[error("watch error: {0}")]
    Watch(String),

    #[error("scan failed: {0}")]
    Scan(String),

    #[error("failed to write generated file {path:?}: {message}")]
    OutputWrite { path: PathBuf, message: String },
}
