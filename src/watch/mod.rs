// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - Defining the notification-source contract the engine consumes
//!   ([`EventSource`] / [`Subscription`] / [`FsEvent`]).
//! - Wiring up a cross-platform filesystem watcher (`notify`) behind that
//!   contract.
//!
//! It does **not** know about pattern groups or output files; it only turns
//! raw filesystem changes into [`FsEvent`]s for a subscribed root.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

pub mod notify_source;
pub mod path_utils;

pub use notify_source::NotifyEventSource;

/// A change reported for a watched directory tree.
#[derive(Debug, Clone)]
pub enum FsEvent {
    Created(PathBuf),
    Deleted(PathBuf),
    Renamed { old: PathBuf, new: PathBuf },
    /// The notification source itself failed; the subscription can no longer
    /// be trusted.
    Error(String),
}

/// Callback receiving events for one subscription. Called synchronously from
/// the source's delivery thread.
pub type EventSink = Arc<dyn Fn(FsEvent) + Send + Sync>;

/// A live recursive watch on one root directory.
///
/// Dropping the handle disposes the subscription; no further events are
/// delivered to its sink afterwards (events already in flight may still
/// arrive and are the consumer's job to discard).
pub trait Subscription: Send {}

/// Source of recursive filesystem change notifications.
pub trait EventSource: Send + Sync {
    /// Subscribe to changes under `root`, recursively, delivering events to
    /// `sink` until the returned handle is dropped.
    fn subscribe(&self, root: &Path, sink: EventSink) -> Result<Box<dyn Subscription>>;
}
