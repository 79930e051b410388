// src/watch/notify_source.rs

use std::path::Path;

use anyhow::Result;
use notify::event::{Event, EventKind, ModifyKind, RenameMode};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::debug;

use crate::watch::{EventSink, EventSource, FsEvent, Subscription};

/// [`EventSource`] backed by the platform watcher from `notify`.
#[derive(Debug, Default)]
pub struct NotifyEventSource;

/// Handle for one live watch.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle stops file watching.
pub struct NotifyHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for NotifyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyHandle").finish()
    }
}

impl Subscription for NotifyHandle {}

impl EventSource for NotifyEventSource {
    fn subscribe(&self, root: &Path, sink: EventSink) -> Result<Box<dyn Subscription>> {
        // Closure called synchronously by notify whenever an event arrives.
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => forward(event, &sink),
                Err(err) => sink(FsEvent::Error(err.to_string())),
            },
            Config::default(),
        )?;

        watcher.watch(root, RecursiveMode::Recursive)?;

        debug!("file watch started on {:?}", root);

        Ok(Box::new(NotifyHandle { _inner: watcher }))
    }
}

/// Classify a raw notify event into the `FsEvent`s the engine consumes.
///
/// Only name-level changes matter for the generated file list, so content
/// and access modifications are dropped here.
fn forward(event: Event, sink: &EventSink) {
    match event.kind {
        EventKind::Create(_) => {
            for path in event.paths {
                sink(FsEvent::Created(path));
            }
        }
        EventKind::Remove(_) => {
            for path in event.paths {
                sink(FsEvent::Deleted(path));
            }
        }
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::Both if event.paths.len() == 2 => {
                let mut paths = event.paths.into_iter();
                let old = paths.next().expect("rename event carries two paths");
                let new = paths.next().expect("rename event carries two paths");
                sink(FsEvent::Renamed { old, new });
            }
            RenameMode::From => {
                for path in event.paths {
                    sink(FsEvent::Deleted(path));
                }
            }
            RenameMode::To => {
                for path in event.paths {
                    sink(FsEvent::Created(path));
                }
            }
            // Backends that can't pair rename halves report `Any`; probe the
            // path to decide which half this was.
            _ => {
                for path in event.paths {
                    if path.exists() {
                        sink(FsEvent::Created(path));
                    } else {
                        sink(FsEvent::Deleted(path));
                    }
                }
            }
        },
        // Content and metadata changes never alter the file list.
        EventKind::Modify(_) | EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
    }
}
