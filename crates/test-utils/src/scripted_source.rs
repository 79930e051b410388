use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use cmakewatch::watch::{EventSink, EventSource, FsEvent, Subscription};

#[derive(Default)]
struct Inner {
    sinks: Mutex<Vec<SinkSlot>>,
    fail_subscribes: AtomicUsize,
    subscribe_attempts: AtomicUsize,
}

struct SinkSlot {
    sink: EventSink,
    alive: Arc<AtomicBool>,
}

/// A scripted notification source.
///
/// Tests decide when events arrive (delivered synchronously, like a real
/// watcher callback thread would) and whether a subscription attempt fails.
#[derive(Clone, Default)]
pub struct ScriptedEventSource {
    inner: Arc<Inner>,
}

impl ScriptedEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` subscribe calls fail.
    pub fn fail_next_subscribes(&self, count: usize) {
        self.inner.fail_subscribes.store(count, Ordering::SeqCst);
    }

    /// Number of subscribe calls seen so far, failed ones included.
    pub fn subscribe_attempts(&self) -> usize {
        self.inner.subscribe_attempts.load(Ordering::SeqCst)
    }

    /// Whether any subscription is currently live (handle not yet dropped).
    pub fn has_live_subscription(&self) -> bool {
        self.inner
            .sinks
            .lock()
            .unwrap()
            .iter()
            .any(|slot| slot.alive.load(Ordering::SeqCst))
    }

    /// Deliver an event to the most recent live subscription. No-op when
    /// nothing is subscribed.
    pub fn emit(&self, event: FsEvent) {
        let sink = {
            let sinks = self.inner.sinks.lock().unwrap();
            sinks
                .iter()
                .rev()
                .find(|slot| slot.alive.load(Ordering::SeqCst))
                .map(|slot| Arc::clone(&slot.sink))
        };
        if let Some(sink) = sink {
            sink(event);
        }
    }

    /// Snapshot the sink of the `index`-th subscription (0 = first ever),
    /// live or not, for replaying events from a superseded watch.
    pub fn sink_at(&self, index: usize) -> Option<EventSink> {
        self.inner
            .sinks
            .lock()
            .unwrap()
            .get(index)
            .map(|slot| Arc::clone(&slot.sink))
    }
}

impl EventSource for ScriptedEventSource {
    fn subscribe(&self, _root: &Path, sink: EventSink) -> Result<Box<dyn Subscription>> {
        self.inner.subscribe_attempts.fetch_add(1, Ordering::SeqCst);

        let remaining = self.inner.fail_subscribes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.inner.fail_subscribes.store(remaining - 1, Ordering::SeqCst);
            bail!("injected subscribe failure");
        }

        let alive = Arc::new(AtomicBool::new(true));
        self.inner.sinks.lock().unwrap().push(SinkSlot {
            sink,
            alive: Arc::clone(&alive),
        });

        Ok(Box::new(ScriptedSubscription { alive }))
    }
}

struct ScriptedSubscription {
    alive: Arc<AtomicBool>,
}

impl Subscription for ScriptedSubscription {}

impl Drop for ScriptedSubscription {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}
