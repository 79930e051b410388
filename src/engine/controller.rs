// src/engine/controller.rs

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::RootSpec;
use crate::engine::{RootFailure, RECOVERY_DELAY};
use crate::fs::FileSystem;
use crate::tree::{GroupId, NodeType, PathTree, PatternGroup};
use crate::watch::path_utils::{extension_of, relative_segments};
use crate::watch::{EventSink, EventSource, FsEvent, Subscription};

/// Mutable per-root state, guarded by the exclusive section.
///
/// `epoch` identifies the currently active subscription; events tagged with
/// an older epoch are discarded instead of applied.
struct RootState {
    tree: PathTree,
    groups: Vec<PatternGroup>,
    epoch: u64,
}

/// The per-root control loop.
///
/// Owns the path tree and pattern groups for one configured root and keeps
/// the root's generated file in sync with the filesystem. The scan, every
/// event handler, and teardown all run inside the same mutex, so a rescan
/// can never interleave with live events.
pub struct RootController {
    spec: RootSpec,
    /// Extension (without dot) -> owning group. Never mutated after
    /// construction.
    extensions: HashMap<String, GroupId>,
    fs: Arc<dyn FileSystem>,
    state: Mutex<RootState>,
    fail_tx: mpsc::Sender<RootFailure>,
}

impl RootController {
    /// Run the watch loop for one root until `cancel` fires.
    ///
    /// All failures are contained: the loop reports them and recovers with a
    /// full rescan after [`RECOVERY_DELAY`].
    pub async fn run(
        spec: RootSpec,
        fs: Arc<dyn FileSystem>,
        source: Arc<dyn EventSource>,
        cancel: CancellationToken,
    ) {
        let (fail_tx, fail_rx) = mpsc::channel(1);
        let controller = Arc::new(Self::new(spec, fs, fail_tx));
        controller.run_loop(source, fail_rx, cancel).await;
    }

    /// Scan the root once and write the generated file, without watching.
    pub fn run_once(spec: RootSpec, fs: Arc<dyn FileSystem>) -> Result<(), RootFailure> {
        let (fail_tx, _fail_rx) = mpsc::channel(1);
        let controller = Self::new(spec, fs, fail_tx);
        let mut state = controller.lock_state();
        controller.rescan_and_write(&mut state)
    }

    fn new(spec: RootSpec, fs: Arc<dyn FileSystem>, fail_tx: mpsc::Sender<RootFailure>) -> Self {
        let mut groups = Vec::with_capacity(spec.groups.len());
        let mut extensions = HashMap::new();
        for (index, group) in spec.groups.iter().enumerate() {
            groups.push(PatternGroup::new(&group.list_name));
            for ext in &group.extensions {
                extensions.insert(ext.clone(), GroupId(index));
            }
        }

        Self {
            spec,
            extensions,
            fs,
            state: Mutex::new(RootState {
                tree: PathTree::new(),
                groups,
                epoch: 0,
            }),
            fail_tx,
        }
    }

    async fn run_loop(
        self: Arc<Self>,
        source: Arc<dyn EventSource>,
        mut fail_rx: mpsc::Receiver<RootFailure>,
        cancel: CancellationToken,
    ) {
        info!(root = ?self.spec.root_path, "watch loop started");

        let mut subscription: Option<Box<dyn Subscription>>;

        loop {
            subscription = Self::scan_and_arm(&self, source.as_ref());

            // The only suspension points of the loop: a pending failure, or
            // cancellation.
            let failure = tokio::select! {
                _ = cancel.cancelled() => break,
                failure = fail_rx.recv() => match failure {
                    Some(failure) => failure,
                    None => break,
                },
            };

            // The subscription was already superseded when the failure was
            // queued; dispose the handle before recovering.
            drop(subscription.take());

            error!(
                root = ?self.spec.root_path,
                "{}; trying to recover in {} seconds",
                failure,
                RECOVERY_DELAY.as_secs()
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(RECOVERY_DELAY) => {}
            }
        }

        self.teardown(subscription);
        info!(root = ?self.spec.root_path, "watch loop stopped");
    }

    /// Subscribe, rescan, and write the output, all inside the exclusive
    /// section. On failure the failure is queued for the loop and no
    /// subscription is kept.
    fn scan_and_arm(this: &Arc<Self>, source: &dyn EventSource) -> Option<Box<dyn Subscription>> {
        let mut state = this.lock_state();
        state.epoch += 1;
        let epoch = state.epoch;

        let mut subscription = None;
        match Self::try_scan(this, &mut state, epoch, source, &mut subscription) {
            Ok(()) => subscription,
            Err(failure) => {
                this.queue_failure(&mut state, failure);
                drop(state);
                // The epoch bump above already made the subscription stale;
                // dispose the handle outside the exclusive section.
                drop(subscription);
                None
            }
        }
    }

    fn try_scan(
        this: &Arc<Self>,
        state: &mut RootState,
        epoch: u64,
        source: &dyn EventSource,
        subscription: &mut Option<Box<dyn Subscription>>,
    ) -> Result<(), RootFailure> {
        if !this.fs.is_dir(&this.spec.root_path) {
            return Err(RootFailure::Scan(format!(
                "path to watch {:?} is not a directory",
                this.spec.root_path
            )));
        }

        // Subscribe before scanning so nothing that changes during the scan
        // window is missed; events queue up against the exclusive section we
        // are holding.
        let sink = Self::sink_for(this, epoch);
        *subscription = Some(
            source
                .subscribe(&this.spec.root_path, sink)
                .map_err(|err| RootFailure::Watch(err.to_string()))?,
        );

        this.rescan_and_write(state)?;

        debug!(root = ?this.spec.root_path, "initial scan complete");
        Ok(())
    }

    /// Rebuild the tree from a full filesystem walk and persist the result.
    fn rescan_and_write(&self, state: &mut RootState) -> Result<(), RootFailure> {
        if !self.fs.is_dir(&self.spec.root_path) {
            return Err(RootFailure::Scan(format!(
                "path to watch {:?} is not a directory",
                self.spec.root_path
            )));
        }

        state.tree = PathTree::new();
        self.scan_directory(state, &self.spec.root_path)?;
        self.write_output(state, true)
    }

    fn scan_directory(&self, state: &mut RootState, dir: &Path) -> Result<(), RootFailure> {
        let entries = self
            .fs
            .read_dir(dir)
            .map_err(|err| RootFailure::Scan(err.to_string()))?;

        for entry in &entries {
            if self.fs.is_file(entry) {
                self.check_add_file(state, entry)?;
            }
        }

        for entry in &entries {
            if self.fs.is_dir(entry) {
                self.scan_directory(state, entry)?;
            }
        }

        Ok(())
    }

    /// Event sink for one subscription epoch. Events are handled
    /// synchronously on the source's delivery thread, inside the exclusive
    /// section.
    fn sink_for(this: &Arc<Self>, epoch: u64) -> EventSink {
        let controller = Arc::clone(this);
        Arc::new(move |event| controller.handle_event(epoch, event))
    }

    fn handle_event(&self, epoch: u64, event: FsEvent) {
        let mut state = self.lock_state();

        if state.epoch != epoch {
            debug!(
                root = ?self.spec.root_path,
                ?event,
                "discarding event from a superseded subscription"
            );
            return;
        }

        if let Err(failure) = self.apply_event(&mut state, event) {
            self.queue_failure(&mut state, failure);
        }
    }

    fn apply_event(&self, state: &mut RootState, event: FsEvent) -> Result<(), RootFailure> {
        match event {
            FsEvent::Created(path) => {
                self.check_add_file(state, &path)?;
            }
            FsEvent::Deleted(path) => {
                let rel = self.relative(&path)?;
                state.tree.remove_path(&rel);
            }
            FsEvent::Renamed { old, new } => {
                let old_rel = self.relative(&old)?;
                let new_rel = self.relative(&new)?;
                let new_tracked = self.tracked_group(&new).is_some();

                match state.tree.node_type(&old_rel) {
                    // A tracked file whose new name is no longer tracked: drop it.
                    NodeType::File if !new_tracked => state.tree.remove_path(&old_rel),
                    // Was never in the tree but the new name is tracked: try to add it.
                    NodeType::Absent if new_tracked => self.check_add_file(state, &new)?,
                    // A directory, or a tracked file staying tracked: move the node.
                    NodeType::Directory | NodeType::File => {
                        state.tree.rename_path(&old_rel, &new_rel)?
                    }
                    // Untracked on both ends.
                    NodeType::Absent => {}
                }
            }
            FsEvent::Error(cause) => return Err(RootFailure::Watch(cause)),
        }

        self.write_output(state, false)
    }

    /// Add `path` to the tree if it is a regular file with a tracked
    /// extension. A directory named like a tracked file, or a path that
    /// vanished before we probed it, is ignored.
    fn check_add_file(&self, state: &mut RootState, path: &Path) -> Result<(), RootFailure> {
        let Some(group) = self.tracked_group(path) else {
            return Ok(());
        };

        if !self.fs.is_file(path) {
            return Ok(());
        }

        let rel = self.relative(path)?;
        state.tree.add_file(&rel, group)?;
        Ok(())
    }

    /// Regenerate and persist the output file.
    ///
    /// Outside the initial pass this is a no-op unless the tree changed. On
    /// the initial pass the write is skipped when the file already holds
    /// exactly the generated bytes, so an unchanged startup doesn't disturb
    /// downstream timestamps; a failed read counts as "no existing content".
    fn write_output(&self, state: &mut RootState, initial: bool) -> Result<(), RootFailure> {
        if !initial && !state.tree.changed() {
            return Ok(());
        }

        let RootState { tree, groups, .. } = state;
        let content = tree.generate(groups);

        if initial {
            if let Ok(existing) = self.fs.read_to_string(&self.spec.output_path) {
                if existing == content {
                    debug!(
                        output = ?self.spec.output_path,
                        "existing output is up to date; skipping write"
                    );
                    return Ok(());
                }
            }
        }

        self.fs
            .write(&self.spec.output_path, content.as_bytes())
            .map_err(|err| RootFailure::OutputWrite {
                path: self.spec.output_path.clone(),
                message: err.to_string(),
            })?;

        debug!(output = ?self.spec.output_path, "output file written");
        Ok(())
    }

    /// Record a failure for the root loop to consume.
    ///
    /// The epoch bump makes the active subscription stale immediately. At
    /// most one failure is retained per root; later ones arriving before the
    /// loop consumed the first are reported and dropped, never queued.
    fn queue_failure(&self, state: &mut RootState, failure: RootFailure) {
        state.epoch += 1;

        match self.fail_tx.try_send(failure) {
            Ok(()) => {}
            Err(TrySendError::Full(failure)) => {
                warn!(
                    root = ?self.spec.root_path,
                    "discarding additional failure: {}",
                    failure
                );
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    fn teardown(&self, subscription: Option<Box<dyn Subscription>>) {
        {
            let mut state = self.lock_state();
            // No event delivered after this point is applied.
            state.epoch += 1;
        }
        drop(subscription);
    }

    fn tracked_group(&self, path: &Path) -> Option<GroupId> {
        let ext = extension_of(path)?;
        self.extensions.get(ext.as_str()).copied()
    }

    fn relative(&self, path: &Path) -> Result<Vec<String>, RootFailure> {
        relative_segments(&self.spec.root_path, path).ok_or_else(|| {
            RootFailure::Watch(format!(
                "event path {:?} is not under the watched root {:?}",
                path, self.spec.root_path
            ))
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, RootState> {
        // A poisoned lock only means an earlier handler panicked; the next
        // recovery rebuilds the whole state from scratch anyway.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
