//! Recovery and cancellation behaviour of the per-root controller: failures
//! route into a fixed-delay full rescan, never into process death.

mod common;

use std::path::Path;
use std::time::Duration;

use cmakewatch::fs::FileSystem;
use cmakewatch::watch::FsEvent;
use cmakewatch_test_utils::scripted_source::ScriptedEventSource;

use crate::common::{init_tracing, scenario_fs, spawn_controller, OUTPUT, SCENARIO_OUTPUT};

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn failed_subscription_schedules_exactly_one_retry() {
    init_tracing();
    let source = ScriptedEventSource::new();
    source.fail_next_subscribes(1);

    let h = spawn_controller(scenario_fs(), source);
    settle().await;

    // First attempt failed before the scan could write anything.
    assert_eq!(h.source.subscribe_attempts(), 1);
    assert!(!h.fs.exists(Path::new(OUTPUT)));

    // Still waiting out the fixed 2-second delay: no second attempt yet.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(h.source.subscribe_attempts(), 1);

    // After the delay the root rebuilds from a full rescan.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.source.subscribe_attempts(), 2);
    assert_eq!(
        h.fs.read_to_string(Path::new(OUTPUT)).unwrap(),
        SCENARIO_OUTPUT
    );

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn two_failures_in_a_row_schedule_only_one_recovery() {
    init_tracing();
    let h = spawn_controller(scenario_fs(), ScriptedEventSource::new());
    settle().await;
    assert_eq!(h.source.subscribe_attempts(), 1);

    // Two failures back to back, before the recovery delay can elapse. Only
    // the first is surfaced; the second is discarded.
    h.source.emit(FsEvent::Error("first failure".into()));
    h.source.emit(FsEvent::Error("second failure".into()));

    tokio::time::sleep(Duration::from_secs(3)).await;

    // Exactly one rescan happened, and the root is healthy again.
    assert_eq!(h.source.subscribe_attempts(), 2);
    assert!(h.source.has_live_subscription());
    assert_eq!(
        h.fs.read_to_string(Path::new(OUTPUT)).unwrap(),
        SCENARIO_OUTPUT
    );

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn structural_conflict_during_event_handling_triggers_a_rescan() {
    init_tracing();
    let h = spawn_controller(scenario_fs(), ScriptedEventSource::new());
    settle().await;

    // A file nested below an already-tracked file contradicts the tree
    // invariants; the handler fails and the root recovers with a rescan.
    h.fs.add_file("/project/src/a.cpp/x.h", "");
    h.source.emit(FsEvent::Created("/project/src/a.cpp/x.h".into()));

    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(h.source.subscribe_attempts(), 2);
    assert!(h.source.has_live_subscription());
    assert_eq!(
        h.fs.read_to_string(Path::new(OUTPUT)).unwrap(),
        SCENARIO_OUTPUT
    );

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn missing_root_directory_recovers_once_it_appears() {
    init_tracing();
    let fs = cmakewatch::fs::mock::MockFileSystem::new();
    let h = spawn_controller(fs, ScriptedEventSource::new());
    settle().await;

    // The directory check precedes subscription, so nothing was subscribed.
    assert_eq!(h.source.subscribe_attempts(), 0);
    assert!(!h.fs.exists(Path::new(OUTPUT)));

    // The watched tree shows up while the root is in recovery.
    h.fs.add_file("/project/src/a.cpp", "");
    h.fs.add_file("/project/inc/a.h", "");
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(h.source.subscribe_attempts(), 1);
    assert_eq!(
        h.fs.read_to_string(Path::new(OUTPUT)).unwrap(),
        SCENARIO_OUTPUT
    );

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn a_perpetually_failing_root_keeps_retrying_until_cancelled() {
    init_tracing();
    let source = ScriptedEventSource::new();
    source.fail_next_subscribes(1000);

    let h = spawn_controller(scenario_fs(), source);

    // Several recovery cycles: one attempt roughly every 2 seconds.
    tokio::time::sleep(Duration::from_secs(7)).await;
    let attempts = h.source.subscribe_attempts();
    assert!(
        (3..=5).contains(&attempts),
        "expected steady retries, got {attempts}"
    );

    // Cancellation still wins immediately, even mid-recovery.
    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn cancellation_disposes_the_active_subscription() {
    init_tracing();
    let h = spawn_controller(scenario_fs(), ScriptedEventSource::new());
    settle().await;
    assert!(h.source.has_live_subscription());

    let source = h.source.clone();
    h.shutdown().await;

    assert!(!source.has_live_subscription());
}
