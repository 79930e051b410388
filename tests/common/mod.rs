#![allow(dead_code)]

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use cmakewatch::config::RootSpec;
use cmakewatch::engine::RootController;
use cmakewatch::fs::mock::MockFileSystem;
use cmakewatch_test_utils::builders::RootSpecBuilder;
use cmakewatch_test_utils::scripted_source::ScriptedEventSource;

pub use cmakewatch_test_utils::init_tracing;

pub const OUTPUT: &str = "/project/files.cmake";

/// Expected output for `src/a.cpp` + `inc/a.h` scanned in that order.
pub const SCENARIO_OUTPUT: &str =
    "list(APPEND HEADERS\n    \"inc/a.h\"\n)\n\nlist(APPEND SOURCES\n    \"src/a.cpp\"\n)\n\n";

/// The standard scenario root: HEADERS <- {h, hpp}, SOURCES <- {cpp}.
pub fn scenario_spec() -> RootSpec {
    RootSpecBuilder::new("/project", OUTPUT)
        .group("HEADERS", &["h", "hpp"])
        .group("SOURCES", &["cpp"])
        .build()
}

/// Scenario filesystem: `/project/src/a.cpp` and `/project/inc/a.h`.
pub fn scenario_fs() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file("/project/src/a.cpp", "");
    fs.add_file("/project/inc/a.h", "");
    fs
}

pub struct Harness {
    pub fs: MockFileSystem,
    pub source: ScriptedEventSource,
    pub cancel: CancellationToken,
    pub handle: tokio::task::JoinHandle<()>,
}

impl Harness {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.handle.await.expect("controller task panicked");
    }
}

/// Spawn a controller over the scenario spec, the given mock filesystem and
/// scripted event source.
pub fn spawn_controller(fs: MockFileSystem, source: ScriptedEventSource) -> Harness {
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(RootController::run(
        scenario_spec(),
        Arc::new(fs.clone()),
        Arc::new(source.clone()),
        cancel.clone(),
    ));
    Harness {
        fs,
        source,
        cancel,
        handle,
    }
}
