// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod tree;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::RootSpec;
use crate::engine::RootController;
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::{EventSource, NotifyEventSource};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - one watch controller task per configured root
/// - Ctrl-C handling
///
/// Once every root loop is running, the process only exits on Ctrl-C; a
/// failing root recovers on its own and is not a process-level failure.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let base_dir = std::env::current_dir()?;
    let roots = load_and_validate(&config_path, &base_dir)?;

    info!("cmakewatch v{}", env!("CARGO_PKG_VERSION"));

    if args.dry_run {
        print_dry_run(&roots);
        return Ok(());
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    if args.once {
        for spec in roots {
            info!(root = ?spec.root_path, "generating once");
            RootController::run_once(spec, Arc::clone(&fs))?;
        }
        return Ok(());
    }

    let source: Arc<dyn EventSource> = Arc::new(NotifyEventSource);
    let cancel = CancellationToken::new();

    let mut loops = Vec::with_capacity(roots.len());
    for spec in roots {
        let fs = Arc::clone(&fs);
        let source = Arc::clone(&source);
        let cancel = cancel.clone();
        loops.push(tokio::spawn(RootController::run(spec, fs, source, cancel)));
    }

    // Ctrl-C -> cooperative cancellation of every root loop.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            cancel.cancel();
        });
    }

    info!("press Ctrl-C to quit");

    for handle in loops {
        handle.await?;
    }

    Ok(())
}

/// Simple dry-run output: print the resolved roots and their groups.
fn print_dry_run(roots: &[RootSpec]) {
    println!("cmakewatch dry-run");
    println!();

    println!("roots ({}):", roots.len());
    for root in roots {
        println!("  - watch:  {}", root.root_path.display());
        println!("    output: {}", root.output_path.display());
        for group in &root.groups {
            println!("    {} <- {:?}", group.list_name, group.extensions);
        }
    }
}
