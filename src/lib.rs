// src/lib.rs

pub mod build;
pub mod cli;
pub mod codegen;
pub mod config;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod sched;
pub mod tasks;
pub mod tree;
pub mod types;
pub mod watch;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, error};

use crate::build::{BuildOrchestrator, TargetStatus};
use crate::cli::{CliArgs, Command};
use crate::codegen::ExternalGenerator;
use crate::config::{ConfigProvider, load_and_validate};
use crate::fs::{FileSystem, RealFileSystem};
use crate::sched::{ProcessExecutor, TaskExecutor};

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - config loading
/// - filesystem, code generator and process executor
/// - the orchestrator (or the watcher for `watch`)
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg: Arc<dyn ConfigProvider> = Arc::new(load_and_validate(&args.config)?);
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let generator = Arc::new(ExternalGenerator::from_section(cfg.generate()));
    let executor: Arc<dyn TaskExecutor> = Arc::new(ProcessExecutor::new(
        Arc::clone(&fs),
        generator,
        cfg.toolchain().platform,
    ));
    debug!(root = ?cfg.project_root(), "configuration loaded");

    match &args.command {
        Command::Watch {
            targets,
            debounce_ms,
        } => {
            watch::watch(cfg, fs, executor, targets, Duration::from_millis(*debounce_ms)).await?;
            Ok(0)
        }
        Command::Status { targets } => {
            let orchestrator = BuildOrchestrator::new(cfg, fs, executor)?;
            print_status(&orchestrator.status(targets));
            orchestrator.finish().await?;
            Ok(0)
        }
        command => {
            let mut orchestrator = BuildOrchestrator::new(cfg, fs, executor)?;
            let outcome = execute(&mut orchestrator, command).await;
            if let Err(err) = &outcome {
                error!(error = %err, "command failed");
                orchestrator.mark_aborted();
            }
            let summary = orchestrator.finish().await?;
            println!("{summary}");
            outcome?;
            Ok(summary.exit_code())
        }
    }
}

/// Run one non-watch command against an orchestrator.
pub async fn execute(orchestrator: &mut BuildOrchestrator, command: &Command) -> errors::Result<()> {
    let or_default = |targets: &[String]| {
        if targets.is_empty() {
            orchestrator.default_targets()
        } else {
            targets.to_vec()
        }
    };

    match command {
        Command::Build { targets } => orchestrator.run(targets).await,
        Command::Clean { targets } => {
            for target in or_default(targets) {
                orchestrator.clean(&target)?;
            }
            Ok(())
        }
        Command::Rebuild { targets } => {
            for target in or_default(targets) {
                orchestrator.clean(&target)?;
            }
            orchestrator.run(targets).await
        }
        Command::Generate { force } => orchestrator.generate_sqldo(*force).await.map(drop),
        Command::Install => orchestrator.install().await.map(drop),
        Command::Deploy => orchestrator.deploy().await.map(drop),
        Command::Status { .. } | Command::Watch { .. } => Ok(()),
    }
}

fn print_status(entries: &[TargetStatus]) {
    for entry in entries {
        if entry.missing {
            println!("{}: not found", entry.target);
            continue;
        }
        let link = if entry.relink { "relink" } else { "up to date" };
        println!("{}: {} stale, {link}", entry.target, entry.stale.len());
        for file in &entry.stale {
            println!("    {file}");
        }
    }
}
