// src/watch/mod.rs

//! `hbuild watch`: rebuild whenever sources change.

pub mod watcher;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::build::{BuildOrchestrator, RunSummary};
use crate::config::ConfigProvider;
use crate::fs::FileSystem;
use crate::sched::TaskExecutor;

pub use watcher::{WatcherHandle, spawn_watcher, watch_roots};

/// One build cycle with a freshly scanned tree.
pub async fn build_once(
    cfg: Arc<dyn ConfigProvider>,
    fs: Arc<dyn FileSystem>,
    executor: Arc<dyn TaskExecutor>,
    targets: &[String],
) -> anyhow::Result<RunSummary> {
    let mut orchestrator = BuildOrchestrator::new(cfg, fs, executor)?;
    if let Err(err) = orchestrator.run(targets).await {
        error!(error = %err, "build cycle failed");
        orchestrator.mark_aborted();
    }
    Ok(orchestrator.finish().await?)
}

/// Build, then rebuild after every debounced batch of source changes until
/// Ctrl-C.
pub async fn watch(
    cfg: Arc<dyn ConfigProvider>,
    fs: Arc<dyn FileSystem>,
    executor: Arc<dyn TaskExecutor>,
    targets: &[String],
    debounce: Duration,
) -> anyhow::Result<()> {
    let mut handle = spawn_watcher(&watch_roots(cfg.as_ref()))?;

    let summary = build_once(cfg.clone(), fs.clone(), executor.clone(), targets).await?;
    println!("{summary}");

    loop {
        tokio::select! {
            changed = handle.next_change(debounce) => {
                let Some(changed) = changed else {
                    info!("watcher stopped");
                    break;
                };
                info!(files = changed.len(), first = ?changed.first(), "sources changed; rebuilding");
                let summary = build_once(cfg.clone(), fs.clone(), executor.clone(), targets).await?;
                println!("{summary}");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted; stopping watch");
                break;
            }
        }
    }
    Ok(())
}
