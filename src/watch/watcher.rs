// src/watch/watcher.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::ConfigProvider;
use crate::tree::ProjectLayout;
use crate::tree::load::is_tracked;

/// Handle for the filesystem watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive; dropping it stops
/// watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<Event>,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

impl WatcherHandle {
    /// Wait for the next change to a tracked source file, then for a quiet
    /// period of `debounce`. Returns the changed paths, or `None` once the
    /// watcher has stopped.
    pub async fn next_change(&mut self, debounce: Duration) -> Option<Vec<PathBuf>> {
        let mut changed = Vec::new();
        while changed.is_empty() {
            let event = self.events.recv().await?;
            changed.extend(relevant_paths(&event));
        }

        loop {
            match tokio::time::timeout(debounce, self.events.recv()).await {
                Ok(Some(event)) => changed.extend(relevant_paths(&event)),
                Ok(None) => break,
                Err(_) => break,
            }
        }

        changed.sort();
        changed.dedup();
        Some(changed)
    }
}

/// Directories that hold sources: the fixed roots and every logic module.
pub fn watch_roots(cfg: &dyn ConfigProvider) -> Vec<PathBuf> {
    let layout = ProjectLayout::from_config(cfg);
    let mut roots: Vec<PathBuf> = layout.roots.into_iter().map(|r| r.physical).collect();
    roots.extend(layout.modules.into_iter().map(|(_, physical)| physical));
    roots.dedup();
    roots
}

fn relevant_paths(event: &Event) -> Vec<PathBuf> {
    if matches!(event.kind, EventKind::Access(_)) {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .filter(|p| is_source_path(p))
        .cloned()
        .collect()
}

fn is_source_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| !name.starts_with('.') && is_tracked(name))
}

/// Spawn a recursive watcher over `roots`. Missing roots are skipped.
pub fn spawn_watcher(roots: &[PathBuf]) -> anyhow::Result<WatcherHandle> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<Event>();

    // Called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("hbuild: failed to forward notify event: {err}");
                }
            }
            Err(err) => {
                eprintln!("hbuild: file watch error: {err}");
            }
        },
        Config::default(),
    )?;

    for root in roots {
        if !root.is_dir() {
            debug!(root = ?root, "not watching missing directory");
            continue;
        }
        match watcher.watch(root, RecursiveMode::Recursive) {
            Ok(()) => info!("file watcher started on {:?}", root),
            Err(err) => warn!(root = ?root, error = %err, "could not watch directory"),
        }
    }

    Ok(WatcherHandle {
        _inner: watcher,
        events: event_rx,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, ModifyKind};

    #[test]
    fn only_tracked_sources_count() {
        let modify = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/p/glob/a.cpp"))
            .add_path(PathBuf::from("/p/glob/a.o"))
            .add_path(PathBuf::from("/p/glob/.a.cpp.swp"));
        assert_eq!(relevant_paths(&modify), vec![PathBuf::from("/p/glob/a.cpp")]);

        let access = Event::new(EventKind::Access(AccessKind::Any)).add_path(PathBuf::from("/p/glob/a.cpp"));
        assert!(relevant_paths(&access).is_empty());
    }
}
