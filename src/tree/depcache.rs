// src/tree/depcache.rs

//! On-disk cache of explicit include dependencies.
//!
//! One line per source file:
//!
//! ```text
//! <mtime nanos since epoch>\t<physical path>\t<dep path>\t<dep path>...
//! ```
//!
//! An entry only counts when the recorded mtime equals the file's current
//! mtime. Malformed lines are dropped on load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::tree::SourceTree;

const HEADER: &str = "# hbuild depcache v1";

#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheEntry {
    modified: u128,
    deps: Vec<PathBuf>,
}

#[derive(Debug, Default)]
pub struct DependencyCache {
    path: PathBuf,
    entries: HashMap<PathBuf, CacheEntry>,
    dirty: bool,
}

fn nanos(time: SystemTime) -> u128 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

impl DependencyCache {
    /// Load the cache at `path`; a missing or unreadable file gives an empty
    /// cache.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Self {
        let mut cache = Self {
            path: path.to_path_buf(),
            ..Self::default()
        };

        let text = match fs.read_to_string(path) {
            Ok(text) => text,
            Err(_) => {
                debug!(path = ?path, "no dependency cache yet");
                return cache;
            }
        };

        let mut skipped = 0usize;
        for line in text.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_line(line) {
                Some((file, entry)) => {
                    cache.entries.insert(file, entry);
                }
                None => skipped += 1,
            }
        }

        debug!(path = ?path, entries = cache.entries.len(), skipped, "dependency cache loaded");
        cache
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded dependencies of `file`, if recorded at exactly `modified`.
    pub fn lookup(&self, file: &Path, modified: SystemTime) -> Option<&[PathBuf]> {
        self.entries
            .get(file)
            .filter(|e| e.modified == nanos(modified))
            .map(|e| e.deps.as_slice())
    }

    pub fn store(&mut self, file: PathBuf, modified: SystemTime, deps: Vec<PathBuf>) {
        let entry = CacheEntry {
            modified: nanos(modified),
            deps,
        };
        if self.entries.get(&file) != Some(&entry) {
            self.entries.insert(file, entry);
            self.dirty = true;
        }
    }

    /// Write the cache back if anything changed.
    pub fn save(&mut self, fs: &dyn FileSystem) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        let mut files: Vec<_> = self.entries.iter().collect();
        files.sort_by(|a, b| a.0.cmp(b.0));

        let mut out = String::from(HEADER);
        out.push('\n');
        for (file, entry) in files {
            out.push_str(&entry.modified.to_string());
            out.push('\t');
            out.push_str(&file.to_string_lossy());
            for dep in &entry.deps {
                out.push('\t');
                out.push_str(&dep.to_string_lossy());
            }
            out.push('\n');
        }

        fs.write(&self.path, out.as_bytes())?;
        self.dirty = false;
        info!(path = ?self.path, entries = self.entries.len(), "dependency cache saved");
        Ok(())
    }
}

fn parse_line(line: &str) -> Option<(PathBuf, CacheEntry)> {
    let mut fields = line.split('\t');
    let modified = fields.next()?.parse::<u128>().ok()?;
    let file = fields.next().filter(|f| !f.is_empty())?;
    let deps = fields.filter(|f| !f.is_empty()).map(PathBuf::from).collect();
    Some((PathBuf::from(file), CacheEntry { modified, deps }))
}

impl SourceTree {
    /// Consult (and fill) `cache` when computing explicit dependencies.
    pub fn enable_depcache(&mut self, cache: DependencyCache) {
        self.depcache = Some(Mutex::new(cache));
    }

    /// Persist the dependency cache, if one is enabled.
    pub fn save_depcache(&self) -> Result<()> {
        let Some(cache) = &self.depcache else {
            return Ok(());
        };
        cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .save(self.fs.as_ref())
    }
}
