// src/tree/deps.rs

//! `#include` scanning and transitive dependency closures.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{LazyLock, PoisonError};

use regex::Regex;
use tracing::{trace, warn};

use crate::fs::read_lines;
use crate::tree::lookup::normalize;
use crate::tree::{FileId, FolderId, SourceTree};

static LOCAL_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*#\s*include\s*"([^"]+)""#).expect("include pattern is valid")
});

/// Targets of local `#include "..."` directives, in order of appearance.
/// System includes (`<...>`) are not reported.
pub fn local_includes(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|line| LOCAL_INCLUDE.captures(line))
        .map(|caps| caps[1].to_string())
        .collect()
}

impl SourceTree {
    /// Lines of a file, read once. Unreadable files have no lines.
    pub fn lines(&self, id: FileId) -> &[String] {
        self.file(id).lines.get_or_init(|| {
            let path = &self.file(id).physical;
            match read_lines(self.fs.as_ref(), path) {
                Ok(lines) => lines,
                Err(err) => {
                    warn!(file = ?path, error = %err, "could not read source file");
                    Vec::new()
                }
            }
        })
    }

    /// Files named by the local includes of `id` that resolve inside the tree.
    pub fn explicit_dependencies(&self, id: FileId) -> &[FileId] {
        self.file(id)
            .explicit
            .get_or_init(|| self.compute_explicit(id))
    }

    /// Transitive closure of [`SourceTree::explicit_dependencies`].
    ///
    /// Never contains `id` itself and never lists the same physical file
    /// twice, even with include cycles.
    pub fn dependencies(&self, id: FileId) -> &[FileId] {
        self.file(id).closure.get_or_init(|| self.compute_closure(id))
    }

    fn compute_explicit(&self, id: FileId) -> Vec<FileId> {
        if let Some(cached) = self.cached_explicit(id) {
            return cached;
        }

        let file = self.file(id);
        let mut deps = Vec::new();
        for include in local_includes(self.lines(id)) {
            match self.resolve_include(file.folder, &include) {
                Some(dep) if dep != id && !deps.contains(&dep) => deps.push(dep),
                Some(_) => {}
                None => trace!(file = %file.name, include = %include, "unresolved include"),
            }
        }

        self.store_explicit(id, &deps);
        deps
    }

    fn resolve_include(&self, from: FolderId, include: &str) -> Option<FileId> {
        let relative = normalize(&format!("{}/{}", self.folder(from).path, include));
        let local = match relative.rsplit_once('/') {
            Some((dir, name)) => self
                .find_path(dir)
                .and_then(|folder| self.file_in_folder(folder, name)),
            None => None,
        };
        local.or_else(|| self.find_file(include))
    }

    fn compute_closure(&self, id: FileId) -> Vec<FileId> {
        let own: &Path = &self.file(id).physical;
        let mut seen: HashSet<&Path> = HashSet::new();
        let mut out = Vec::new();
        let mut stack: Vec<FileId> = self.explicit_dependencies(id).iter().rev().copied().collect();

        while let Some(dep) = stack.pop() {
            let physical: &Path = &self.file(dep).physical;
            if physical == own || !seen.insert(physical) {
                continue;
            }
            out.push(dep);
            stack.extend(self.explicit_dependencies(dep).iter().rev().copied());
        }
        out
    }

    fn cached_explicit(&self, id: FileId) -> Option<Vec<FileId>> {
        let cache = self.depcache.as_ref()?;
        let stamp = self.stamp(id)?;
        let cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
        let paths = cache.lookup(&self.file(id).physical, stamp.modified)?;
        Some(
            paths
                .iter()
                .filter_map(|p| self.file_by_physical(p))
                .filter(|dep| *dep != id)
                .collect(),
        )
    }

    fn store_explicit(&self, id: FileId, deps: &[FileId]) {
        let (Some(cache), Some(stamp)) = (self.depcache.as_ref(), self.stamp(id)) else {
            return;
        };
        let paths = deps
            .iter()
            .map(|d| self.file(*d).physical.clone())
            .collect();
        cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .store(self.file(id).physical.clone(), stamp.modified, paths);
    }
}
