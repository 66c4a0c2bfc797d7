// src/tree/load.rs

use std::path::PathBuf;

use tracing::{debug, info, trace};

use crate::errors::Result;
use crate::tasks::roles::LOGIC;
use crate::tree::layout::ProjectLayout;
use crate::tree::{FileId, FolderId, SourceTree};

/// File extensions recorded by the scan.
pub const TRACKED_EXTENSIONS: &[&str] = &[
    "h", "hh", "hpp", "hxx", "inl", "c", "cc", "cpp", "cxx", "xml",
];

/// Extensions that produce an object file.
pub const BUILDABLE_EXTENSIONS: &[&str] = &["c", "cc", "cpp", "cxx"];

fn extension_of(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, ext)| ext)
}

pub fn is_tracked(name: &str) -> bool {
    extension_of(name).is_some_and(|ext| TRACKED_EXTENSIONS.contains(&ext))
}

pub fn is_buildable(name: &str) -> bool {
    extension_of(name).is_some_and(|ext| BUILDABLE_EXTENSIONS.contains(&ext))
}

impl SourceTree {
    /// Scan all roots from scratch.
    ///
    /// Missing root directories are not an error; they simply yield empty
    /// folders.
    pub fn load(&mut self) -> Result<()> {
        self.folders.clear();
        self.files.clear();
        self.roots.clear();
        self.by_physical.clear();

        let roots = self.layout.roots.clone();
        for root in roots {
            let id = self.add_folder(None, &root.name, root.name.clone(), root.physical);
            self.scan_dir(id)?;
            self.roots.push(id);
        }

        let logic_root = self.add_folder(
            None,
            LOGIC,
            LOGIC.to_string(),
            self.layout.logic_physical.clone(),
        );
        let modules = self.layout.modules.clone();
        for (name, physical) in modules {
            let id = self.add_folder(
                Some(logic_root),
                &name,
                ProjectLayout::module_path(&name),
                physical,
            );
            self.scan_dir(id)?;
        }
        self.roots.push(logic_root);

        info!(
            folders = self.folders.len(),
            files = self.files.len(),
            "source tree loaded"
        );
        Ok(())
    }

    fn scan_dir(&mut self, folder: FolderId) -> Result<()> {
        let physical = self.folder(folder).physical.clone();
        if !self.fs.is_dir(&physical) {
            debug!(folder = %self.folder(folder).path, path = ?physical, "directory missing, skipping");
            return Ok(());
        }

        let mut entries = self.fs.read_dir(&physical)?;
        entries.sort();

        for entry in entries {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            if self.fs.is_dir(&entry) {
                let path = format!("{}/{}", self.folder(folder).path, name);
                let child = self.add_folder(Some(folder), &name, path, entry);
                self.scan_dir(child)?;
            } else if is_tracked(&name) {
                self.add_file(folder, &name, entry);
            } else {
                trace!(file = %name, "ignoring untracked file");
            }
        }
        Ok(())
    }

    /// Existing child folder `name` of `parent`, or a new, unscanned node
    /// appended for it.
    pub fn ensure_child_folder(&mut self, parent: FolderId, name: &str) -> FolderId {
        if let Some(existing) = self.child_named(parent, name) {
            return existing;
        }
        let parent_folder = self.folder(parent);
        let path = format!("{}/{}", parent_folder.path, name);
        let physical = parent_folder.physical.join(name);
        debug!(folder = %path, "adding folder node");
        self.add_folder(Some(parent), name, path, physical)
    }

    /// Pick up files written into `folder` since it was scanned.
    ///
    /// New files are appended; files already known get their caches dropped
    /// so the next stat sees the new timestamp. Returns the newly added files.
    pub fn rescan_folder(&mut self, folder: FolderId) -> Result<Vec<FileId>> {
        let physical = self.folder(folder).physical.clone();
        if !self.fs.is_dir(&physical) {
            return Ok(Vec::new());
        }

        let mut entries: Vec<PathBuf> = self.fs.read_dir(&physical)?;
        entries.sort();

        let mut added = Vec::new();
        for entry in entries {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') || !is_tracked(&name) || self.fs.is_dir(&entry) {
                continue;
            }
            match self.file_in_folder(folder, &name) {
                Some(existing) => self.reload_file(existing),
                None => added.push(self.add_file(folder, &name, entry)),
            }
        }

        debug!(folder = %self.folder(folder).path, added = added.len(), "folder rescanned");
        Ok(added)
    }
}
