// src/tree/mod.rs

//! In-memory model of the project's source tree.
//!
//! Folders and files live in two arenas owned by [`SourceTree`] and refer to
//! each other by index ([`FolderId`], [`FileId`]). Per-file facts that are
//! expensive to compute (stat, lines, include dependencies, transitive
//! closure) are cached in `OnceLock`s so the tree can be queried through a
//! shared reference.
//!
//! Submodules:
//! - `layout`: logical folder path to physical directory mapping.
//! - `load`: recursive scan, incremental folder additions.
//! - `lookup`: path and name resolution.
//! - `deps`: `#include` scanning and dependency closures.
//! - `staleness`: timestamp comparisons.
//! - `depcache`: optional on-disk cache of explicit dependencies.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use crate::fs::FileSystem;
use crate::types::FileStamp;

pub mod depcache;
pub mod deps;
pub mod layout;
pub mod load;
pub mod lookup;
pub mod staleness;

pub use depcache::DependencyCache;
pub use layout::{ProjectLayout, RootSpec};
pub use staleness::{is_newer_than, stamp_is_newer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub(crate) usize);

#[derive(Debug)]
pub struct SourceFolder {
    pub(crate) name: String,
    /// Full slash-separated logical path, e.g. `logic/accounts/sqldo`.
    pub(crate) path: String,
    pub(crate) physical: PathBuf,
    pub(crate) parent: Option<FolderId>,
    pub(crate) files: Vec<FileId>,
    pub(crate) children: Vec<FolderId>,
}

impl SourceFolder {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn physical(&self) -> &Path {
        &self.physical
    }

    pub fn parent(&self) -> Option<FolderId> {
        self.parent
    }

    pub fn files(&self) -> &[FileId] {
        &self.files
    }

    pub fn children(&self) -> &[FolderId] {
        &self.children
    }
}

#[derive(Debug)]
pub struct SourceFile {
    pub(crate) folder: FolderId,
    pub(crate) name: String,
    pub(crate) physical: PathBuf,
    pub(crate) object: PathBuf,
    pub(crate) stamp: OnceLock<Option<FileStamp>>,
    pub(crate) lines: OnceLock<Vec<String>>,
    pub(crate) explicit: OnceLock<Vec<FileId>>,
    pub(crate) closure: OnceLock<Vec<FileId>>,
}

impl SourceFile {
    fn new(folder: FolderId, name: String, physical: PathBuf, object: PathBuf) -> Self {
        Self {
            folder,
            name,
            physical,
            object,
            stamp: OnceLock::new(),
            lines: OnceLock::new(),
            explicit: OnceLock::new(),
            closure: OnceLock::new(),
        }
    }

    pub fn folder(&self) -> FolderId {
        self.folder
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn physical(&self) -> &Path {
        &self.physical
    }

    /// Derived object file next to the source.
    pub fn object(&self) -> &Path {
        &self.object
    }

    fn reset_caches(&mut self) {
        self.stamp = OnceLock::new();
        self.lines = OnceLock::new();
        self.explicit = OnceLock::new();
        self.closure = OnceLock::new();
    }
}

/// Arena-backed source tree.
#[derive(Debug)]
pub struct SourceTree {
    fs: Arc<dyn FileSystem>,
    layout: ProjectLayout,
    object_suffix: String,
    folders: Vec<SourceFolder>,
    files: Vec<SourceFile>,
    /// Root folders in registration order.
    roots: Vec<FolderId>,
    by_physical: HashMap<PathBuf, FileId>,
    depcache: Option<Mutex<DependencyCache>>,
}

impl SourceTree {
    /// Empty tree; call [`SourceTree::load`] to scan.
    pub fn new(fs: Arc<dyn FileSystem>, layout: ProjectLayout, object_suffix: &str) -> Self {
        Self {
            fs,
            layout,
            object_suffix: object_suffix.trim_start_matches('.').to_string(),
            folders: Vec::new(),
            files: Vec::new(),
            roots: Vec::new(),
            by_physical: HashMap::new(),
            depcache: None,
        }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn filesystem(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn roots(&self) -> &[FolderId] {
        &self.roots
    }

    pub fn folder(&self, id: FolderId) -> &SourceFolder {
        &self.folders[id.0]
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0]
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Logical path of the folder containing `id`.
    pub fn folder_path_of(&self, id: FileId) -> &str {
        self.folder(self.file(id).folder).path()
    }

    pub fn file_by_physical(&self, path: &Path) -> Option<FileId> {
        self.by_physical.get(path).copied()
    }

    /// Drop the cached stat, lines and dependency lists of one file.
    ///
    /// Closures of *other* files that already include it keep their cached
    /// value; those are memoized for the rest of the run.
    pub fn reload_file(&mut self, id: FileId) {
        self.files[id.0].reset_caches();
    }

    fn add_folder(
        &mut self,
        parent: Option<FolderId>,
        name: &str,
        path: String,
        physical: PathBuf,
    ) -> FolderId {
        let id = FolderId(self.folders.len());
        self.folders.push(SourceFolder {
            name: name.to_string(),
            path,
            physical,
            parent,
            files: Vec::new(),
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.folders[parent.0].children.push(id);
        }
        id
    }

    fn add_file(&mut self, folder: FolderId, name: &str, physical: PathBuf) -> FileId {
        let id = FileId(self.files.len());
        let object = physical.with_extension(&self.object_suffix);
        self.by_physical.insert(physical.clone(), id);
        self.files
            .push(SourceFile::new(folder, name.to_string(), physical, object));
        self.folders[folder.0].files.push(id);
        id
    }
}
