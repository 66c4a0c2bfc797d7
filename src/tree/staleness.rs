// src/tree/staleness.rs

use std::path::Path;

use crate::fs::FileSystem;
use crate::tree::{FileId, SourceTree};
use crate::types::FileStamp;

/// Existence-aware "newer than" on two optional stamps.
///
/// | a       | b       | result            |
/// |---------|---------|-------------------|
/// | missing | missing | false             |
/// | present | missing | true              |
/// | missing | present | false             |
/// | present | present | `a.mtime > b.mtime` |
pub fn stamp_is_newer(a: Option<FileStamp>, b: Option<FileStamp>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.modified > b.modified,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

pub fn is_newer_than(fs: &dyn FileSystem, a: &Path, b: &Path) -> bool {
    stamp_is_newer(fs.stat(a), fs.stat(b))
}

impl SourceTree {
    /// Stat of a tree file, captured once until [`SourceTree::reload_file`].
    pub fn stamp(&self, id: FileId) -> Option<FileStamp> {
        *self
            .file(id)
            .stamp
            .get_or_init(|| self.fs.stat(&self.file(id).physical))
    }

    pub fn object_path(&self, id: FileId) -> &Path {
        &self.file(id).object
    }

    pub fn is_newer_than(&self, a: &Path, b: &Path) -> bool {
        is_newer_than(self.fs.as_ref(), a, b)
    }

    /// True when the file, or anything it includes transitively, is newer
    /// than its object file.
    pub fn needs_rebuild(&self, id: FileId) -> bool {
        let object = self.fs.stat(&self.file(id).object);
        if stamp_is_newer(self.stamp(id), object) {
            return true;
        }
        self.dependencies(id)
            .iter()
            .any(|dep| stamp_is_newer(self.stamp(*dep), object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn at(secs: u64) -> Option<FileStamp> {
        Some(FileStamp {
            size: 1,
            modified: UNIX_EPOCH + Duration::from_secs(secs),
        })
    }

    #[test]
    fn newer_than_truth_table() {
        assert!(!stamp_is_newer(None, None));
        assert!(stamp_is_newer(at(1), None));
        assert!(!stamp_is_newer(None, at(1)));
        assert!(stamp_is_newer(at(2), at(1)));
        assert!(!stamp_is_newer(at(1), at(1)));
        assert!(!stamp_is_newer(at(1), at(2)));
    }
}
