// src/fs/mock.rs

use super::FileSystem;
use crate::errors::{HbuildError, Result};
use crate::types::FileStamp;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Base of the mock clock, in seconds after the epoch.
const CLOCK_BASE_SECS: u64 = 1_700_000_000;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File { content: Vec<u8>, modified: SystemTime },
    Dir(Vec<String>), // List of child names
}

/// In-memory filesystem with a deterministic clock.
///
/// Every write stamps the file with the next clock tick, so "written later"
/// always means "strictly newer". Tests can also pin explicit times with
/// [`MockFileSystem::set_modified`].
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    clock: Arc<AtomicU64>,
}

fn not_found(path: &Path) -> HbuildError {
    HbuildError::fs(
        path,
        std::io::Error::new(ErrorKind::NotFound, "no such file or directory"),
    )
}

fn parent_key(path: &Path) -> Option<PathBuf> {
    let parent = path.parent()?;
    if parent.as_os_str().is_empty() {
        Some(PathBuf::from("."))
    } else {
        Some(parent.to_path_buf())
    }
}

impl MockFileSystem {
    pub fn new() -> Self {
        let mut files = HashMap::new();
        // Ensure root exists
        files.insert(PathBuf::from("."), MockEntry::Dir(Vec::new()));

        Self {
            files: Arc::new(Mutex::new(files)),
            clock: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Time corresponding to a given clock tick.
    pub fn time_at(tick: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(CLOCK_BASE_SECS + tick)
    }

    /// Advance the clock and return the new time.
    pub fn tick(&self) -> SystemTime {
        let t = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        Self::time_at(t)
    }

    /// Add (or overwrite) a file stamped with the next clock tick.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let modified = self.tick();
        self.add_file_at(path, content, modified);
    }

    /// Add (or overwrite) a file with an explicit modification time.
    pub fn add_file_at(
        &self,
        path: impl AsRef<Path>,
        content: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) {
        let path = path.as_ref().to_path_buf();
        let mut files = self.lock();
        files.insert(
            path.clone(),
            MockEntry::File {
                content: content.into(),
                modified,
            },
        );

        // Ensure parent directories exist implicitly for simplicity in this mock
        if let Some(parent) = parent_key(&path) {
            Self::ensure_dir_entry(&mut files, &parent);
            Self::link_child(&mut files, &parent, &path);
        }
    }

    /// Pin the modification time of an existing file.
    pub fn set_modified(&self, path: impl AsRef<Path>, modified: SystemTime) {
        let mut files = self.lock();
        if let Some(MockEntry::File { modified: m, .. }) = files.get_mut(path.as_ref()) {
            *m = modified;
        }
    }

    /// Bump a file's modification time to the next clock tick.
    pub fn touch(&self, path: impl AsRef<Path>) {
        let modified = self.tick();
        self.set_modified(path, modified);
    }

    /// Read a file's content as a string, if present (for assertions).
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let files = self.lock();
        match files.get(path.as_ref()) {
            Some(MockEntry::File { content, .. }) => {
                Some(String::from_utf8_lossy(content).into_owned())
            }
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn link_child(files: &mut HashMap<PathBuf, MockEntry>, parent: &Path, child: &Path) {
        if let Some(MockEntry::Dir(children)) = files.get_mut(parent) {
            if let Some(name) = child.file_name().and_then(|n| n.to_str()) {
                if !children.iter().any(|c| c == name) {
                    children.push(name.to_string());
                }
            }
        }
    }

    fn ensure_dir_entry(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        if files.contains_key(path) {
            return;
        }
        files.insert(path.to_path_buf(), MockEntry::Dir(Vec::new()));
        if let Some(parent) = parent_key(path) {
            if parent != path {
                // Avoid infinite loop at root
                Self::ensure_dir_entry(files, &parent);
                Self::link_child(files, &parent, path);
            }
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let files = self.lock();
        match files.get(path) {
            Some(MockEntry::File { content, .. }) => {
                Ok(String::from_utf8_lossy(content).into_owned())
            }
            Some(MockEntry::Dir(_)) => Err(HbuildError::fs(
                path,
                std::io::Error::new(ErrorKind::Other, "is a directory"),
            )),
            None => Err(not_found(path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(path), Some(MockEntry::Dir(_)))
    }

    fn stat(&self, path: &Path) -> Option<FileStamp> {
        match self.lock().get(path) {
            Some(MockEntry::File { content, modified }) => Some(FileStamp {
                size: content.len() as u64,
                modified: *modified,
            }),
            Some(MockEntry::Dir(_)) => Some(FileStamp {
                size: 0,
                modified: UNIX_EPOCH,
            }),
            None => None,
        }
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.lock();
        match files.get(path) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(not_found(path)),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut files = self.lock();
        Self::ensure_dir_entry(&mut files, path);
        Ok(())
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let content = {
            let files = self.lock();
            match files.get(from) {
                Some(MockEntry::File { content, .. }) => content.clone(),
                _ => return Err(not_found(from)),
            }
        };
        self.add_file(to, content);
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        let mut files = self.lock();
        match files.get(path) {
            Some(MockEntry::File { .. }) => {}
            _ => return Err(not_found(path)),
        }
        files.remove(path);
        if let Some(parent) = parent_key(path) {
            if let (Some(MockEntry::Dir(children)), Some(name)) = (
                files.get_mut(&parent),
                path.file_name().and_then(|n| n.to_str()),
            ) {
                children.retain(|c| c != name);
            }
        }
        Ok(())
    }

    fn touch(&self, path: &Path) -> Result<()> {
        if !FileSystem::is_file(self, path) {
            return Err(not_found(path));
        }
        MockFileSystem::touch(self, path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_advance_the_clock() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/a.h", "a");
        fs.add_file("/p/b.h", "b");

        let a = fs.stat(Path::new("/p/a.h")).unwrap().modified;
        let b = fs.stat(Path::new("/p/b.h")).unwrap().modified;
        assert!(b > a);
        assert!(fs.is_dir(Path::new("/p")));
        assert_eq!(fs.read_dir(Path::new("/p")).unwrap().len(), 2);
    }

    #[test]
    fn remove_unlinks_from_parent() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/a.o", "");
        fs.remove_file(Path::new("/p/a.o")).unwrap();

        assert!(!fs.exists(Path::new("/p/a.o")));
        assert!(fs.read_dir(Path::new("/p")).unwrap().is_empty());
        assert!(fs.remove_file(Path::new("/p/a.o")).is_err());
    }

    #[test]
    fn trait_touch_requires_an_existing_file() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/a.h", "a");
        let before = fs.stat(Path::new("/p/a.h")).unwrap().modified;

        FileSystem::touch(&fs, Path::new("/p/a.h")).unwrap();
        assert!(fs.stat(Path::new("/p/a.h")).unwrap().modified > before);
        assert!(FileSystem::touch(&fs, Path::new("/p/missing.h")).is_err());
    }
}
