// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::errors::{HbuildError, Result};
use crate::types::FileStamp;

pub mod mock;

/// Abstract filesystem interface.
///
/// Everything the build engine does to the disk goes through this trait so
/// the tree model, staleness checks and install rules can run against
/// [`mock::MockFileSystem`] in tests.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Write a file, creating missing parent directories.
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Size and last-modified time, or `None` if the path does not exist.
    fn stat(&self, path: &Path) -> Option<FileStamp>;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Copy `from` to `to`, creating missing parent directories of `to`.
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Set an existing file's modification time to now.
    fn touch(&self, path: &Path) -> Result<()>;
}

/// Read a text file as lines.
pub fn read_lines(fs: &dyn FileSystem, path: &Path) -> Result<Vec<String>> {
    let text = fs.read_to_string(path)?;
    Ok(text.lines().map(str::to_string).collect())
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        // Sources are not guaranteed to be UTF-8; replace invalid sequences.
        let bytes = fs::read(path).map_err(|e| HbuildError::fs(path, e))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| HbuildError::fs(parent, e))?;
            }
        }
        let mut file = fs::File::create(path).map_err(|e| HbuildError::fs(path, e))?;
        file.write_all(contents)
            .map_err(|e| HbuildError::fs(path, e))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn stat(&self, path: &Path) -> Option<FileStamp> {
        let meta = fs::metadata(path).ok()?;
        let modified = meta.modified().ok()?;
        Some(FileStamp {
            size: meta.len(),
            modified,
        })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).map_err(|e| HbuildError::fs(path, e))? {
            let entry = entry.map_err(|e| HbuildError::fs(path, e))?;
            entries.push(entry.path());
        }
        Ok(entries)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| HbuildError::fs(path, e))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| HbuildError::fs(parent, e))?;
            }
        }
        fs::copy(from, to).map_err(|e| HbuildError::fs(from, e))?;
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).map_err(|e| HbuildError::fs(path, e))
    }

    fn touch(&self, path: &Path) -> Result<()> {
        let file = fs::File::options()
            .write(true)
            .open(path)
            .map_err(|e| HbuildError::fs(path, e))?;
        file.set_modified(SystemTime::now())
            .map_err(|e| HbuildError::fs(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_fs_write_creates_parents_and_stats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.txt");
        let fs = RealFileSystem;

        assert!(fs.stat(&path).is_none());
        fs.write(&path, b"hello").unwrap();

        let stamp = fs.stat(&path).unwrap();
        assert_eq!(stamp.size, 5);
        assert_eq!(read_lines(&fs, &path).unwrap(), vec!["hello".to_string()]);

        let earlier = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1);
        std::fs::File::options().write(true).open(&path).unwrap().set_modified(earlier).unwrap();
        fs.touch(&path).unwrap();
        assert!(fs.stat(&path).unwrap().modified > earlier);

        fs.remove_file(&path).unwrap();
        assert!(!fs.exists(&path));
    }
}
