// src/tasks/install.rs

use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use tracing::{debug, warn};

use crate::config::InstallRule;
use crate::errors::{HbuildError, Result};
use crate::fs::FileSystem;
use crate::tree::is_newer_than;
use crate::types::Platform;

/// Copy of build artifacts into an install or deploy location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTask {
    pub source: PathBuf,
    pub pattern: Option<String>,
    pub target: PathBuf,
    pub new_name: Option<String>,
    pub platform: Option<Platform>,
}

impl InstallTask {
    /// Resolve a rule's folders against the project root.
    pub fn from_rule(rule: &InstallRule, root: &Path) -> Self {
        Self {
            source: root.join(&rule.source),
            pattern: rule.pattern.clone(),
            target: root.join(&rule.target),
            new_name: rule.rename.clone(),
            platform: rule.platform,
        }
    }

    pub fn applies_to(&self, platform: Platform) -> bool {
        self.platform.is_none_or(|p| p == platform)
    }

    pub fn label(&self) -> String {
        match &self.pattern {
            Some(pattern) => format!("{} [{pattern}] -> {}", self.source.display(), self.target.display()),
            None => format!("{} -> {}", self.source.display(), self.target.display()),
        }
    }

    /// Run the copy. Returns the number of files copied.
    pub fn execute(&self, fs: &dyn FileSystem, platform: Platform) -> Result<usize> {
        if !self.applies_to(platform) {
            debug!(task = %self.label(), %platform, "install rule not for this platform");
            return Ok(0);
        }
        if !fs.is_dir(&self.source) {
            warn!(source = ?self.source, "install source folder does not exist");
            return Ok(0);
        }

        match &self.pattern {
            None => mirror(fs, &self.source, &self.target),
            Some(pattern) => {
                let matcher = matcher(pattern)?;
                let mut copied = 0;
                let mut entries = fs.read_dir(&self.source)?;
                entries.sort();
                for entry in entries {
                    let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                        continue;
                    };
                    if !fs.is_file(&entry) || !matcher.is_match(name) {
                        continue;
                    }
                    let target_name = self.new_name.as_deref().unwrap_or(name);
                    if copy_if_newer(fs, &entry, &self.target.join(target_name))? {
                        copied += 1;
                    }
                }
                Ok(copied)
            }
        }
    }
}

fn matcher(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|g| g.compile_matcher())
        .map_err(|e| HbuildError::config(format!("invalid install pattern '{pattern}': {e}")))
}

fn mirror(fs: &dyn FileSystem, source: &Path, target: &Path) -> Result<usize> {
    let mut copied = 0;
    let mut entries = fs.read_dir(source)?;
    entries.sort();
    for entry in entries {
        let Some(name) = entry.file_name() else {
            continue;
        };
        let destination = target.join(name);
        if fs.is_dir(&entry) {
            copied += mirror(fs, &entry, &destination)?;
        } else if copy_if_newer(fs, &entry, &destination)? {
            copied += 1;
        }
    }
    Ok(copied)
}

/// Copy when the target is missing or strictly older than the source.
pub fn copy_if_newer(fs: &dyn FileSystem, source: &Path, target: &Path) -> Result<bool> {
    if fs.exists(target) && !is_newer_than(fs, source, target) {
        return Ok(false);
    }
    fs.copy(source, target)?;
    debug!(from = ?source, to = ?target, "installed");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn task(pattern: Option<&str>, platform: Option<Platform>) -> InstallTask {
        InstallTask {
            source: PathBuf::from("/p/bin"),
            pattern: pattern.map(str::to_string),
            target: PathBuf::from("/p/dist"),
            new_name: None,
            platform,
        }
    }

    #[test]
    fn platform_mismatch_is_a_no_op() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/bin/libx.so", "x");
        let copied = task(None, Some(Platform::Windows))
            .execute(&fs, Platform::Linux)
            .unwrap();
        assert_eq!(copied, 0);
        assert!(!fs.exists(Path::new("/p/dist/libx.so")));
    }

    #[test]
    fn pattern_selects_files_and_rename_applies() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/bin/libx.so", "x");
        fs.add_file("/p/bin/notes.txt", "n");
        let mut t = task(Some("*.so"), None);
        t.new_name = Some("libcore.so".to_string());

        assert_eq!(t.execute(&fs, Platform::Linux).unwrap(), 1);
        assert_eq!(fs.contents("/p/dist/libcore.so").as_deref(), Some("x"));
        assert!(!fs.exists(Path::new("/p/dist/notes.txt")));
    }

    #[test]
    fn mirror_recurses_into_subfolders() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/bin/a", "a");
        fs.add_file("/p/bin/sub/b", "b");
        assert_eq!(task(None, None).execute(&fs, Platform::Linux).unwrap(), 2);
        assert!(fs.exists(Path::new("/p/dist/sub/b")));
    }
}
