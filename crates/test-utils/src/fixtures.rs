//! In-memory project fixtures.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hbuild::build::BuildOrchestrator;
use hbuild::config::{BuildConfig, ConfigProvider};
use hbuild::fs::FileSystem;
use hbuild::fs::mock::MockFileSystem;
use hbuild::sched::TaskExecutor;
use hbuild::tree::{ProjectLayout, SourceTree};

use crate::fake_executor::FakeExecutor;

/// Root of every fixture project.
pub const ROOT: &str = "/proj";

/// A project living in a [`MockFileSystem`], with a [`FakeExecutor`] that
/// writes into the same filesystem.
#[derive(Debug, Clone)]
pub struct Project {
    pub fs: MockFileSystem,
    pub executor: FakeExecutor,
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl Project {
    pub fn new() -> Self {
        let fs = MockFileSystem::new();
        fs.create_dir_all(Path::new(ROOT))
            .expect("mock filesystem accepts directories");
        let executor = FakeExecutor::new(fs.clone());
        Self { fs, executor }
    }

    /// Absolute path of a project-relative path.
    pub fn path(rel: &str) -> PathBuf {
        Path::new(ROOT).join(rel)
    }

    /// Write a file, stamped with the next clock tick.
    pub fn add(&self, rel: &str, content: &str) -> &Self {
        self.fs.add_file(Self::path(rel), content);
        self
    }

    /// Bump a file's modification time.
    pub fn touch(&self, rel: &str) {
        self.fs.touch(Self::path(rel));
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.fs.exists(&Self::path(rel))
    }

    /// Scan the project into a fresh tree.
    pub fn tree(&self, cfg: &BuildConfig) -> SourceTree {
        let layout = ProjectLayout::from_config(cfg);
        let fs: Arc<dyn FileSystem> = Arc::new(self.fs.clone());
        let mut tree = SourceTree::new(fs, layout, &cfg.toolchain().object_suffix);
        tree.load().expect("fixture tree loads");
        tree
    }

    /// Orchestrator over the mock filesystem and fake executor. Needs a
    /// tokio runtime.
    pub fn orchestrator(&self, cfg: BuildConfig) -> BuildOrchestrator {
        let executor: Arc<dyn TaskExecutor> = Arc::new(self.executor.clone());
        BuildOrchestrator::new(Arc::new(cfg), Arc::new(self.fs.clone()), executor)
            .expect("fixture orchestrator starts")
    }
}
