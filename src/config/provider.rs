// src/config/provider.rs

//! Read-only view of the build topology consumed by the tree, tasks and
//! orchestrator.

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use crate::config::model::{
    BuildConfig, DepCacheSection, GenerateSection, InstallRule, WorkersSection,
};
use crate::tasks::toolchain::Toolchain;

pub trait ConfigProvider: Send + Sync + Debug {
    fn use_modular_core(&self) -> bool;
    /// Physical core folder; only meaningful with `use_modular_core`.
    fn core_folder_path(&self) -> PathBuf;
    fn application_modules(&self) -> &[String];
    /// Logic module names, dependencies before dependents.
    fn logic_modules(&self) -> &[String];
    /// Direct dependencies of a logic module (empty for unknown modules).
    fn logic_module_dependencies(&self, name: &str) -> Vec<String>;
    /// Physical repository directory holding `logic/<name>`.
    fn logic_module_repo(&self, name: &str) -> PathBuf;
    fn install_rules(&self) -> &[InstallRule];
    fn deploy_rules(&self) -> &[InstallRule];

    fn project_root(&self) -> &Path;
    /// Physical shared binary output directory.
    fn bin_dir(&self) -> PathBuf;
    fn is_excluded(&self, folder: &str, file: &str) -> bool;
    fn toolchain(&self) -> &Toolchain;
    fn generate(&self) -> &GenerateSection;
    fn workers(&self) -> WorkersSection;
    fn depcache(&self) -> &DepCacheSection;
}

impl ConfigProvider for BuildConfig {
    fn use_modular_core(&self) -> bool {
        self.project.use_modular_core
    }

    fn core_folder_path(&self) -> PathBuf {
        match &self.project.core_folder {
            Some(core) => self.project.root.join(core),
            None => self.project.root.clone(),
        }
    }

    fn application_modules(&self) -> &[String] {
        &self.project.application_modules
    }

    fn logic_modules(&self) -> &[String] {
        &self.module_order
    }

    fn logic_module_dependencies(&self, name: &str) -> Vec<String> {
        self.logic
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.depends_on.clone())
            .unwrap_or_default()
    }

    fn logic_module_repo(&self, name: &str) -> PathBuf {
        let repo = self
            .logic
            .iter()
            .find(|m| m.name == name)
            .and_then(|m| m.repo.clone());
        match repo {
            Some(repo) => self.project.root.join(repo),
            None => self.project.root.clone(),
        }
    }

    fn install_rules(&self) -> &[InstallRule] {
        &self.install
    }

    fn deploy_rules(&self) -> &[InstallRule] {
        &self.deploy
    }

    fn project_root(&self) -> &Path {
        &self.project.root
    }

    fn bin_dir(&self) -> PathBuf {
        self.project.root.join(&self.project.bin_dir)
    }

    fn is_excluded(&self, folder: &str, file: &str) -> bool {
        self.exclude
            .iter()
            .any(|rule| rule.folder == folder && rule.file == file)
    }

    fn toolchain(&self) -> &Toolchain {
        &self.toolchain
    }

    fn generate(&self) -> &GenerateSection {
        &self.generate
    }

    fn workers(&self) -> WorkersSection {
        self.workers
    }

    fn depcache(&self) -> &DepCacheSection {
        &self.depcache
    }
}

/// All logic modules `name` depends on, directly or indirectly, in build
/// order (dependencies first). `name` itself is not included.
pub fn transitive_logic_dependencies(cfg: &dyn ConfigProvider, name: &str) -> Vec<String> {
    let mut wanted = std::collections::HashSet::new();
    let mut stack = cfg.logic_module_dependencies(name);
    while let Some(dep) = stack.pop() {
        if dep != name && wanted.insert(dep.clone()) {
            stack.extend(cfg.logic_module_dependencies(&dep));
        }
    }

    cfg.logic_modules()
        .iter()
        .filter(|m| wanted.contains(m.as_str()))
        .cloned()
        .collect()
}
