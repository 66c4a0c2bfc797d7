// src/tree/layout.rs

//! Mapping between logical folder paths (`glob`, `logic/accounts/sqldo`) and
//! physical directories.

use std::path::PathBuf;

use crate::config::ConfigProvider;
use crate::tasks::roles::{CLIENT, GLOB, LOGIC, SERVER};

/// A fixed top-level root folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSpec {
    pub name: String,
    pub physical: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ProjectLayout {
    /// Fixed roots in registration order (`glob`, `server`, `client`).
    pub roots: Vec<RootSpec>,
    /// Physical directory standing in for the `logic` root itself.
    pub logic_physical: PathBuf,
    /// Logic modules in build order, with their physical directories.
    pub modules: Vec<(String, PathBuf)>,
    /// Name of generated-code subfolders.
    pub generated: String,
    pub schema_suffix: String,
    pub bin_dir: PathBuf,
}

impl ProjectLayout {
    pub fn from_config(cfg: &dyn ConfigProvider) -> Self {
        let root = cfg.project_root().to_path_buf();
        let glob = if cfg.use_modular_core() {
            cfg.core_folder_path().join(GLOB)
        } else {
            root.join(GLOB)
        };

        let roots = vec![
            RootSpec {
                name: GLOB.to_string(),
                physical: glob,
            },
            RootSpec {
                name: SERVER.to_string(),
                physical: root.join(SERVER),
            },
            RootSpec {
                name: CLIENT.to_string(),
                physical: root.join(CLIENT),
            },
        ];

        let modules = cfg
            .logic_modules()
            .iter()
            .map(|name| {
                let physical = cfg.logic_module_repo(name).join(LOGIC).join(name);
                (name.clone(), physical)
            })
            .collect();

        Self {
            roots,
            logic_physical: root.join(LOGIC),
            modules,
            generated: cfg.generate().folder.clone(),
            schema_suffix: cfg.generate().schema_suffix.clone(),
            bin_dir: cfg.bin_dir(),
        }
    }

    /// Physical directory of a logical folder path, whether or not it has
    /// been scanned.
    pub fn physical_of(&self, folder_path: &str) -> Option<PathBuf> {
        let mut segments = folder_path
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty());
        let first = segments.next()?;

        let mut base = if first == LOGIC {
            match segments.next() {
                None => return Some(self.logic_physical.clone()),
                Some(module) => self
                    .modules
                    .iter()
                    .find(|(name, _)| name == module)
                    .map(|(_, physical)| physical.clone())?,
            }
        } else {
            self.roots
                .iter()
                .find(|r| r.name == first)
                .map(|r| r.physical.clone())?
        };

        for segment in segments {
            base.push(segment);
        }
        Some(base)
    }

    /// Logical path of a folder's generated-code subfolder.
    pub fn generated_path(&self, folder_path: &str) -> String {
        format!("{}/{}", folder_path.trim_end_matches('/'), self.generated)
    }

    /// Logical path of a logic module folder.
    pub fn module_path(name: &str) -> String {
        format!("{LOGIC}/{name}")
    }
}
