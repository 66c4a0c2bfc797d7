// src/tasks/link.rs

use std::path::{Path, PathBuf};

use crate::config::{ConfigProvider, transitive_logic_dependencies};
use crate::fs::FileSystem;
use crate::tasks::roles::{
    CLIENT, FolderRole, GLOB, LinkStyle, ObjectSource, RoleKind, RoleLibrary, SERVER, rule_for,
};
use crate::tasks::toolchain::Toolchain;
use crate::tree::load::is_buildable;
use crate::tree::{ProjectLayout, SourceTree, is_newer_than};

/// One linker (or archiver) invocation for a folder or pseudo-target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTask {
    pub folder: String,
    pub role: FolderRole,
    target: Option<PathBuf>,
    pub objects: Vec<PathBuf>,
    /// Link artifacts of other roles this target depends on.
    pub libraries: Vec<PathBuf>,
    /// Rendered command line; empty when there is nothing to link.
    pub command: String,
    aggregation: bool,
}

impl LinkTask {
    pub fn new(tree: &SourceTree, cfg: &dyn ConfigProvider, folder_path: &str) -> Self {
        let layout = tree.layout();
        let generated = layout.generated.as_str();
        let role = FolderRole::classify(folder_path, generated);
        let toolchain = cfg.toolchain();

        // Generated folders are linked as part of their owner.
        let rule = match &role {
            FolderRole::Generated { .. } => rule_for(RoleKind::Plain),
            _ => role.rule(generated),
        };

        let target = artifact_path(layout, toolchain, &role);

        let mut objects = Vec::new();
        match rule.objects {
            ObjectSource::None => {}
            ObjectSource::Own => objects.extend(folder_objects(tree, cfg, folder_path)),
            ObjectSource::OwnAndLogic => {
                objects.extend(folder_objects(tree, cfg, folder_path));
                for module in cfg.logic_modules() {
                    objects.extend(folder_objects(tree, cfg, &ProjectLayout::module_path(module)));
                }
            }
        }

        let mut libraries = Vec::new();
        for library in rule.libraries {
            match library {
                RoleLibrary::Glob => libraries.extend(artifact_path(layout, toolchain, &FolderRole::Glob)),
                RoleLibrary::Server => libraries.extend(artifact_path(layout, toolchain, &FolderRole::Server)),
                RoleLibrary::Client => libraries.extend(artifact_path(layout, toolchain, &FolderRole::Client)),
                RoleLibrary::LogicDependencies => {
                    if let FolderRole::Logic(name) = &role {
                        for dep in transitive_logic_dependencies(cfg, name) {
                            libraries.extend(artifact_path(layout, toolchain, &FolderRole::Logic(dep)));
                        }
                    }
                }
            }
        }

        let command = match &target {
            Some(target) if !(objects.is_empty() && libraries.is_empty()) => {
                let inputs: Vec<PathBuf> = objects.iter().chain(&libraries).cloned().collect();
                toolchain.link_command(rule.link, target, &inputs, toolchain.libs_for(rule.libs_key))
            }
            _ => String::new(),
        };

        Self {
            folder: folder_path.to_string(),
            role,
            target: if rule.link == LinkStyle::None { None } else { target },
            objects,
            libraries,
            command,
            aggregation: rule.aggregation,
        }
    }

    /// Output artifact, if this folder links at all.
    pub fn link_target(&self) -> Option<&Path> {
        self.target.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }

    /// Target missing, or (aggregation roles) any input newer than it.
    pub fn requires_link(&self, fs: &dyn FileSystem) -> bool {
        let Some(target) = &self.target else {
            return false;
        };
        if !fs.exists(target) {
            return true;
        }
        self.aggregation
            && self
                .objects
                .iter()
                .chain(&self.libraries)
                .any(|input| is_newer_than(fs, input, target))
    }
}

/// Where a role's link artifact lives. Executables go to the shared binary
/// directory, libraries next to their sources.
pub fn artifact_path(layout: &ProjectLayout, toolchain: &Toolchain, role: &FolderRole) -> Option<PathBuf> {
    let stem = role.artifact_stem()?;
    let rule = role.rule(&layout.generated);
    let name = toolchain.artifact_name(rule.link, stem)?;

    let dir = match role {
        FolderRole::ServerExe | FolderRole::ClientExe => layout.bin_dir.clone(),
        FolderRole::Glob => layout.physical_of(GLOB)?,
        FolderRole::Server => layout.physical_of(SERVER)?,
        FolderRole::Client => layout.physical_of(CLIENT)?,
        FolderRole::Logic(module) => layout.physical_of(&ProjectLayout::module_path(module))?,
        FolderRole::Generated { .. } | FolderRole::Plain => return None,
    };
    Some(dir.join(name))
}

/// Objects of the buildable, non-excluded files in a folder and its generated
/// subfolder.
fn folder_objects(tree: &SourceTree, cfg: &dyn ConfigProvider, folder_path: &str) -> Vec<PathBuf> {
    let generated_path = tree.layout().generated_path(folder_path);
    [folder_path, generated_path.as_str()]
        .into_iter()
        .filter_map(|path| tree.find_path(path).map(|id| (path, id)))
        .flat_map(|(path, id)| {
            tree.folder(id)
                .files()
                .iter()
                .map(move |f| (path, *f))
        })
        .filter(|(path, f)| {
            let name = tree.file(*f).name();
            is_buildable(name) && !cfg.is_excluded(path, name)
        })
        .map(|(_, f)| tree.object_path(f).to_path_buf())
        .collect()
}
