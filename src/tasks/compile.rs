// src/tasks/compile.rs

use std::path::PathBuf;

use crate::config::{ConfigProvider, transitive_logic_dependencies};
use crate::tasks::roles::{FolderRole, GLOB, IncludeSource};
use crate::tree::{FileId, ProjectLayout, SourceTree};

/// One compiler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileTask {
    /// Logical folder path of the source.
    pub folder: String,
    pub file: String,
    pub source: PathBuf,
    pub object: PathBuf,
    /// Rendered command line; empty when the pair is excluded.
    pub command: String,
}

impl CompileTask {
    pub fn new(tree: &SourceTree, cfg: &dyn ConfigProvider, id: FileId) -> Self {
        let file = tree.file(id);
        let folder = tree.folder_path_of(id).to_string();
        let source = file.physical().to_path_buf();
        let object = file.object().to_path_buf();

        let command = if cfg.is_excluded(&folder, file.name()) {
            String::new()
        } else {
            let includes = include_dirs(tree.layout(), cfg, &folder);
            cfg.toolchain().compile_command(&source, &object, &includes)
        };

        Self {
            folder,
            file: file.name().to_string(),
            source,
            object,
            command,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.folder, self.file)
    }
}

/// Physical include directories for sources in `folder_path`, derived from
/// the folder's role rule. Order is preserved, duplicates dropped.
pub fn include_dirs(layout: &ProjectLayout, cfg: &dyn ConfigProvider, folder_path: &str) -> Vec<PathBuf> {
    let generated = layout.generated.as_str();
    let role = FolderRole::classify(folder_path, generated);
    let owner = match &role {
        FolderRole::Generated { owner } => owner.clone(),
        _ => folder_path.to_string(),
    };
    let owner_role = FolderRole::classify(&owner, generated);

    let mut logical: Vec<String> = Vec::new();
    let with_generated = |list: &mut Vec<String>, path: String| {
        let generated_dir = layout.generated_path(&path);
        list.push(path);
        list.push(generated_dir);
    };

    for source in role.rule(generated).includes {
        match source {
            IncludeSource::Own => logical.push(owner.clone()),
            IncludeSource::Generated => logical.push(layout.generated_path(&owner)),
            IncludeSource::Glob => with_generated(&mut logical, GLOB.to_string()),
            IncludeSource::LogicDependencies => {
                if let FolderRole::Logic(name) = &owner_role {
                    for dep in transitive_logic_dependencies(cfg, name) {
                        with_generated(&mut logical, ProjectLayout::module_path(&dep));
                    }
                }
            }
            IncludeSource::AllLogic => {
                for module in cfg.logic_modules() {
                    with_generated(&mut logical, ProjectLayout::module_path(module));
                }
            }
        }
    }

    let mut dirs: Vec<PathBuf> = Vec::new();
    for path in logical {
        if let Some(physical) = layout.physical_of(&path) {
            if !dirs.contains(&physical) {
                dirs.push(physical);
            }
        }
    }
    dirs
}
