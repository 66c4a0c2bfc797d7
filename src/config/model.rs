// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::tasks::toolchain::Toolchain;
use crate::types::Platform;

/// Top-level configuration as read from `hbuild.toml`.
///
/// ```toml
/// [project]
/// root = "."
/// application_modules = ["portal"]
///
/// [[logic]]
/// name = "accounts"
/// depends_on = ["common"]
///
/// [[install]]
/// source = "bin"
/// pattern = "*.so"
/// target = "dist/lib"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawBuildConfig {
    #[serde(default)]
    pub project: ProjectSection,

    #[serde(default)]
    pub workers: WorkersSection,

    #[serde(default)]
    pub toolchain: ToolchainSection,

    /// Logic modules, in declaration order.
    #[serde(default)]
    pub logic: Vec<LogicModuleConfig>,

    /// Folder/file pairs that are never compiled.
    #[serde(default)]
    pub exclude: Vec<ExcludeRule>,

    #[serde(default)]
    pub generate: GenerateSection,

    #[serde(default)]
    pub install: Vec<InstallRule>,

    #[serde(default)]
    pub deploy: Vec<InstallRule>,

    #[serde(default)]
    pub depcache: DepCacheSection,
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Project root. Relative paths are resolved against the config file's
    /// directory by the loader.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Take `glob` from `core_folder` instead of the project.
    #[serde(default)]
    pub use_modular_core: bool,

    #[serde(default)]
    pub core_folder: Option<PathBuf>,

    /// Shared binary output directory (executables).
    #[serde(default = "default_bin_dir")]
    pub bin_dir: PathBuf,

    /// Applications that receive generated JavaScript.
    #[serde(default)]
    pub application_modules: Vec<String>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_bin_dir() -> PathBuf {
    PathBuf::from("bin")
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            use_modular_core: false,
            core_folder: None,
            bin_dir: default_bin_dir(),
            application_modules: Vec::new(),
        }
    }
}

/// `[workers]` section: pool sizes.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WorkersSection {
    #[serde(default = "default_compile_workers")]
    pub compile: usize,
    #[serde(default = "default_generate_workers")]
    pub generate: usize,
}

fn default_compile_workers() -> usize {
    10
}

fn default_generate_workers() -> usize {
    5
}

impl Default for WorkersSection {
    fn default() -> Self {
        Self {
            compile: default_compile_workers(),
            generate: default_generate_workers(),
        }
    }
}

/// `[toolchain]` section. Every field falls back to a platform default.
///
/// Templates use `{name}` placeholders:
/// - `compile`: `{includes}`, `{source}`, `{object}`
/// - `include_flag`: `{dir}`
/// - `static_link` / `shared_link` / `exe_link`: `{target}`, `{objects}`, `{libs}`
/// - `static_lib` / `shared_lib` / `executable`: `{name}`
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolchainSection {
    #[serde(default)]
    pub compile: Option<String>,
    #[serde(default)]
    pub include_flag: Option<String>,
    #[serde(default)]
    pub static_link: Option<String>,
    #[serde(default)]
    pub shared_link: Option<String>,
    #[serde(default)]
    pub exe_link: Option<String>,
    #[serde(default)]
    pub object_suffix: Option<String>,
    #[serde(default)]
    pub static_lib: Option<String>,
    #[serde(default)]
    pub shared_lib: Option<String>,
    #[serde(default)]
    pub executable: Option<String>,

    /// Third-party libraries per folder role (`glob`, `server`, `client`,
    /// `logic`, `server-exe`, `client-exe`).
    #[serde(default)]
    pub libs: BTreeMap<String, Vec<String>>,
}

/// `[[logic]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct LogicModuleConfig {
    pub name: String,

    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Repository holding `logic/<name>`, relative to the project root.
    #[serde(default)]
    pub repo: Option<PathBuf>,
}

/// `[[exclude]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ExcludeRule {
    pub folder: String,
    pub file: String,
}

/// `[generate]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateSection {
    /// Generator command; `{lang}`, `{app}` and `{schema}` are substituted.
    #[serde(default)]
    pub command: Option<String>,

    /// Sanity-check command; `{schema}` is substituted. When absent the
    /// built-in parameter consistency check is used.
    #[serde(default)]
    pub check_command: Option<String>,

    #[serde(default)]
    pub csharp_dir: Option<PathBuf>,

    /// JavaScript output directory; `{app}` is substituted per application.
    #[serde(default)]
    pub js_dir: Option<String>,

    /// Command run after the build when generated C#/JS output changed.
    #[serde(default)]
    pub secondary_build: Option<String>,

    #[serde(default = "default_schema_suffix")]
    pub schema_suffix: String,

    #[serde(default = "default_generated_folder")]
    pub folder: String,
}

fn default_schema_suffix() -> String {
    ".sql.xml".to_string()
}

fn default_generated_folder() -> String {
    "sqldo".to_string()
}

impl Default for GenerateSection {
    fn default() -> Self {
        Self {
            command: None,
            check_command: None,
            csharp_dir: None,
            js_dir: None,
            secondary_build: None,
            schema_suffix: default_schema_suffix(),
            folder: default_generated_folder(),
        }
    }
}

/// `[[install]]` / `[[deploy]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct InstallRule {
    /// Source folder, relative to the project root.
    pub source: PathBuf,

    /// Glob matched against file names; `None` mirrors the whole folder.
    #[serde(default)]
    pub pattern: Option<String>,

    /// Target folder, relative to the project root.
    pub target: PathBuf,

    /// New file name for the (single) matched file.
    #[serde(default)]
    pub rename: Option<String>,

    /// Only run on this platform.
    #[serde(default)]
    pub platform: Option<Platform>,
}

/// `[depcache]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DepCacheSection {
    #[serde(default)]
    pub enabled: bool,

    /// Cache file, relative to the project root.
    #[serde(default = "default_depcache_path")]
    pub path: PathBuf,
}

fn default_depcache_path() -> PathBuf {
    PathBuf::from(".hbuild/depcache")
}

impl Default for DepCacheSection {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_depcache_path(),
        }
    }
}

/// Validated configuration.
///
/// Only constructed through `TryFrom<RawBuildConfig>`, which checks the
/// logic-module graph and the install rules.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub(crate) project: ProjectSection,
    pub(crate) workers: WorkersSection,
    pub(crate) toolchain: Toolchain,
    pub(crate) logic: Vec<LogicModuleConfig>,
    /// Logic module names, dependencies before dependents.
    pub(crate) module_order: Vec<String>,
    pub(crate) exclude: Vec<ExcludeRule>,
    pub(crate) generate: GenerateSection,
    pub(crate) install: Vec<InstallRule>,
    pub(crate) deploy: Vec<InstallRule>,
    pub(crate) depcache: DepCacheSection,
}

impl BuildConfig {
    pub(crate) fn new_unchecked(raw: RawBuildConfig, module_order: Vec<String>) -> Self {
        let toolchain = Toolchain::from_section(&raw.toolchain, Platform::current());
        Self {
            project: raw.project,
            workers: raw.workers,
            toolchain,
            logic: raw.logic,
            module_order,
            exclude: raw.exclude,
            generate: raw.generate,
            install: raw.install,
            deploy: raw.deploy,
            depcache: raw.depcache,
        }
    }

    /// Replace the resolved toolchain (tests pin a platform this way).
    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }
}
