// src/build/orchestrator.rs

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::build::summary::RunSummary;
use crate::config::{ConfigProvider, InstallRule};
use crate::errors::{HbuildError, Result};
use crate::fs::FileSystem;
use crate::sched::process::run_shell;
use crate::sched::{BuildSignals, LinkOutcome, TaskExecutor, TaskScheduler};
use crate::tasks::roles::{CLIENT, CLIENT_EXE, FolderRole, GLOB, SERVER, SERVER_EXE};
use crate::tasks::{CompileTask, GenerateTask, InstallTask, LinkTask, Task};
use crate::tree::load::is_buildable;
use crate::tree::{DependencyCache, FileId, FolderId, ProjectLayout, SourceTree};

/// Extensions of compiler/linker output removed by `clean`.
pub const ARTIFACT_EXTENSIONS: &[&str] = &["o", "obj", "a", "lib", "so", "dll", "pdb", "exp", "ilk"];

/// Stale work for one target, as reported by `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetStatus {
    pub target: String,
    /// `folder/file` labels of sources needing a compile.
    pub stale: Vec<String>,
    pub relink: bool,
    /// The target folder does not exist in the tree.
    pub missing: bool,
}

/// Drives one build run: staleness decisions, task submission, barriers.
pub struct BuildOrchestrator {
    cfg: Arc<dyn ConfigProvider>,
    fs: Arc<dyn FileSystem>,
    tree: SourceTree,
    scheduler: TaskScheduler,
    installed: usize,
    aborted: bool,
    started: Instant,
}

impl std::fmt::Debug for BuildOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildOrchestrator")
            .field("root", &self.cfg.project_root())
            .field("files", &self.tree.file_count())
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl BuildOrchestrator {
    /// Scan the source tree and start the worker pools.
    pub fn new(
        cfg: Arc<dyn ConfigProvider>,
        fs: Arc<dyn FileSystem>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<Self> {
        let layout = ProjectLayout::from_config(cfg.as_ref());
        let mut tree = SourceTree::new(Arc::clone(&fs), layout, &cfg.toolchain().object_suffix);
        tree.load()?;

        let depcache = cfg.depcache();
        if depcache.enabled {
            let path = cfg.project_root().join(&depcache.path);
            tree.enable_depcache(DependencyCache::load(fs.as_ref(), &path));
        }

        let scheduler = TaskScheduler::start(executor, cfg.workers(), Arc::new(BuildSignals::default()));

        Ok(Self {
            cfg,
            fs,
            tree,
            scheduler,
            installed: 0,
            aborted: false,
            started: Instant::now(),
        })
    }

    pub fn tree(&self) -> &SourceTree {
        &self.tree
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn has_error(&self) -> bool {
        self.scheduler.has_error()
    }

    /// Record an error that escaped a step, for the summary.
    pub fn mark_aborted(&mut self) {
        self.aborted = true;
    }

    fn generated_name(&self) -> &str {
        &self.tree.layout().generated
    }

    /// Targets built by a full run, in order.
    pub fn default_targets(&self) -> Vec<String> {
        let mut targets = vec![GLOB.to_string(), CLIENT.to_string()];
        targets.extend(
            self.cfg
                .logic_modules()
                .iter()
                .map(|m| ProjectLayout::module_path(m)),
        );
        targets.extend([SERVER, SERVER_EXE, CLIENT_EXE].map(str::to_string));
        targets
    }

    /// Compile what is stale in `folder_path` (and its generated subfolder),
    /// then link if anything was compiled or the link target is stale.
    pub async fn build(&self, folder_path: &str) -> Result<()> {
        let role = FolderRole::classify(folder_path, self.generated_name());
        if role.is_executable() {
            let task = LinkTask::new(&self.tree, self.cfg.as_ref(), folder_path);
            if task.requires_link(self.fs.as_ref()) {
                self.link(task).await?;
            } else {
                debug!(target = %folder_path, "executable up to date");
            }
            return Ok(());
        }

        let Some(folder) = self.tree.find_path(folder_path) else {
            warn!(error = %HbuildError::PathNotFound(folder_path.to_string()), "skipping build");
            return Ok(());
        };

        let mut relink = self.enqueue_stale(folder)?;
        let generated = self.tree.layout().generated_path(folder_path);
        if let Some(generated) = self.tree.find_path(&generated) {
            relink |= self.enqueue_stale(generated)?;
        }

        let task = LinkTask::new(&self.tree, self.cfg.as_ref(), folder_path);
        if relink || task.requires_link(self.fs.as_ref()) {
            self.link(task).await?;
        } else {
            debug!(target = %folder_path, "nothing to do");
        }
        Ok(())
    }

    fn stale_files(&self, folder: FolderId) -> impl Iterator<Item = FileId> + '_ {
        let path = self.tree.folder(folder).path();
        self.tree
            .folder(folder)
            .files()
            .iter()
            .copied()
            .filter(move |f| {
                let name = self.tree.file(*f).name();
                is_buildable(name) && !self.cfg.is_excluded(path, name)
            })
            .filter(move |f| self.tree.needs_rebuild(*f))
    }

    /// Queue a compile for every stale source of one folder.
    fn enqueue_stale(&self, folder: FolderId) -> Result<bool> {
        let mut queued = false;
        for file in self.stale_files(folder) {
            self.scheduler
                .add_compile(CompileTask::new(&self.tree, self.cfg.as_ref(), file))?;
            queued = true;
        }
        Ok(queued)
    }

    async fn link(&self, task: LinkTask) -> Result<()> {
        let folder = task.folder.clone();
        match self.scheduler.add_link(task).await? {
            LinkOutcome::Linked => {}
            LinkOutcome::NothingToLink => debug!(target = %folder, "no inputs to link"),
            LinkOutcome::Skipped => debug!(target = %folder, "link skipped"),
        }
        Ok(())
    }

    /// Remove derived objects and link artifacts. Returns the number of files
    /// removed.
    pub fn clean(&self, folder_path: &str) -> Result<usize> {
        let role = FolderRole::classify(folder_path, self.generated_name());
        if role.is_executable() {
            let bin = self.cfg.bin_dir();
            let removed = self.remove_matching(&bin, |_| true)?;
            info!(target = %folder_path, removed, "cleaned binary directory");
            return Ok(removed);
        }

        let Some(folder) = self.tree.find_path(folder_path) else {
            warn!(error = %HbuildError::PathNotFound(folder_path.to_string()), "skipping clean");
            return Ok(0);
        };

        let mut folders = vec![folder];
        let generated = self.tree.layout().generated_path(folder_path);
        folders.extend(self.tree.find_path(&generated));

        let mut removed = 0;
        for id in &folders {
            for file in self.tree.folder(*id).files() {
                if !is_buildable(self.tree.file(*file).name()) {
                    continue;
                }
                let object = self.tree.object_path(*file);
                if self.fs.exists(object) {
                    self.fs.remove_file(object)?;
                    removed += 1;
                }
            }
            let physical = self.tree.folder(*id).physical().to_path_buf();
            removed += self.remove_matching(&physical, |name| {
                name.rsplit_once('.')
                    .is_some_and(|(_, ext)| ARTIFACT_EXTENSIONS.contains(&ext))
            })?;
        }

        let task = LinkTask::new(&self.tree, self.cfg.as_ref(), folder_path);
        if let Some(target) = task.link_target() {
            if self.fs.exists(target) {
                self.fs.remove_file(target)?;
                removed += 1;
            }
        }

        info!(target = %folder_path, removed, "cleaned");
        Ok(removed)
    }

    fn remove_matching(&self, dir: &Path, keep: impl Fn(&str) -> bool) -> Result<usize> {
        if !self.fs.is_dir(dir) {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in self.fs.read_dir(dir)? {
            let matches = entry
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(&keep);
            if matches && self.fs.is_file(&entry) {
                self.fs.remove_file(&entry)?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Generate every stale schema file, wait for the generators and pick up
    /// their output in the tree.
    pub async fn generate_sqldo(&mut self, force: bool) -> Result<usize> {
        let suffix = self.tree.layout().schema_suffix.clone();
        let generated_name = self.generated_name().to_string();
        let schemas = self.tree.find_files_by_type(&suffix);

        let mut current: Option<(FolderId, FolderId)> = None;
        let mut touched = Vec::new();
        let mut queued = 0;

        for schema in schemas {
            let folder = self.tree.file(schema).folder();
            let generated = match current {
                Some((owner, generated)) if owner == folder => generated,
                _ => {
                    let generated = self.tree.ensure_child_folder(folder, &generated_name);
                    touched.push(generated);
                    current = Some((folder, generated));
                    generated
                }
            };

            let file = self.tree.file(schema);
            let task = GenerateTask::new(
                self.cfg.as_ref(),
                self.tree.folder(folder).path(),
                file.name(),
                file.physical().to_path_buf(),
                self.tree.folder(generated).physical().to_path_buf(),
            );
            if task.is_stale(self.fs.as_ref(), force) {
                self.scheduler.add_generate(task)?;
                queued += 1;
            }
        }

        if queued == 0 {
            debug!("generated code up to date");
            return Ok(0);
        }

        self.scheduler.wait_for_generators().await;
        for folder in touched {
            self.tree.rescan_folder(folder)?;
        }
        info!(queued, "schema generation finished");
        Ok(queued)
    }

    pub async fn install(&mut self) -> Result<usize> {
        let rules = self.cfg.install_rules().to_vec();
        self.copy_rules("install", &rules).await
    }

    pub async fn deploy(&mut self) -> Result<usize> {
        let rules = self.cfg.deploy_rules().to_vec();
        self.copy_rules("deploy", &rules).await
    }

    async fn copy_rules(&mut self, what: &str, rules: &[InstallRule]) -> Result<usize> {
        let mut copied = 0;
        for rule in rules {
            let task = InstallTask::from_rule(rule, self.cfg.project_root());
            copied += self.scheduler.run_inline(Task::Install(task)).await?.files;
        }
        self.installed += copied;
        info!(rules = rules.len(), copied, "{what} finished");
        Ok(copied)
    }

    /// Full pipeline: generation, then every target in order, then the
    /// secondary-language build when generated output changed.
    ///
    /// Once any task has failed the remaining targets are skipped; work that
    /// is already queued still runs.
    pub async fn run(&mut self, targets: &[String]) -> Result<()> {
        self.generate_sqldo(false).await?;

        let targets = if targets.is_empty() {
            self.default_targets()
        } else {
            targets.to_vec()
        };

        for (index, target) in targets.iter().enumerate() {
            if self.has_error() {
                warn!(skipped = ?&targets[index..], "errors reported; skipping remaining targets");
                break;
            }
            if let Err(err) = self.build(target).await {
                if !self.has_error() {
                    return Err(err);
                }
            }
        }

        self.scheduler.wait_for_compiles().await;

        if self.has_error() {
            return Ok(());
        }
        if let Some(command) = &self.cfg.generate().secondary_build {
            if self.scheduler.signals().secondary_rebuild_required() {
                info!("generated output changed; running secondary build");
                run_shell("secondary-build", command).await?;
            }
        }
        Ok(())
    }

    /// What `build` would do for each target, without doing it.
    pub fn status(&self, targets: &[String]) -> Vec<TargetStatus> {
        let targets = if targets.is_empty() {
            self.default_targets()
        } else {
            targets.to_vec()
        };

        targets
            .into_iter()
            .map(|target| {
                let link = LinkTask::new(&self.tree, self.cfg.as_ref(), &target);
                let relink = link.requires_link(self.fs.as_ref());
                if FolderRole::classify(&target, self.generated_name()).is_executable() {
                    return TargetStatus {
                        target,
                        stale: Vec::new(),
                        relink,
                        missing: false,
                    };
                }

                let Some(folder) = self.tree.find_path(&target) else {
                    return TargetStatus {
                        target,
                        stale: Vec::new(),
                        relink: false,
                        missing: true,
                    };
                };
                let generated = self.tree.layout().generated_path(&target);
                let folders = std::iter::once(folder).chain(self.tree.find_path(&generated));
                let stale: Vec<String> = folders
                    .flat_map(|f| self.stale_files(f).collect::<Vec<_>>())
                    .map(|f| format!("{}/{}", self.tree.folder_path_of(f), self.tree.file(f).name()))
                    .collect();
                let relink = relink || !stale.is_empty();
                TargetStatus {
                    target,
                    stale,
                    relink,
                    missing: false,
                }
            })
            .collect()
    }

    /// Stop the workers, persist the dependency cache and summarize the run.
    pub async fn finish(self) -> Result<RunSummary> {
        self.scheduler.shutdown().await;
        self.tree.save_depcache()?;
        Ok(RunSummary {
            stats: self.scheduler.stats(),
            installed: self.installed,
            aborted: self.aborted,
            elapsed: self.started.elapsed(),
        })
    }
}
