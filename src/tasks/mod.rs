// src/tasks/mod.rs

//! Units of work handed to the scheduler.
//!
//! - [`compile`]: one compiler invocation per source file.
//! - [`link`]: one archive/link per folder role or executable pseudo-target.
//! - [`generate`]: schema to per-language sources.
//! - [`install`]: artifact copies for `[[install]]` / `[[deploy]]`.
//! - [`roles`] and [`toolchain`] hold the rule table and command templates
//!   the task constructors read.

pub mod compile;
pub mod generate;
pub mod install;
pub mod link;
pub mod roles;
pub mod toolchain;

pub use compile::CompileTask;
pub use generate::GenerateTask;
pub use install::InstallTask;
pub use link::LinkTask;

use crate::types::TaskKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Compile(CompileTask),
    Link(LinkTask),
    Generate(GenerateTask),
    Install(InstallTask),
}

impl Task {
    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Compile(_) => TaskKind::Compile,
            Task::Link(_) => TaskKind::Link,
            Task::Generate(_) => TaskKind::Generate,
            Task::Install(_) => TaskKind::Install,
        }
    }

    /// Short human-readable name used in logs.
    pub fn label(&self) -> String {
        match self {
            Task::Compile(t) => t.label(),
            Task::Link(t) => t.folder.clone(),
            Task::Generate(t) => t.label(),
            Task::Install(t) => t.label(),
        }
    }

    /// Shell command, for the kinds that run one.
    pub fn command(&self) -> Option<&str> {
        match self {
            Task::Compile(t) => Some(&t.command),
            Task::Link(t) => Some(&t.command),
            Task::Generate(_) | Task::Install(_) => None,
        }
    }
}
