// src/sched/executor.rs

//! Pluggable task execution.
//!
//! Workers and inline links hand every [`Task`] to a [`TaskExecutor`].
//! [`ProcessExecutor`] runs the real tools; tests substitute an executor that
//! records tasks and fakes their outputs.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::codegen::CodeGenerator;
use crate::errors::{HbuildError, Result};
use crate::fs::FileSystem;
use crate::sched::process::run_shell;
use crate::tasks::Task;
use crate::types::Platform;

pub type TaskFuture<'a> = Pin<Box<dyn Future<Output = Result<TaskReport>> + Send + 'a>>;

/// What an executed task produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Files written or copied.
    pub files: usize,
}

impl TaskReport {
    pub fn files(files: usize) -> Self {
        Self { files }
    }
}

pub trait TaskExecutor: Send + Sync {
    /// Run one task to completion. A nonzero tool exit is an error.
    fn execute<'a>(&'a self, task: &'a Task) -> TaskFuture<'a>;
}

/// Production executor: shells out for compile/link, calls the code
/// generator for generate tasks and copies files for install tasks.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    fs: Arc<dyn FileSystem>,
    generator: Arc<dyn CodeGenerator>,
    platform: Platform,
}

impl ProcessExecutor {
    pub fn new(fs: Arc<dyn FileSystem>, generator: Arc<dyn CodeGenerator>, platform: Platform) -> Self {
        Self {
            fs,
            generator,
            platform,
        }
    }
}

fn join_error(err: tokio::task::JoinError) -> HbuildError {
    HbuildError::Other(anyhow::Error::new(err).context("blocking task panicked"))
}

impl TaskExecutor for ProcessExecutor {
    fn execute<'a>(&'a self, task: &'a Task) -> TaskFuture<'a> {
        Box::pin(async move {
            match task {
                Task::Compile(t) => {
                    if let Some(parent) = t.object.parent() {
                        self.fs.create_dir_all(parent)?;
                    }
                    run_shell(&t.label(), &t.command).await?;
                    Ok(TaskReport::files(1))
                }
                Task::Link(t) => {
                    if let Some(parent) = t.link_target().and_then(|p| p.parent()) {
                        self.fs.create_dir_all(parent)?;
                    }
                    run_shell(&t.folder, &t.command).await?;
                    Ok(TaskReport::files(1))
                }
                Task::Generate(t) => {
                    let (t, fs, generator) = (t.clone(), self.fs.clone(), self.generator.clone());
                    let written = tokio::task::spawn_blocking(move || {
                        t.execute(fs.as_ref(), generator.as_ref())
                    })
                    .await
                    .map_err(join_error)??;
                    Ok(TaskReport::files(written))
                }
                Task::Install(t) => {
                    let (t, fs, platform) = (t.clone(), self.fs.clone(), self.platform);
                    let copied = tokio::task::spawn_blocking(move || t.execute(fs.as_ref(), platform))
                        .await
                        .map_err(join_error)??;
                    Ok(TaskReport::files(copied))
                }
            }
        })
    }
}
