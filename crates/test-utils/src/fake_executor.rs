use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hbuild::codegen::{CodeGenerator, GeneratedOutput, SchemaSource};
use hbuild::errors::{HbuildError, Result};
use hbuild::fs::FileSystem;
use hbuild::fs::mock::MockFileSystem;
use hbuild::sched::{TaskExecutor, TaskFuture, TaskReport};
use hbuild::tasks::Task;
use hbuild::types::{Platform, TaskKind};

/// One task the fake executor was asked to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedTask {
    pub kind: TaskKind,
    pub label: String,
}

/// Generator that echoes the schema text into every output.
#[derive(Debug, Clone, Default)]
pub struct FakeGenerator;

impl CodeGenerator for FakeGenerator {
    fn generate(&self, schema: &SchemaSource, apps: &[String]) -> Result<GeneratedOutput> {
        let origin = schema.path.display();
        Ok(GeneratedOutput {
            header: format!("// header from {origin}\n{}", schema.text),
            body: format!("// body from {origin}\n{}", schema.text),
            csharp: Some(format!("// C# from {origin}\n{}", schema.text)),
            js: apps
                .iter()
                .map(|app| (app.clone(), format!("// {app} from {origin}\n{}", schema.text)))
                .collect(),
        })
    }
}

/// Executor that records every task and fakes its outputs in a
/// [`MockFileSystem`] instead of running tools.
///
/// - compile writes the object file
/// - link writes the link target
/// - generate and install run for real against the mock filesystem
///
/// Tasks whose label was registered with [`FakeExecutor::fail_on`] fail with
/// an external-tool error and produce nothing.
#[derive(Debug, Clone)]
pub struct FakeExecutor {
    fs: MockFileSystem,
    executed: Arc<Mutex<Vec<ExecutedTask>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delay: Option<Duration>,
    platform: Platform,
}

impl FakeExecutor {
    pub fn new(fs: MockFileSystem) -> Self {
        Self {
            fs,
            executed: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
            delay: None,
            platform: Platform::Linux,
        }
    }

    /// Make the task with this label fail.
    pub fn fail_on(&self, label: &str) {
        self.failing.lock().unwrap().insert(label.to_string());
    }

    /// Sleep this long before every task.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn executed(&self) -> Vec<ExecutedTask> {
        self.executed.lock().unwrap().clone()
    }

    pub fn labels(&self, kind: TaskKind) -> Vec<String> {
        let mut labels: Vec<String> = self
            .executed()
            .into_iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.label)
            .collect();
        labels.sort();
        labels
    }

    pub fn count(&self, kind: TaskKind) -> usize {
        self.executed().iter().filter(|t| t.kind == kind).count()
    }

    pub fn clear(&self) {
        self.executed.lock().unwrap().clear();
    }

    fn should_fail(&self, label: &str) -> bool {
        self.failing.lock().unwrap().contains(label)
    }
}

impl TaskExecutor for FakeExecutor {
    fn execute<'a>(&'a self, task: &'a Task) -> TaskFuture<'a> {
        Box::pin(async move {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let label = task.label();
            self.executed.lock().unwrap().push(ExecutedTask {
                kind: task.kind(),
                label: label.clone(),
            });

            if self.should_fail(&label) {
                return Err(HbuildError::ExternalTool {
                    command: task.command().unwrap_or(&label).to_string(),
                    code: 1,
                });
            }

            match task {
                Task::Compile(t) => {
                    self.fs.write(&t.object, b"object")?;
                    Ok(TaskReport::files(1))
                }
                Task::Link(t) => match t.link_target() {
                    Some(target) => {
                        self.fs.write(target, b"artifact")?;
                        Ok(TaskReport::files(1))
                    }
                    None => Ok(TaskReport::default()),
                },
                Task::Generate(t) => Ok(TaskReport::files(t.execute(&self.fs, &FakeGenerator)?)),
                Task::Install(t) => Ok(TaskReport::files(t.execute(&self.fs, self.platform)?)),
            }
        })
    }
}
