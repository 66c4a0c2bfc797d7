// src/sched/scheduler.rs

//! Compile and generate worker pools with drain barriers.
//!
//! Each pool is a fixed set of tokio tasks sharing one mpsc receiver. Queue
//! depth, busy workers and failures are tracked with atomics so the
//! orchestrator can wait for a pool to drain ([`TaskScheduler::wait_for_compiles`],
//! [`TaskScheduler::wait_for_generators`]) without polling. Workers stop taking
//! work as soon as any failure has been recorded; running tasks are never
//! interrupted.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::WorkersSection;
use crate::errors::{HbuildError, Result};
use crate::sched::executor::{TaskExecutor, TaskReport};
use crate::tasks::{CompileTask, GenerateTask, LinkTask, Task};
use crate::types::TaskKind;

/// Process-wide signals raised by tasks.
#[derive(Debug, Default)]
pub struct BuildSignals {
    secondary_rebuild: AtomicBool,
}

impl BuildSignals {
    pub fn raise_secondary_rebuild(&self) {
        self.secondary_rebuild.store(true, Ordering::SeqCst);
    }

    /// Generated C#/JS output may have changed since the last build.
    pub fn secondary_rebuild_required(&self) -> bool {
        self.secondary_rebuild.load(Ordering::SeqCst)
    }
}

/// Result of [`TaskScheduler::add_link`] when no error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The task had no command.
    NothingToLink,
    /// A compile failed earlier in the run; the link did not execute.
    Skipped,
    Linked,
}

#[derive(Debug, Default)]
struct PoolCounters {
    queued: AtomicUsize,
    busy: AtomicUsize,
    errors: AtomicUsize,
    completed: AtomicUsize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pool {
    Compile,
    Generate,
}

/// Shared counters and flags.
#[derive(Debug, Default)]
pub struct SchedulerState {
    compile: PoolCounters,
    generate: PoolCounters,
    links: AtomicUsize,
    link_errors: AtomicUsize,
    generated_files: AtomicUsize,
    finished: AtomicBool,
    changed: Notify,
}

impl SchedulerState {
    fn pool(&self, pool: Pool) -> &PoolCounters {
        match pool {
            Pool::Compile => &self.compile,
            Pool::Generate => &self.generate,
        }
    }

    pub fn has_error(&self) -> bool {
        self.compile.errors.load(Ordering::SeqCst) > 0
            || self.generate.errors.load(Ordering::SeqCst) > 0
            || self.link_errors.load(Ordering::SeqCst) > 0
    }

    fn drained(&self, pool: Pool) -> bool {
        let counters = self.pool(pool);
        counters.busy.load(Ordering::SeqCst) == 0
            && (counters.queued.load(Ordering::SeqCst) == 0 || self.has_error())
    }
}

/// Counts for the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub compiled: usize,
    pub compile_errors: usize,
    pub generated: usize,
    pub generated_files: usize,
    pub generate_errors: usize,
    pub linked: usize,
    pub link_errors: usize,
}

pub struct TaskScheduler {
    state: Arc<SchedulerState>,
    signals: Arc<BuildSignals>,
    executor: Arc<dyn TaskExecutor>,
    compile_tx: Mutex<Option<mpsc::UnboundedSender<Task>>>,
    generate_tx: Mutex<Option<mpsc::UnboundedSender<Task>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("state", &self.state)
            .field("signals", &self.signals)
            .finish_non_exhaustive()
    }
}

impl TaskScheduler {
    /// Spawn both worker pools. Must be called from within a tokio runtime.
    pub fn start(
        executor: Arc<dyn TaskExecutor>,
        workers: WorkersSection,
        signals: Arc<BuildSignals>,
    ) -> Self {
        let state = Arc::new(SchedulerState::default());
        let mut handles = Vec::with_capacity(workers.compile + workers.generate);

        let (compile_tx, compile_rx) = mpsc::unbounded_channel();
        let (generate_tx, generate_rx) = mpsc::unbounded_channel();
        let compile_rx = Arc::new(AsyncMutex::new(compile_rx));
        let generate_rx = Arc::new(AsyncMutex::new(generate_rx));

        for (pool, rx, count) in [
            (Pool::Compile, &compile_rx, workers.compile.max(1)),
            (Pool::Generate, &generate_rx, workers.generate.max(1)),
        ] {
            for id in 0..count {
                handles.push(tokio::spawn(worker_loop(
                    id,
                    pool,
                    Arc::clone(rx),
                    Arc::clone(&state),
                    Arc::clone(&signals),
                    Arc::clone(&executor),
                )));
            }
        }

        info!(
            compile_workers = workers.compile,
            generate_workers = workers.generate,
            "scheduler started"
        );

        Self {
            state,
            signals,
            executor,
            compile_tx: Mutex::new(Some(compile_tx)),
            generate_tx: Mutex::new(Some(generate_tx)),
            workers: Mutex::new(handles),
        }
    }

    pub fn signals(&self) -> &Arc<BuildSignals> {
        &self.signals
    }

    /// Queue a compile. Tasks with an empty command are dropped.
    pub fn add_compile(&self, task: CompileTask) -> Result<()> {
        if task.is_empty() {
            debug!(task = %task.label(), "excluded from compilation");
            return Ok(());
        }
        self.enqueue(Pool::Compile, Task::Compile(task))
    }

    pub fn add_generate(&self, task: GenerateTask) -> Result<()> {
        self.enqueue(Pool::Generate, Task::Generate(task))
    }

    fn enqueue(&self, pool: Pool, task: Task) -> Result<()> {
        let slot = match pool {
            Pool::Compile => &self.compile_tx,
            Pool::Generate => &self.generate_tx,
        };
        let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            return Err(HbuildError::Other(anyhow::anyhow!(
                "scheduler finished; cannot queue {}",
                task.label()
            )));
        };

        let counters = self.state.pool(pool);
        counters.queued.fetch_add(1, Ordering::SeqCst);
        debug!(task = %task.label(), kind = %task.kind(), "queued");
        if tx.send(task).is_err() {
            counters.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(HbuildError::Other(anyhow::anyhow!("worker pool has shut down")));
        }
        Ok(())
    }

    /// Link after every queued compile of the run has drained.
    ///
    /// This is a global barrier: it waits for the whole compile pool, not
    /// only the compiles of `task`'s folder.
    pub async fn add_link(&self, task: LinkTask) -> Result<LinkOutcome> {
        if task.is_empty() {
            debug!(folder = %task.folder, "nothing to link");
            return Ok(LinkOutcome::NothingToLink);
        }

        self.wait_for_compiles().await;

        if self.state.compile.errors.load(Ordering::SeqCst) > 0 {
            warn!(folder = %task.folder, "skipping link after compile errors");
            return Ok(LinkOutcome::Skipped);
        }

        let task = Task::Link(task);
        match self.executor.execute(&task).await {
            Ok(_) => {
                self.state.links.fetch_add(1, Ordering::SeqCst);
                info!(folder = %task.label(), "linked");
                Ok(LinkOutcome::Linked)
            }
            Err(err) => {
                self.state.link_errors.fetch_add(1, Ordering::SeqCst);
                self.state.changed.notify_waiters();
                error!(folder = %task.label(), error = %err, "link failed");
                Err(err)
            }
        }
    }

    /// Execute a task on the calling task, outside the pools.
    pub async fn run_inline(&self, task: Task) -> Result<TaskReport> {
        self.executor.execute(&task).await
    }

    pub async fn wait_for_compiles(&self) {
        self.wait_for(Pool::Compile).await;
    }

    pub async fn wait_for_generators(&self) {
        self.wait_for(Pool::Generate).await;
    }

    async fn wait_for(&self, pool: Pool) {
        loop {
            let notified = self.state.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.state.drained(pool) {
                return;
            }
            notified.await;
        }
    }

    pub fn has_error(&self) -> bool {
        self.state.has_error()
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> SchedulerStats {
        let load = |a: &AtomicUsize| a.load(Ordering::SeqCst);
        SchedulerStats {
            compiled: load(&self.state.compile.completed),
            compile_errors: load(&self.state.compile.errors),
            generated: load(&self.state.generate.completed),
            generated_files: load(&self.state.generated_files),
            generate_errors: load(&self.state.generate.errors),
            linked: load(&self.state.links),
            link_errors: load(&self.state.link_errors),
        }
    }

    /// Close both queues; idle workers exit once they see the closed channel.
    pub fn finish(&self) {
        self.state.finished.store(true, Ordering::SeqCst);
        for slot in [&self.compile_tx, &self.generate_tx] {
            slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        }
        self.state.changed.notify_waiters();
        debug!("scheduler finished");
    }

    /// [`TaskScheduler::finish`] and wait for every worker to exit.
    pub async fn shutdown(&self) {
        self.finish();
        let handles = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for handle in handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "worker task ended abnormally");
            }
        }
    }
}

async fn worker_loop(
    id: usize,
    pool: Pool,
    rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<Task>>>,
    state: Arc<SchedulerState>,
    signals: Arc<BuildSignals>,
    executor: Arc<dyn TaskExecutor>,
) {
    let counters = state.pool(pool);

    loop {
        if state.has_error() {
            debug!(worker = id, ?pool, "stopping after failure");
            break;
        }

        let next = { rx.lock().await.recv().await };
        let Some(task) = next else {
            break;
        };

        // Mark busy before un-queueing so a barrier never sees both at zero
        // while this worker holds a task.
        counters.busy.fetch_add(1, Ordering::SeqCst);
        counters.queued.fetch_sub(1, Ordering::SeqCst);

        if state.has_error() {
            debug!(worker = id, task = %task.label(), "dropping task after failure");
            counters.busy.fetch_sub(1, Ordering::SeqCst);
            state.changed.notify_waiters();
            break;
        }

        let failed = match executor.execute(&task).await {
            Ok(report) => {
                counters.completed.fetch_add(1, Ordering::SeqCst);
                if task.kind() == TaskKind::Generate {
                    state.generated_files.fetch_add(report.files, Ordering::SeqCst);
                    if report.files > 0 {
                        signals.raise_secondary_rebuild();
                    }
                }
                false
            }
            Err(err) => {
                counters.errors.fetch_add(1, Ordering::SeqCst);
                error!(worker = id, task = %task.label(), kind = %task.kind(), error = %err, "task failed");
                true
            }
        };

        counters.busy.fetch_sub(1, Ordering::SeqCst);
        state.changed.notify_waiters();

        if failed {
            break;
        }
    }

    debug!(worker = id, ?pool, "worker exited");
}
