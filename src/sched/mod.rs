// src/sched/mod.rs

//! Task scheduling and execution.
//!
//! - [`scheduler`]: worker pools, barriers and failure counters.
//! - [`executor`]: the [`TaskExecutor`] seam and the production
//!   [`ProcessExecutor`].
//! - [`process`]: shell command runner.

pub mod executor;
pub mod process;
pub mod scheduler;

pub use executor::{ProcessExecutor, TaskExecutor, TaskFuture, TaskReport};
pub use scheduler::{BuildSignals, LinkOutcome, SchedulerStats, TaskScheduler};
