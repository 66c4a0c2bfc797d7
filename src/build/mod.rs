// src/build/mod.rs

//! Build orchestration: turning targets into scheduled work.

pub mod orchestrator;
pub mod summary;

pub use orchestrator::{ARTIFACT_EXTENSIONS, BuildOrchestrator, TargetStatus};
pub use summary::RunSummary;
