// src/build/summary.rs

use std::fmt;
use std::time::Duration;

use crate::sched::SchedulerStats;

/// End-of-run counts printed as the build banner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: SchedulerStats,
    pub installed: usize,
    /// An error escaped a step even though no task counter recorded it.
    pub aborted: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn succeeded(&self) -> bool {
        !self.aborted
            && self.stats.compile_errors == 0
            && self.stats.generate_errors == 0
            && self.stats.link_errors == 0
    }

    /// Process exit code for this run.
    pub fn exit_code(&self) -> i32 {
        if self.succeeded() { 0 } else { 1 }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        let banner = if self.succeeded() {
            "BUILD SUCCEEDED"
        } else {
            "BUILD FAILED"
        };
        writeln!(f, "==== {banner} ====")?;
        writeln!(
            f,
            "  compiled: {} ({} failed)  linked: {} ({} failed)",
            s.compiled, s.compile_errors, s.linked, s.link_errors
        )?;
        writeln!(
            f,
            "  generated: {} schemas, {} files ({} failed)  installed: {} files",
            s.generated, s.generated_files, s.generate_errors, self.installed
        )?;
        write!(f, "  elapsed: {:.2}s", self.elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_reflects_errors() {
        let mut summary = RunSummary::default();
        assert!(summary.to_string().starts_with("==== BUILD SUCCEEDED"));
        assert_eq!(summary.exit_code(), 0);

        summary.stats.link_errors = 1;
        assert!(summary.to_string().starts_with("==== BUILD FAILED"));
        assert_eq!(summary.exit_code(), 1);
    }
}
