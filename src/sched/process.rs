// src/sched/process.rs

//! Shell command runner used by compile and link tasks.

use std::collections::VecDeque;
use std::process::Stdio;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::errors::{HbuildError, Result};

/// Lines of stderr kept for the failure report.
const STDERR_TAIL: usize = 20;

fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Run `cmd` through the platform shell and wait for it.
///
/// Output is logged at debug level; on a nonzero exit the last lines of
/// stderr are logged as errors and [`HbuildError::ExternalTool`] is returned.
pub async fn run_shell(label: &str, cmd: &str) -> Result<()> {
    debug!(task = %label, cmd = %cmd, "starting process");

    let mut child = shell(cmd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawning process for '{label}'"))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let stdout_task = {
        let label = label.to_string();
        tokio::spawn(async move {
            if let Some(stdout) = stdout {
                let mut lines = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(task = %label, "stdout: {}", line);
                }
            }
        })
    };

    let stderr_task = {
        let label = label.to_string();
        tokio::spawn(async move {
            let mut tail = VecDeque::with_capacity(STDERR_TAIL);
            if let Some(stderr) = stderr {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(task = %label, "stderr: {}", line);
                    if tail.len() == STDERR_TAIL {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
            tail
        })
    };

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of '{label}'"))?;

    let _ = stdout_task.await;
    let tail = stderr_task.await.unwrap_or_default();

    let code = status.code().unwrap_or(-1);
    if status.success() {
        info!(task = %label, exit_code = code, "process finished");
        return Ok(());
    }

    for line in &tail {
        error!(task = %label, "{}", line);
    }
    Err(HbuildError::ExternalTool {
        command: cmd.to_string(),
        code,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exit_codes_map_to_results() {
        assert!(run_shell("ok", "true").await.is_ok());

        let err = run_shell("bad", "echo oops >&2; exit 4").await.unwrap_err();
        assert!(matches!(err, HbuildError::ExternalTool { code: 4, .. }));
    }
}
