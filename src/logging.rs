// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `HBUILD_LOG` environment variable, either a bare level ("debug") or a
//!    full filter directive ("hbuild::sched=trace,info")
//! 3. default to `info`
//!
//! Logs go to STDERR; stdout carries the build banner and `status` output.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "HBUILD_LOG";

/// Initialise the global logging subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::new(level_from_log_level(lvl).as_str()),
        None => std::env::var(LOG_ENV)
            .ok()
            .and_then(|s| filter_from_str(&s))
            .unwrap_or_else(|| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("initialising logging: {e}"))?;

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn filter_from_str(s: &str) -> Option<EnvFilter> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let directive = match s.to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        _ => s.to_string(),
    };
    EnvFilter::try_new(directive).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_values_parse_into_filters() {
        assert!(filter_from_str("debug").is_some());
        assert!(filter_from_str("WARNING").is_some());
        assert!(filter_from_str("hbuild::sched=trace,info").is_some());
        assert!(filter_from_str("   ").is_none());
    }
}
