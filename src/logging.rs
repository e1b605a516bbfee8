use std::fs;

use anyhow::{Context, Result, bail};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;

/// Map the configured rotation name onto an appender rotation.
pub fn parse_rotation(name: &str) -> Result<Rotation> {
    Ok(match name.trim().to_ascii_lowercase().as_str() {
        "minutely" => Rotation::MINUTELY,
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        "never" | "" => Rotation::NEVER,
        other => bail!("Unknown log rotation '{other}'"),
    })
}

/// Filter for this crate at the configured level. RUST_LOG wins when set.
fn build_filter(log_level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(format!("wager_ledger={log_level}"))
        .with_context(|| format!("Invalid log level '{log_level}'"))
}

/// Install the global subscriber. Keep the guard alive until exit or
/// buffered file output is lost.
pub fn init_logging(config: &AppConfig) -> Result<WorkerGuard> {
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log dir {}", config.log_dir))?;

    let mut builder = RollingFileAppender::builder()
        .rotation(parse_rotation(&config.rotation)?)
        .filename_prefix(&config.log_file);
    if let Some(keep) = config.max_log_files {
        builder = builder.max_log_files(keep);
    }
    let file_appender = builder
        .build(&config.log_dir)
        .context("Failed to open log file")?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let registry = tracing_subscriber::registry().with(build_filter(&config.log_level)?);

    if config.use_json {
        // One flat object per event so user_id/op/delta are top-level keys
        let file_layer = fmt::layer()
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_thread_names(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        let stdout_layer = fmt::layer().compact().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rotation() {
        assert_eq!(parse_rotation("hourly").unwrap(), Rotation::HOURLY);
        assert_eq!(parse_rotation(" Daily ").unwrap(), Rotation::DAILY);
        assert_eq!(parse_rotation("never").unwrap(), Rotation::NEVER);
        assert!(parse_rotation("weekly").is_err());
    }

    #[test]
    fn test_invalid_level_rejected() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(build_filter("loud!!").is_err());
            assert!(build_filter("debug").is_ok());
        }
    }
}
