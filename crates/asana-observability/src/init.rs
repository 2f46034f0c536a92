// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Always installs a console layer. With the `file-logging` feature and a
//! configured `file_dir`, a JSON file layer is added inside a timestamped run
//! folder:
//!
//! ```text
//! ./logs/
//!   └── run_20250101_120000/
//!       └── asana.log
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Keeps background log writers alive. Logs are flushed when dropped.
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving file logs, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Install the global tracing subscriber
///
/// # Errors
/// Fails if a global subscriber is already set or the log folder cannot be
/// created.
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string(&config.level);

    #[allow(unused_mut)]
    let mut layers: Vec<BoxedLayer> = vec![console_layer(config.format, &filter)?];

    #[cfg(feature = "file-logging")]
    let (file_guard, log_dir) = match &config.file_dir {
        Some(base) => {
            let (layer, guard, run_folder) = file_layer(base, &filter, config.retention_runs)?;
            layers.push(layer);
            (Some(guard), Some(run_folder))
        }
        None => (None, None),
    };
    #[cfg(not(feature = "file-logging"))]
    let log_dir = None;

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guard: file_guard,
        log_dir,
    })
}

fn console_layer(format: LogFormat, filter: &str) -> Result<BoxedLayer> {
    let env_filter = EnvFilter::try_new(filter)
        .with_context(|| format!("Invalid log filter '{}'", filter))?;

    let layer = match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
    };
    Ok(layer)
}

#[cfg(feature = "file-logging")]
fn file_layer(
    base_dir: &Path,
    filter: &str,
    retention_runs: usize,
) -> Result<(BoxedLayer, tracing_appender::non_blocking::WorkerGuard, PathBuf)> {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let run_folder = base_dir.join(format!("run_{}", timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    prune_old_runs(base_dir, retention_runs)?;

    let appender = tracing_appender::rolling::daily(&run_folder, "asana.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(EnvFilter::try_new(filter)?)
        .boxed();

    Ok((layer, guard, run_folder))
}

/// Remove all but the `keep` most recent `run_*` folders under `base_dir`
///
/// Folder names embed a sortable timestamp, so lexical order is age order.
pub fn prune_old_runs(base_dir: &Path, keep: usize) -> Result<usize> {
    if !base_dir.exists() {
        return Ok(0);
    }

    let mut runs: Vec<PathBuf> = std::fs::read_dir(base_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("run_"))
        })
        .collect();

    if runs.len() <= keep {
        return Ok(0);
    }

    runs.sort();
    let excess = runs.len() - keep;
    let mut removed = 0;
    for path in runs.into_iter().take(excess) {
        match std::fs::remove_dir_all(&path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_prune_keeps_most_recent_runs() {
        let dir = tempdir().unwrap();
        for name in [
            "run_20250101_080000",
            "run_20250102_080000",
            "run_20250103_080000",
            "unrelated",
        ] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }

        let removed = prune_old_runs(dir.path(), 2).unwrap();

        assert_eq!(removed, 1);
        assert!(!dir.path().join("run_20250101_080000").exists());
        assert!(dir.path().join("run_20250103_080000").exists());
        assert!(dir.path().join("unrelated").exists());
    }

    #[test]
    fn test_prune_missing_dir_is_noop() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_eq!(prune_old_runs(&missing, 3).unwrap(), 0);
    }

    // Installs the global subscriber; keep this the only test that does.
    #[test]
    fn test_console_only_logging_has_no_log_dir() {
        let guard = init_logging(&CrateDebugFlags::default(), &LoggingConfig::default()).unwrap();
        assert!(guard.log_dir().is_none());
    }

    #[test]
    fn test_invalid_filter_is_reported() {
        assert!(console_layer(LogFormat::Text, "asana_session=loud").is_err());
    }
}
