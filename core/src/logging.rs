use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const LOG_FILE_PREFIX: &str = "sentinel.log";

/// Keeps the non-blocking appender worker alive; drop it last.
pub struct LoggingGuard {
    _appender_guard: WorkerGuard,
    run_id: String,
}

impl LoggingGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

pub fn init_tracing(config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = EnvFilter::try_new(&config.filter)
        .with_context(|| format!("logging.filter '{}' is not a valid directive", config.filter))?;

    let log_dir = if config.dir.is_absolute() {
        config.dir.clone()
    } else {
        std::env::current_dir()
            .context("cannot resolve logging.dir against the working directory")?
            .join(&config.dir)
    };
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("log directory '{}' could not be created", log_dir.display()))?;

    let (pruned, prune_failures) =
        prune_stale_logs(&log_dir, config.retention_days, SystemTime::now());

    let appender = match config.rotation {
        LoggingRotation::Daily => rolling::daily(&log_dir, LOG_FILE_PREFIX),
        LoggingRotation::Hourly => rolling::hourly(&log_dir, LOG_FILE_PREFIX),
    };
    let (writer, appender_guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_target(true)
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter);
    let stderr_layer = config.stderr_warn_enabled.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("tracing subscriber is already installed")?;

    let run_id = Uuid::now_v7().to_string();
    tracing::info!(
        target: "logging",
        run_id = %run_id,
        dir = %log_dir.display(),
        filter = %config.filter,
        rotation = ?config.rotation,
        retention_days = config.retention_days,
        pruned_log_files = pruned,
        "logging_initialized"
    );
    for failure in prune_failures {
        tracing::warn!(target: "logging", %failure, "log_retention_prune_failed");
    }

    Ok(LoggingGuard {
        _appender_guard: appender_guard,
        run_id,
    })
}

/// Retention pass over the log directory: every regular file carrying the
/// rotation prefix whose mtime predates the retention window is removed.
/// Returns how many were removed plus any per-file failures.
fn prune_stale_logs(
    log_dir: &Path,
    retention_days: usize,
    now: SystemTime,
) -> (usize, Vec<String>) {
    let window = Duration::from_secs(retention_days as u64 * 24 * 60 * 60);
    let cutoff = now.checked_sub(window).unwrap_or(SystemTime::UNIX_EPOCH);
    let mut failures = Vec::new();

    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) => {
            failures.push(format!("cannot list '{}': {err}", log_dir.display()));
            return (0, failures);
        }
    };

    let stale: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with(LOG_FILE_PREFIX)
        })
        .filter(|entry| {
            entry
                .metadata()
                .ok()
                .filter(|meta| meta.is_file())
                .and_then(|meta| meta.modified().ok())
                .is_some_and(|modified| modified <= cutoff)
        })
        .map(|entry| entry.path())
        .collect();

    let mut pruned = 0usize;
    for path in stale {
        match fs::remove_file(&path) {
            Ok(()) => pruned += 1,
            Err(err) => failures.push(format!("cannot remove '{}': {err}", path.display())),
        }
    }
    (pruned, failures)
}

#[cfg(test)]
mod tests {
    use std::{fs, time::Duration};

    use tracing_subscriber::EnvFilter;
    use uuid::Uuid;

    use super::prune_stale_logs;

    #[test]
    fn malformed_filter_directive_is_rejected() {
        assert!(EnvFilter::try_new("info,sentinel==debug").is_err());
    }

    #[test]
    fn prune_touches_only_stale_prefixed_files() {
        let dir = std::env::temp_dir().join(format!("sentinel-prune-test-{}", Uuid::now_v7()));
        fs::create_dir_all(&dir).expect("temp dir should exist");
        let stale = dir.join("sentinel.log.2026-01-05");
        let unrelated = dir.join("notes.txt");
        fs::write(&stale, "old").expect("stale log should be created");
        fs::write(&unrelated, "keep").expect("unrelated file should be created");

        let future = std::time::SystemTime::now() + Duration::from_secs(5);
        let (pruned, failures) = prune_stale_logs(&dir, 0, future);

        assert_eq!(pruned, 1);
        assert!(failures.is_empty(), "unexpected failures: {failures:?}");
        assert!(!stale.exists());
        assert!(unrelated.exists());

        let _ = fs::remove_file(&unrelated);
        let _ = fs::remove_dir(&dir);
    }
}
