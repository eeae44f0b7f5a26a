//! Tracing setup: JSON output to stdout and a daily-rolling log file,
//! with a startup sweep that prunes files past the retention window.

use std::path::Path;
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use crate::config::LoggingSettings;

const SECS_PER_DAY: u64 = 86_400;

/// Initialize the global subscriber. The returned guard must be held
/// for the process lifetime so buffered file output is flushed.
pub fn init(settings: &LoggingSettings) -> anyhow::Result<WorkerGuard> {
    prune_old_logs(&settings.log_directory, settings.retention_days)?;

    let appender =
        tracing_appender::rolling::daily(&settings.log_directory, "eaglechat.log");
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    // RUST_LOG wins when set; otherwise the configured level becomes
    // the global default.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_writer(file_writer.and(std::io::stdout))
        .init();

    Ok(guard)
}

/// Delete log files whose modification time is past the retention
/// window. A missing directory is created, not an error.
fn prune_old_logs(directory: &str, retention_days: u32) -> anyhow::Result<()> {
    let dir = Path::new(directory);
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        return Ok(());
    }

    let cutoff = SystemTime::now() - Duration::from_secs(u64::from(retention_days) * SECS_PER_DAY);

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified())
            && modified < cutoff
        {
            let path = entry.path();
            if std::fs::remove_file(&path).is_ok() {
                tracing::debug!(path = %path.display(), "Pruned expired log file");
            }
        }
    }

    Ok(())
}
