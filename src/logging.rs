//! Tracing setup for sessions.
//!
//! One global subscriber with a console layer and a per-launch file under
//! `<config home>/.teachable/logs`. The console defaults to stderr because
//! stdout may be the output channel.

use std::{
    fs::{self, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs;

/// Maximum number of session log files kept in the logs directory.
pub const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "teachable_";
const DEFAULT_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Log directory unavailable: {0}")]
    Dir(#[from] app_dirs::AppDirError),
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile { path: PathBuf, source: io::Error },
    #[error("Failed to create log file at {path}: {source}")]
    CreateLogFile { path: PathBuf, source: io::Error },
    #[error("Failed to format log filename time: {0}")]
    FormatTime(time::error::Format),
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Where console output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Console {
    #[default]
    Stderr,
    Stdout,
    Off,
}

/// Knobs for [`init_with`].
#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    pub console: Console,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

/// Initialize tracing into the default logs directory.
///
/// Subsequent calls are no-ops. Callers keep running without file logging
/// when this fails.
pub fn init() -> Result<PathBuf, LoggingError> {
    init_with(&app_dirs::logs_dir()?, &LogSettings::default())
}

/// Initialize tracing with the session log written into `log_dir`.
pub fn init_with(log_dir: &Path, settings: &LogSettings) -> Result<PathBuf, LoggingError> {
    let file_name = session_log_name(now_local_or_utc())?;
    let log_path = log_dir.join(&file_name);
    if LOG_GUARD.get().is_some() {
        return Ok(log_path);
    }
    create_log_file(&log_path)?;
    prune_session_logs(log_dir, MAX_LOG_FILES)?;

    let (file_writer, guard) = tracing_appender::non_blocking(rolling::never(log_dir, &file_name));
    let timer = clock_timer();
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(timer.clone())
        .with_writer(file_writer);
    let console_layer = match settings.console {
        Console::Off => None,
        Console::Stderr => Some(
            fmt::layer()
                .with_target(false)
                .with_timer(timer)
                .with_writer(io::stderr)
                .boxed(),
        ),
        Console::Stdout => Some(
            fmt::layer()
                .with_target(false)
                .with_timer(timer)
                .with_writer(io::stdout)
                .boxed(),
        ),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(settings.filter.as_deref().unwrap_or(DEFAULT_FILTER))
    });

    let subscriber = Registry::default()
        .with(filter)
        .with(file_layer)
        .with(console_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!("Session log at {}", log_path.display());
    Ok(log_path)
}

fn create_log_file(path: &Path) -> Result<(), LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|source| LoggingError::CreateLogFile {
            path: path.to_path_buf(),
            source,
        })
}

fn is_session_log(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log"))
}

/// Delete the oldest session logs until at most `keep` remain.
fn prune_session_logs(dir: &Path, keep: usize) -> Result<(), LoggingError> {
    let listing = fs::read_dir(dir).map_err(|source| LoggingError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut logs: Vec<(SystemTime, PathBuf)> = listing
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_session_log(path))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();
    if logs.len() <= keep {
        return Ok(());
    }
    logs.sort();
    let excess = logs.len() - keep;
    for (_, path) in logs.drain(..excess) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

fn session_log_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const NAME_FORMAT: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    let stamp = now.format(NAME_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{LOG_FILE_PREFIX}{stamp}.log"))
}

fn clock_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const CLOCK_FORMAT: &[FormatItem<'static>] =
        format_description!("[hour]:[minute]:[second].[subsecond digits:3]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, CLOCK_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    #[test]
    fn session_log_name_is_prefixed_and_stamped() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(
            session_log_name(fixed).unwrap(),
            "teachable_2023-11-14_22-13-20.log"
        );
    }

    #[test]
    fn pruning_keeps_newest_session_logs_only() {
        let dir = tempdir().unwrap();
        for idx in 0..12 {
            create_log_file(&dir.path().join(format!("teachable_{idx:02}.log"))).unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        create_log_file(&dir.path().join("other.log")).unwrap();
        create_log_file(&dir.path().join("notes.txt")).unwrap();

        prune_session_logs(dir.path(), 10).unwrap();
        let mut remaining: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("teachable_"))
            .collect();
        remaining.sort();
        assert_eq!(remaining.len(), 10);
        assert_eq!(remaining[0], "teachable_02.log");
        assert!(dir.path().join("other.log").exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}
