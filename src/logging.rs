//! Logging setup for the service and its tools.
//!
//! Installs a global tracing subscriber that writes to a per-launch log file
//! under the app `logs` directory and, for the server, to stderr as well. The
//! one-shot tools keep the console quiet so their JSON output stays clean.
//! Log files are named by launch time and pruned to the newest
//! [`MAX_LOG_FILES`].

use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
    sync::OnceLock,
    time::SystemTime,
};

use time::{OffsetDateTime, UtcOffset, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

use crate::app_dirs;

/// cropyield log files kept in `logs/`; older launches are deleted.
pub const MAX_LOG_FILES: usize = 10;
const LOG_FILE_PREFIX: &str = "cropyield";
const DEFAULT_DIRECTIVES: &str = "info,cropyield=info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where log events are mirrored besides the log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Console {
    /// Mirror events to stderr.
    Stderr,
    /// Only write the log file.
    Off,
}

/// Reasons the log file or subscriber could not be set up.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The `.cropyield` root could not be resolved.
    #[error("No app directory available for cropyield logs")]
    NoAppDir,
    /// `logs/` could not be created.
    #[error("Could not create log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Listing `logs/` for pruning failed.
    #[error("Could not list log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// An old cropyield log could not be deleted.
    #[error("Could not delete old log {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not format launch time for the log name: {0}")]
    FormatTime(time::error::Format),
    /// Another subscriber is already installed.
    #[error("Global tracing subscriber already set: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
    /// The per-launch log file could not be opened.
    #[error("Could not open log file {path}: {source}")]
    CreateLogFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Install the global subscriber for this process.
///
/// Only the first call does any work. An error leaves the process without
/// logs; callers report it and keep going.
pub fn init(console: Console) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }
    let log_dir = log_directory()?;
    let log_file_name = format_log_file_name(now_local_or_utc())?;
    let log_path = log_dir.join(&log_file_name);
    ensure_file_exists(&log_path)?;
    prune_old_logs(&log_dir, MAX_LOG_FILES)?;

    let (file_writer, guard) =
        tracing_appender::non_blocking(rolling::never(&log_dir, log_file_name));
    let timer = build_timer();
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_timer(timer.clone())
        .with_writer(file_writer);
    let console_layer = match console {
        Console::Stderr => Some(
            fmt::layer()
                .with_timer(timer)
                .with_writer(std::io::stderr),
        ),
        Console::Off => None,
    };

    tracing::subscriber::set_global_default(
        Registry::default()
            .with(build_env_filter())
            .with(file_layer)
            .with(console_layer),
    )
    .map_err(LoggingError::SetGlobal)?;
    let _ = LOG_GUARD.set(guard);

    tracing::info!(path = %log_path.display(), "cropyield logging started");
    Ok(())
}

fn log_directory() -> Result<PathBuf, LoggingError> {
    app_dirs::logs_dir().map_err(map_app_dir_error)
}

fn ensure_file_exists(path: &Path) -> Result<(), LoggingError> {
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

/// Deletes the oldest cropyield logs in `dir` until `keep` remain.
fn prune_old_logs(dir: &Path, keep: usize) -> Result<(), LoggingError> {
    let listing = fs::read_dir(dir).map_err(|source| LoggingError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut launches: Vec<(SystemTime, PathBuf)> = listing
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_own_log_file(path))
        .map(|path| {
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .collect();
    // Newest first; everything past `keep` goes.
    launches.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, path) in launches.into_iter().skip(keep) {
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

fn is_own_log_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log"))
}

/// `cropyield_<launch time>.log`, sortable by name.
fn format_log_file_name(launched: OffsetDateTime) -> Result<String, LoggingError> {
    const LAUNCH_STAMP: &[FormatItem<'_>] =
        format_description!("[year]-[month]-[day]_[hour]-[minute]-[second]");
    launched
        .format(LAUNCH_STAMP)
        .map(|stamp| format!("{LOG_FILE_PREFIX}_{stamp}.log"))
        .map_err(LoggingError::FormatTime)
}

fn build_timer() -> fmt::time::OffsetTime<time::format_description::BorrowedFormatItem<'static>> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    fmt::time::OffsetTime::new(offset, DISPLAY_FORMAT.into())
}

fn now_local_or_utc() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

// `RUST_LOG` wins over the built-in directives.
fn build_env_filter() -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(DEFAULT_DIRECTIVES),
    }
}

fn map_app_dir_error(error: app_dirs::AppDirError) -> LoggingError {
    match error {
        app_dirs::AppDirError::NoBaseDir => LoggingError::NoAppDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            LoggingError::CreateDir { path, source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};
    use tempfile::tempdir;

    #[test]
    fn log_filename_has_timestamp_and_prefix() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let name = format_log_file_name(fixed).unwrap();
        assert_eq!(name, "cropyield_2023-11-14_22-13-20.log");
    }

    #[test]
    fn prune_keeps_newest_own_logs_and_ignores_foreign_files() {
        let dir = tempdir().unwrap();
        for idx in 0..12 {
            let path = dir.path().join(format!("cropyield_{idx:02}.log"));
            ensure_file_exists(&path).unwrap();
            thread::sleep(Duration::from_millis(10));
        }
        let foreign = dir.path().join("other_tool.log");
        ensure_file_exists(&foreign).unwrap();

        prune_old_logs(dir.path(), 10).unwrap();

        let own = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_own_log_file(path))
            .count();
        assert_eq!(own, 10);
        assert!(foreign.exists());
        assert!(!dir.path().join("cropyield_00.log").exists());
        assert!(dir.path().join("cropyield_11.log").exists());
    }

    #[test]
    fn repeated_init_is_a_no_op() {
        let base = tempdir().unwrap();
        let _guard = crate::app_dirs::ConfigBaseGuard::set(base.path().to_path_buf());

        init(Console::Off).unwrap();
        init(Console::Off).unwrap();

        let logs = base.path().join(crate::app_dirs::APP_DIR_NAME).join("logs");
        let own = fs::read_dir(&logs)
            .unwrap()
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_own_log_file(path))
            .count();
        assert_eq!(own, 1);
    }
}
