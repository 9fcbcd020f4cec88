/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater::logger
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Provide structured, append-only logging for update checks,
    downloads, and installs.

  Security / Safety Notes:
    Raw remote payloads are only written at DEBUG level or when
    a listing is rejected, never at INFO.

  Dependencies:
    std::fs::File, std::sync::Mutex, chrono for timestamps,
    sha2 for session log digests.

  Operational Scope:
    Shared by the orchestrator, version sources and host
    adapters through an `Arc<Logger>`.

  Revision History:
    2026-10-16 COD  Adapted Synavera logger for the updater.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Append-only logging with UTC timestamps
    - Deterministic formatting for auditability
    - Graceful error propagation on I/O failures
============================================================*/

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use crate::error::{Result, UpdaterError};

/// Structured log level for updater events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn always_echo(self) -> bool {
        matches!(self, LogLevel::Warn | LogLevel::Error)
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared logger that emits append-only entries in Synavera format.
pub struct Logger {
    file: Option<Mutex<BufWriter<File>>>,
    path: Option<PathBuf>,
    verbose: bool,
}

impl Logger {
    /// Build a logger that writes to stderr and optionally to a file.
    pub fn new(path: Option<PathBuf>, verbose: bool) -> Result<Self> {
        let file = match path.as_deref() {
            Some(file_path) => Some(Mutex::new(BufWriter::new(open_append(file_path)?))),
            None => None,
        };

        Ok(Self {
            file,
            path,
            verbose,
        })
    }

    /// Logger that only echoes warnings and errors to stderr.
    pub fn stderr_only() -> Self {
        Self {
            file: None,
            path: None,
            verbose: false,
        }
    }

    /// Session log path inside `log_dir`, stamped with the current UTC time.
    pub fn session_path(log_dir: &Path) -> PathBuf {
        let stamp = Utc::now().format("%Y-%m-%d_%H-%M-%S");
        log_dir.join(format!("updater_{stamp}.log"))
    }

    /// Emit a log entry with the given level, code, and message.
    pub fn log<S: AsRef<str>>(&self, level: LogLevel, code: &str, message: S) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let payload = format!("{timestamp} [{level}] [{code}] {}", message.as_ref());

        if self.verbose || level.always_echo() {
            eprintln!("{payload}");
        }

        let Some(file) = &self.file else {
            return;
        };
        let Ok(mut guard) = file.lock() else {
            return;
        };
        if writeln!(guard, "{payload}").is_err() || guard.flush().is_err() {
            eprintln!(
                "{timestamp} [{}] [LOGGER] Failed to append to log file",
                LogLevel::Error
            );
        }
    }

    /// Convenience wrapper for `INFO` level events.
    pub fn info<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Info, code, message);
    }

    /// Convenience wrapper for `WARN` level events.
    pub fn warn<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Warn, code, message);
    }

    /// Convenience wrapper for `ERROR` level events.
    pub fn error<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Error, code, message);
    }

    /// Convenience wrapper for `DEBUG` level events.
    pub fn debug<S: AsRef<str>>(&self, code: &str, message: S) {
        self.log(LogLevel::Debug, code, message);
    }

    /// Return the path backing this logger, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write a SHA-256 digest of the session log to `<log>.hash`.
    pub fn finalize(&self) -> Result<()> {
        let Some(path) = self.path() else {
            return Ok(());
        };

        let data = std::fs::read(path).map_err(|err| {
            UpdaterError::Filesystem(format!(
                "Failed to read log for hashing {}: {err}",
                path.display()
            ))
        })?;
        let digest = Sha256::digest(&data);

        let mut hash_os = path.as_os_str().to_os_string();
        hash_os.push(".hash");
        let hash_path = PathBuf::from(hash_os);
        let line = format!(
            "{:x}  {}\n",
            digest,
            path.file_name().unwrap_or_default().to_string_lossy()
        );
        std::fs::write(&hash_path, line).map_err(|err| {
            UpdaterError::Filesystem(format!(
                "Failed to write hash file {}: {err}",
                hash_path.display()
            ))
        })
    }
}

fn open_append(file_path: &Path) -> Result<File> {
    if let Some(parent) = file_path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            UpdaterError::Filesystem(format!(
                "Failed to create log directory {}: {err}",
                parent.display()
            ))
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)
        .map_err(|err| {
            UpdaterError::Filesystem(format!(
                "Failed to open log file {}: {err}",
                file_path.display()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_appended_with_level_and_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("session.log");
        let logger = Logger::new(Some(path.clone()), false).unwrap();

        logger.info("CHECK", "first");
        logger.debug("STAGE", "second");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[INFO] [CHECK] first"));
        assert!(lines[1].ends_with("[DEBUG] [STAGE] second"));
    }

    #[test]
    fn finalize_writes_digest_next_to_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.log");
        let logger = Logger::new(Some(path.clone()), false).unwrap();
        logger.info("INIT", "hello");
        logger.finalize().unwrap();

        let hash = std::fs::read_to_string(dir.path().join("session.log.hash")).unwrap();
        let (digest, name) = hash.trim_end().split_once("  ").unwrap();
        assert_eq!(digest.len(), 64);
        assert_eq!(name, "session.log");
    }

    #[test]
    fn finalize_without_file_is_noop() {
        Logger::stderr_only().finalize().unwrap();
    }
}
