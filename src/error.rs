/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater::error
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise updater error types so that every stage of the
    check/download/install workflow reports failures with
    consistent diagnostics and exit semantics.

  Security / Safety Notes:
    Error contexts carry URLs and local paths only; response
    bodies are logged separately and never embedded here.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Used across modules to propagate failures out of
    `check_and_install` to whatever triggered the check.

  Revision History:
    2026-10-16 COD  Established updater error taxonomy.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - No silent failure paths
    - Stable exit codes for operational tooling
============================================================*/

use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for updater operations.
pub type Result<T> = std::result::Result<T, UpdaterError>;

/// Enumerates the error domains surfaced by the updater.
#[derive(Debug, Error)]
pub enum UpdaterError {
    #[error("Required command `{command}` not found in PATH")]
    CommandMissing { command: String },
    #[error("Command `{command}` failed with status {status}: {stderr}")]
    CommandFailure {
        command: String,
        status: i32,
        stderr: String,
    },
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Network: {0}")]
    Network(String),
    #[error("Remote listing: {0}")]
    RemoteFetch(String),
    #[error("Download of {url} failed with status code: {status}")]
    Download { url: String, status: u16 },
    #[error("Install: {0}")]
    Install(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl UpdaterError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            UpdaterError::CommandMissing { .. } => ExitCode::from(10),
            UpdaterError::CommandFailure { .. } => ExitCode::from(11),
            UpdaterError::Config(_) => ExitCode::from(20),
            UpdaterError::Network(_) => ExitCode::from(30),
            UpdaterError::Serialization(_) => ExitCode::from(31),
            UpdaterError::RemoteFetch(_) => ExitCode::from(32),
            UpdaterError::Download { .. } => ExitCode::from(33),
            UpdaterError::Filesystem(_) => ExitCode::from(40),
            UpdaterError::Io(_) => ExitCode::from(41),
            UpdaterError::Install(_) => ExitCode::from(42),
            UpdaterError::Runtime(_) => ExitCode::from(50),
        }
    }
}
