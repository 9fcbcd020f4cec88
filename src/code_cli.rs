/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater::code_cli
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Execute host commands through the editor's command-line
    launcher when the updater runs outside the editor process.

  Security / Safety Notes:
    Spawns the launcher binary with user privileges and
    explicit arguments; no shell is involved.

  Dependencies:
    tokio::process for async command execution.

  Operational Scope:
    Backs `CommandExecutor` for the standalone driver. Window
    reload has no CLI equivalent and is reported instead.

  Revision History:
    2026-10-16 COD  Added editor CLI command executor.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic command invocation with explicit checks
    - Structured failure reporting from stderr
============================================================*/

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Result, UpdaterError};
use crate::host::{CommandExecutor, INSTALL_COMMAND, RELOAD_COMMAND};
use crate::logger::Logger;

/// Marker the launcher prints when an extension install fails yet exits 0.
const INSTALL_FAILURE_MARKER: &str = "Failed Installing Extensions:";

/// Runs host commands via the editor launcher (`code` by default).
pub struct CodeCliExecutor {
    program: PathBuf,
    leading_args: Vec<String>,
    logger: Arc<Logger>,
}

impl CodeCliExecutor {
    pub fn new(program: impl Into<PathBuf>, logger: Arc<Logger>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            logger,
        }
    }

    /// Arguments placed before the launcher's own, e.g. `["/C", "code"]`
    /// when going through `cmd`.
    pub fn with_leading_args(mut self, args: Vec<String>) -> Self {
        self.leading_args = args;
        self
    }

    async fn install_extension(&self, package: &str) -> Result<()> {
        let command_line = format!(
            "{} --install-extension {package} --force",
            self.program.display()
        );
        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .arg("--install-extension")
            .arg(package)
            .arg("--force")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|err| map_spawn_error(err, &self.program.display().to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            return Err(UpdaterError::CommandFailure {
                command: command_line,
                status: output.status.code().unwrap_or(-1),
                stderr,
            });
        }
        if stderr.contains(INSTALL_FAILURE_MARKER) {
            return Err(UpdaterError::Install(stderr));
        }

        if !stderr.is_empty() {
            self.logger.warn("INSTALL", &stderr);
        }
        if !stdout.is_empty() {
            self.logger.info("INSTALL", &stdout);
        }
        Ok(())
    }
}

#[async_trait]
impl CommandExecutor for CodeCliExecutor {
    async fn execute(&self, command: &str, args: &[String]) -> Result<()> {
        match command {
            INSTALL_COMMAND => {
                let package = args.first().ok_or_else(|| {
                    UpdaterError::Install(format!("{INSTALL_COMMAND} requires a package path"))
                })?;
                self.install_extension(package).await
            }
            RELOAD_COMMAND => {
                self.logger.info(
                    "RELOAD",
                    "Reload the editor window to activate the new version",
                );
                Ok(())
            }
            other => Err(UpdaterError::Runtime(format!(
                "Command `{other}` is not available through {}",
                self.program.display()
            ))),
        }
    }
}

fn map_spawn_error(err: io::Error, command: &str) -> UpdaterError {
    if err.kind() == io::ErrorKind::NotFound {
        UpdaterError::CommandMissing {
            command: command.into(),
        }
    } else {
        UpdaterError::Runtime(format!("Failed to spawn {command}: {err}"))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::Path;

    /// Launcher script run through `sh`, avoiding exec of a just-written file.
    fn fake_launcher(dir: &Path, body: &str) -> CodeCliExecutor {
        let script = dir.join("code.sh");
        std::fs::write(&script, format!("{body}\n")).unwrap();
        CodeCliExecutor::new("sh", Arc::new(Logger::stderr_only()))
            .with_leading_args(vec![script.display().to_string()])
    }

    fn executor(program: PathBuf) -> CodeCliExecutor {
        CodeCliExecutor::new(program, Arc::new(Logger::stderr_only()))
    }

    #[tokio::test]
    async fn install_passes_package_and_force_flag() {
        let dir = tempfile::tempdir().unwrap();
        let record = dir.path().join("args.txt");
        let launcher = fake_launcher(dir.path(), &format!("echo \"$@\" > {}", record.display()));

        launcher
            .execute(INSTALL_COMMAND, &["/tmp/pkg.vsix".into()])
            .await
            .unwrap();

        let args = std::fs::read_to_string(record).unwrap();
        assert_eq!(args.trim(), "--install-extension /tmp/pkg.vsix --force");
    }

    #[tokio::test]
    async fn failure_marker_on_stderr_is_install_error() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = fake_launcher(
            dir.path(),
            "echo 'Failed Installing Extensions: pkg.vsix' >&2\nexit 0",
        );

        let err = launcher
            .execute(INSTALL_COMMAND, &["pkg.vsix".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, UpdaterError::Install(_)));
    }

    #[tokio::test]
    async fn non_zero_exit_is_command_failure() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = fake_launcher(dir.path(), "echo boom >&2\nexit 3");

        let err = launcher
            .execute(INSTALL_COMMAND, &["pkg.vsix".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, UpdaterError::CommandFailure { status: 3, .. }));
    }

    #[tokio::test]
    async fn missing_launcher_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = executor(dir.path().join("absent"))
            .execute(INSTALL_COMMAND, &["pkg.vsix".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, UpdaterError::CommandMissing { .. }));
    }

    #[tokio::test]
    async fn reload_is_acknowledged_and_unknown_commands_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let exec = executor(dir.path().join("absent"));
        exec.execute(RELOAD_COMMAND, &[]).await.unwrap();

        let err = exec.execute("workbench.action.quit", &[]).await.unwrap_err();
        assert!(matches!(err, UpdaterError::Runtime(_)));
    }
}
