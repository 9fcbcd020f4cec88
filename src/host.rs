/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater::host
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Declare the host-application services the updater consumes:
    persisted key-value state, notifications and progress, and
    command execution.

  Security / Safety Notes:
    Implementations decide what commands actually run; the
    updater only issues the install and reload commands below.

  Dependencies:
    async-trait for object-safe async collaborators.

  Operational Scope:
    Injected into the orchestrator at construction; fakes
    implement these traits in tests.

  Revision History:
    2026-10-16 COD  Defined host collaborator interfaces.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit dependency injection, no ambient singletons
    - Narrow interfaces covering only what the workflow uses
============================================================*/

use async_trait::async_trait;

use crate::error::Result;

/// Host command installing an extension from a local package file.
pub const INSTALL_COMMAND: &str = "workbench.extensions.installExtension";
/// Host command reloading the editor window.
pub const RELOAD_COMMAND: &str = "workbench.action.reloadWindow";

/// Durable key-value storage that outlives host sessions.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &str) -> Option<i64>;

    /// Store `value` under `key`; `None` removes the key.
    fn update(&self, key: &str, value: Option<i64>) -> Result<()>;
}

/// Notification and progress presentation.
#[async_trait]
pub trait HostUi: Send + Sync {
    /// Passive, non-blocking notice.
    async fn show_information(&self, message: &str);

    /// Blocking prompt. Returns the chosen action, or `None` when dismissed.
    async fn show_warning(&self, message: &str, actions: &[&str]) -> Option<String>;

    fn progress_begin(&self, title: &str);

    fn progress_end(&self, title: &str);
}

/// Executes host commands by name.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &str, args: &[String]) -> Result<()>;
}
