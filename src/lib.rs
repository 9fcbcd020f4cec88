/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Self-update machinery for editor extensions: discover the
    newest published package, obtain consent, download,
    install, record the installed release and offer a reload.

  Security / Safety Notes:
    Trusts the configured version source and the host install
    command; no signature verification or rollback.

  Dependencies:
    reqwest/tokio for async I/O, serde for payloads, thiserror
    for errors, async-trait for host collaborator seams.

  Operational Scope:
    Embedded by hosts through the collaborator traits in
    `host`, or run standalone through the bundled binary.

  Revision History:
    2026-10-16 COD  Assembled updater library surface.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling
    - Explicit dependency injection of host services
============================================================*/

pub mod code_cli;
pub mod config;
pub mod confluence;
pub mod download;
pub mod error;
pub mod host;
pub mod logger;
pub mod package_info;
pub mod source;
pub mod state;
pub mod terminal;
pub mod updater;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{UpdaterConfig, UpdaterOptions};
pub use confluence::ConfluenceSource;
pub use error::{Result, UpdaterError};
pub use host::{CommandExecutor, HostUi, StateStore};
pub use logger::Logger;
pub use package_info::{ExtensionManifest, VersionInfo};
pub use source::VersionSource;
pub use updater::{HostServices, UpdateOrchestrator, UpdateOutcome, UpdateStage};
