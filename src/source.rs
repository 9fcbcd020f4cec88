/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater::source
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Capability for retrieving the latest published release of
    the extension from a remote location.

  Security / Safety Notes:
    Sources are trusted; their download locations are used
    without signature verification.

  Dependencies:
    async-trait for dynamic dispatch of async sources.

  Operational Scope:
    Held by the orchestrator as `Arc<dyn VersionSource>`.

  Revision History:
    2026-10-16 COD  Introduced the version source capability.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Composition over inheritance for source-specific parsing
============================================================*/

use async_trait::async_trait;

use crate::error::Result;
use crate::package_info::VersionInfo;

/// Produces metadata for the newest available release.
///
/// Fails with [`UpdaterError::RemoteFetch`](crate::UpdaterError::RemoteFetch)
/// on an unexpected or empty payload and
/// [`UpdaterError::Network`](crate::UpdaterError::Network) on transport errors.
#[async_trait]
pub trait VersionSource: Send + Sync {
    /// Short label used in log lines.
    fn describe(&self) -> String;

    async fn latest_version(&self) -> Result<VersionInfo>;
}
