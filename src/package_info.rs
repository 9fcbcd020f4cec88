/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater::package_info
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Shared structures describing the extension being updated
    and the release metadata reported by a version source.

  Security / Safety Notes:
    Reads the packaging descriptor only; no network access.

  Dependencies:
    serde/serde_json for the descriptor, reqwest::Url for
    download locations.

  Operational Scope:
    Passed between version sources and the orchestrator.

  Revision History:
    2026-10-16 COD  Introduced VersionInfo and manifest types.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Clear data contracts between modules
    - Immutable values constructed once per check
============================================================*/

use std::path::Path;

use reqwest::Url;
use serde::Deserialize;

use crate::error::{Result, UpdaterError};

/// Metadata of the latest release published by a version source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// Monotonic release number; the only ordering key.
    pub version: i64,
    /// Unreliable: the Confluence source fills this from `version.number`
    /// rather than a date field. Do not order by it.
    pub timestamp: i64,
    pub download_url: Url,
    pub tags: Vec<String>,
}

impl VersionInfo {
    pub fn new(version: i64, timestamp: i64, download_url: Url) -> Self {
        Self {
            version,
            timestamp,
            download_url,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Fields of the extension's `package.json` the updater relies on.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionManifest {
    pub display_name: String,
    pub name: String,
    pub publisher: String,
}

impl ExtensionManifest {
    /// Read the manifest from a packaging descriptor on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            UpdaterError::Filesystem(format!(
                "Failed to read extension manifest {}: {err}",
                path.display()
            ))
        })?;
        Self::parse(&raw).map_err(|err| match err {
            UpdaterError::Serialization(msg) => {
                UpdaterError::Serialization(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parse the manifest from `package.json` text. Unknown fields are ignored.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| {
            UpdaterError::Serialization(format!("Invalid extension manifest: {err}"))
        })
    }

    /// `publisher.name`, used for state keys and temp file prefixes.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.publisher, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_parses_package_json_fields() {
        let raw = r#"{
            "name": "pddl",
            "displayName": "PDDL",
            "publisher": "jan-dolejsi",
            "version": "2.0.0",
            "engines": { "vscode": "^1.40.0" }
        }"#;
        let manifest = ExtensionManifest::parse(raw).unwrap();
        assert_eq!(manifest.display_name, "PDDL");
        assert_eq!(manifest.full_name(), "jan-dolejsi.pddl");
    }

    #[test]
    fn manifest_missing_publisher_is_rejected() {
        let err = ExtensionManifest::parse(r#"{"name":"x","displayName":"X"}"#).unwrap_err();
        assert!(matches!(err, UpdaterError::Serialization(_)));
    }

    #[test]
    fn manifest_load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ExtensionManifest::load(&dir.path().join("package.json")).unwrap_err();
        assert!(matches!(err, UpdaterError::Filesystem(_)));
    }
}
