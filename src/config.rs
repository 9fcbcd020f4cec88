/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater::config
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Load updater configuration from TOML and expose the
    workflow options consumed by the orchestrator.

  Security / Safety Notes:
    Configuration holds host names and paths only; no
    credentials are read or stored.

  Dependencies:
    serde + toml for parsing, dirs for default locations.

  Operational Scope:
    Read once at startup by the driver binary; options are
    immutable for the lifetime of a workflow.

  Revision History:
    2026-10-16 COD  Authored updater configuration layer.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit defaults for every tunable
    - Missing optional files fall back deterministically
============================================================*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, UpdaterError};

const APP_DIR: &str = "extension-updater";

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    pub updater: UpdaterSection,
    pub confluence: ConfluenceConfig,
    pub paths: PathsConfig,
}

/// `[updater]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpdaterSection {
    pub show_up_to_date_notification: bool,
    pub force_reinstall: bool,
    /// Seconds; 0 disables the bound.
    pub download_timeout: u64,
    pub settle_delay_ms: u64,
}

impl Default for UpdaterSection {
    fn default() -> Self {
        Self {
            show_up_to_date_notification: false,
            force_reinstall: false,
            download_timeout: 300,
            settle_delay_ms: 1000,
        }
    }
}

/// `[confluence]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConfluenceConfig {
    /// Confluence host, e.g. `wiki.my-company.com`.
    pub host: String,
    /// Page the `.vsix` files are attached to (`pageId=` in the page URL).
    pub page_id: u64,
    /// Request timeout in seconds; `0` disables it.
    pub timeout: u64,
    /// Attachment name override; defaults to `<manifest name>.vsix`.
    pub file_name: Option<String>,
}

impl Default for ConfluenceConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            page_id: 0,
            timeout: 30,
            file_name: None,
        }
    }
}

impl ConfluenceConfig {
    /// Timeout for version queries, `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub state_file: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
}

/// Options steering a single `check_and_install` run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterOptions {
    /// Emit a passive notice when already current.
    pub show_up_to_date_notification: bool,
    /// Skip version comparison and the install consent prompt.
    pub force_reinstall: bool,
    /// Upper bound on the package download; `None` waits indefinitely.
    pub download_timeout: Option<Duration>,
    /// Pause between a flushed download and the install command.
    pub settle_delay: Duration,
}

impl Default for UpdaterOptions {
    fn default() -> Self {
        UpdaterSection::default().options()
    }
}

impl UpdaterSection {
    pub fn options(&self) -> UpdaterOptions {
        UpdaterOptions {
            show_up_to_date_notification: self.show_up_to_date_notification,
            force_reinstall: self.force_reinstall,
            download_timeout: (self.download_timeout > 0)
                .then(|| Duration::from_secs(self.download_timeout)),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }
}

impl UpdaterConfig {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load_from_optional_path(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(explicit) => Self::load(explicit),
            None => match default_config_path() {
                Some(default) if default.exists() => Self::load(&default),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            UpdaterError::Config(format!("Failed to read config {}: {err}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|err| {
            UpdaterError::Config(format!("Invalid config {}: {err}", path.display()))
        })
    }

    pub fn state_path(&self) -> PathBuf {
        self.paths
            .state_file
            .clone()
            .unwrap_or_else(|| data_dir().join("state.json"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.paths
            .log_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("logs"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.paths
            .manifest
            .clone()
            .unwrap_or_else(|| PathBuf::from("package.json"))
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: UpdaterConfig = toml::from_str("").unwrap();
        let options = config.updater.options();
        assert!(!options.force_reinstall);
        assert!(!options.show_up_to_date_notification);
        assert_eq!(options.download_timeout, Some(Duration::from_secs(300)));
        assert_eq!(options.settle_delay, Duration::from_millis(1000));
        assert_eq!(config.confluence.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn zero_timeouts_disable_both_limits() {
        let raw = r#"
            [updater]
            download_timeout = 0

            [confluence]
            timeout = 0
        "#;
        let config: UpdaterConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.updater.options().download_timeout, None);
        assert_eq!(config.confluence.request_timeout(), None);
    }

    #[test]
    fn sections_override_defaults() {
        let raw = r#"
            [updater]
            force_reinstall = true
            download_timeout = 0
            settle_delay_ms = 0

            [confluence]
            host = "wiki.example.com"
            page_id = 123456
            file_name = "custom.vsix"

            [paths]
            state_file = "/tmp/state.json"
        "#;
        let config: UpdaterConfig = toml::from_str(raw).unwrap();
        let options = config.updater.options();
        assert!(options.force_reinstall);
        assert_eq!(options.download_timeout, None);
        assert_eq!(options.settle_delay, Duration::ZERO);
        assert_eq!(config.confluence.host, "wiki.example.com");
        assert_eq!(config.confluence.page_id, 123456);
        assert_eq!(config.confluence.file_name.as_deref(), Some("custom.vsix"));
        assert_eq!(config.state_path(), PathBuf::from("/tmp/state.json"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let err = UpdaterConfig::load_from_optional_path(Some(&missing)).unwrap_err();
        assert!(matches!(err, UpdaterError::Config(_)));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[confluence]\npage_id = \"nope\"\n").unwrap();
        let err = UpdaterConfig::load(&path).unwrap_err();
        assert!(matches!(err, UpdaterError::Config(_)));
    }
}
