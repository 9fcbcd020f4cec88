/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater::state
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Track the last successfully installed release number in
    durable key-value storage, including the one-time move
    away from the deprecated key name.

  Security / Safety Notes:
    The state file holds integers keyed by extension identity
    only. Writes replace the file wholesale.

  Dependencies:
    serde_json for the file-backed store.

  Operational Scope:
    `JsonStateStore` serves standalone runs; embedders supply
    their host's store through the `StateStore` trait.

  Revision History:
    2026-10-16 COD  Added version keys, migration and stores.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Version state advances only after confirmed installs
    - Idempotent migration
============================================================*/

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, UpdaterError};
use crate::host::StateStore;
use crate::logger::Logger;
use crate::package_info::ExtensionManifest;

/// Sentinel for "never installed through the updater".
pub const NEVER_INSTALLED: i64 = -1;

const CURRENT_SUFFIX: &str = "lastInstalledUpdaterVersion";
const DEPRECATED_SUFFIX: &str = "lastInstalledConfluenceAttachmentVersion";

/// Storage keys for the persisted version of one extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionKeys {
    pub current: String,
    pub deprecated: String,
}

impl VersionKeys {
    pub fn for_manifest(manifest: &ExtensionManifest) -> Self {
        let full_name = manifest.full_name();
        Self {
            current: format!("{full_name}.{CURRENT_SUFFIX}"),
            deprecated: format!("{full_name}.{DEPRECATED_SUFFIX}"),
        }
    }
}

/// Move a value stored under the deprecated key to the current key.
///
/// An existing current value wins over the deprecated one. The deprecated
/// key is cleared in either case. Returns whether anything changed.
pub fn migrate_legacy_key(store: &dyn StateStore, keys: &VersionKeys, logger: &Logger) -> Result<bool> {
    let Some(legacy) = store.get(&keys.deprecated) else {
        return Ok(false);
    };

    match store.get(&keys.current) {
        None => {
            store.update(&keys.current, Some(legacy))?;
            logger.info(
                "MIGRATE",
                format!("Moved version {legacy} from {} to {}", keys.deprecated, keys.current),
            );
        }
        Some(current) => logger.warn(
            "MIGRATE",
            format!(
                "Discarding {}={legacy}; {} already holds {current}",
                keys.deprecated, keys.current
            ),
        ),
    }
    store.update(&keys.deprecated, None)?;
    Ok(true)
}

/// Installed version under `keys`, or [`NEVER_INSTALLED`].
pub fn installed_version(store: &dyn StateStore, keys: &VersionKeys) -> i64 {
    store.get(&keys.current).unwrap_or(NEVER_INSTALLED)
}

/// In-process store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    values: Mutex<BTreeMap<String, i64>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: i64) -> Self {
        let store = Self::default();
        if let Ok(mut values) = store.values.lock() {
            values.insert(key.to_string(), value);
        }
        store
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &str) -> Option<i64> {
        self.values.lock().ok()?.get(key).copied()
    }

    fn update(&self, key: &str, value: Option<i64>) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| UpdaterError::Runtime("state store lock poisoned".into()))?;
        match value {
            Some(value) => values.insert(key.to_string(), value),
            None => values.remove(key),
        };
        Ok(())
    }
}

/// Store persisted as a flat JSON object of integers.
#[derive(Debug)]
pub struct JsonStateStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, i64>>,
}

impl JsonStateStore {
    /// Open the store at `path`; a missing file starts empty.
    pub fn open(path: &Path) -> Result<Self> {
        let values = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|err| {
                UpdaterError::Serialization(format!(
                    "Invalid state file {}: {err}",
                    path.display()
                ))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                return Err(UpdaterError::Filesystem(format!(
                    "Failed to read state file {}: {err}",
                    path.display()
                )))
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, i64>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                UpdaterError::Filesystem(format!(
                    "Failed to create state directory {}: {err}",
                    parent.display()
                ))
            })?;
        }
        let rendered = serde_json::to_string_pretty(values).map_err(|err| {
            UpdaterError::Serialization(format!("Failed to encode state: {err}"))
        })?;
        std::fs::write(&self.path, rendered).map_err(|err| {
            UpdaterError::Filesystem(format!(
                "Failed to write state file {}: {err}",
                self.path.display()
            ))
        })
    }
}

impl StateStore for JsonStateStore {
    fn get(&self, key: &str) -> Option<i64> {
        self.values.lock().ok()?.get(key).copied()
    }

    fn update(&self, key: &str, value: Option<i64>) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| UpdaterError::Runtime("state store lock poisoned".into()))?;
        match value {
            Some(value) => values.insert(key.to_string(), value),
            None => values.remove(key),
        };
        self.persist(&values)
    }
}
