/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater::updater
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Orchestrate one update run: check the version source,
    compare against the persisted install, obtain consent,
    download, install, persist and offer a reload.

  Security / Safety Notes:
    Packages are installed without signature verification; the
    version source and host install command are trusted.

  Dependencies:
    tokio for the download timeout, host collaborator traits
    for state, UI and command execution.

  Operational Scope:
    At most one `check_and_install` per process at a time;
    concurrent runs are not guarded.

  Revision History:
    2026-10-16 COD  Authored update orchestration workflow.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Linear stages with logged transitions
    - Version state advanced only after confirmed install
    - Failures propagate to the caller untouched
============================================================*/

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::UpdaterOptions;
use crate::download::{allocate_temp_file_in, settle, DownloadedPackage, PackageDownloader, PACKAGE_FILE_MODE};
use crate::error::{Result, UpdaterError};
use crate::host::{CommandExecutor, HostUi, StateStore, INSTALL_COMMAND, RELOAD_COMMAND};
use crate::logger::Logger;
use crate::package_info::{ExtensionManifest, VersionInfo};
use crate::source::VersionSource;
use crate::state::{installed_version, migrate_legacy_key, VersionKeys, NEVER_INSTALLED};

const INSTALL_ACTION: &str = "Download and Install";
const RELOAD_ACTION: &str = "Reload";
const LATER_ACTION: &str = "Later";
const PACKAGE_SUFFIX: &str = ".vsix";

/// Workflow stages, in the order a run can visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStage {
    Idle,
    Checking,
    UpToDate,
    AwaitingConsent,
    Aborted,
    Downloading,
    Settling,
    Installing,
    Failed,
    Installed,
    AwaitingReloadConsent,
    Reloaded,
    Deferred,
}

impl UpdateStage {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateStage::Idle => "idle",
            UpdateStage::Checking => "checking",
            UpdateStage::UpToDate => "up-to-date",
            UpdateStage::AwaitingConsent => "awaiting-consent",
            UpdateStage::Aborted => "aborted",
            UpdateStage::Downloading => "downloading",
            UpdateStage::Settling => "settling",
            UpdateStage::Installing => "installing",
            UpdateStage::Failed => "failed",
            UpdateStage::Installed => "installed",
            UpdateStage::AwaitingReloadConsent => "awaiting-reload-consent",
            UpdateStage::Reloaded => "reloaded",
            UpdateStage::Deferred => "deferred",
        }
    }
}

/// Terminal state of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    UpToDate { installed: i64, latest: i64 },
    Declined { latest: i64 },
    Installed { version: i64, reloaded: bool },
}

/// Host services the orchestrator drives.
#[derive(Clone)]
pub struct HostServices {
    pub store: Arc<dyn StateStore>,
    pub ui: Arc<dyn HostUi>,
    pub executor: Arc<dyn CommandExecutor>,
}

/// Whether a run with these versions goes past the check stage.
pub fn should_update(installed: i64, latest: i64, force_reinstall: bool) -> bool {
    force_reinstall || installed < latest
}

/// Fragment for the install prompt naming how far behind the install is.
///
/// Empty unless a version was installed before and the gap exceeds one.
pub fn versions_behind_warning(installed: i64, latest: i64) -> String {
    if installed <= NEVER_INSTALLED {
        return String::new();
    }
    match latest.checked_sub(installed) {
        Some(gap) if gap > 1 => format!("is {gap} releases behind and "),
        _ => String::new(),
    }
}

/// Checks for, downloads and installs new releases of one extension.
pub struct UpdateOrchestrator {
    manifest: ExtensionManifest,
    options: UpdaterOptions,
    keys: VersionKeys,
    source: Arc<dyn VersionSource>,
    host: HostServices,
    downloader: PackageDownloader,
    temp_dir: PathBuf,
    logger: Arc<Logger>,
}

impl UpdateOrchestrator {
    /// Build the orchestrator and migrate any deprecated version key.
    pub fn new(
        manifest: ExtensionManifest,
        options: UpdaterOptions,
        source: Arc<dyn VersionSource>,
        host: HostServices,
        logger: Arc<Logger>,
    ) -> Result<Self> {
        let keys = VersionKeys::for_manifest(&manifest);
        migrate_legacy_key(host.store.as_ref(), &keys, &logger)?;
        let downloader = PackageDownloader::new(logger.clone())?;

        Ok(Self {
            manifest,
            options,
            keys,
            source,
            host,
            downloader,
            temp_dir: std::env::temp_dir(),
            logger,
        })
    }

    /// Directory receiving downloaded packages.
    pub fn with_temp_dir(mut self, dir: PathBuf) -> Self {
        self.temp_dir = dir;
        self
    }

    pub fn keys(&self) -> &VersionKeys {
        &self.keys
    }

    /// Last version installed through the updater, or `-1`.
    pub fn installed_version(&self) -> i64 {
        installed_version(self.host.store.as_ref(), &self.keys)
    }

    /// Run the check, consent, download, install, persist and reload sequence.
    pub async fn check_and_install(&self) -> Result<UpdateOutcome> {
        let display_name = self.manifest.display_name.clone();
        self.enter(UpdateStage::Idle);

        self.enter(UpdateStage::Checking);
        self.logger
            .debug("SOURCE", format!("Querying {}", self.source.describe()));
        let latest = self
            .with_progress(
                &format!("Checking for updates for {display_name}"),
                self.source.latest_version(),
            )
            .await?;
        let installed = self.installed_version();

        if !should_update(installed, latest.version, self.options.force_reinstall) {
            self.enter(UpdateStage::UpToDate);
            let message = format!("No update found for '{display_name}'");
            self.logger.info("CURRENT", &message);
            if self.options.show_up_to_date_notification {
                self.host.ui.show_information(&message).await;
            }
            return Ok(UpdateOutcome::UpToDate {
                installed,
                latest: latest.version,
            });
        }

        self.logger.info(
            "AVAILABLE",
            format!("installed={installed} latest={}", latest.version),
        );

        if !self.options.force_reinstall {
            self.enter(UpdateStage::AwaitingConsent);
            if !self.consent_to_install(installed, &latest).await {
                self.enter(UpdateStage::Aborted);
                return Ok(UpdateOutcome::Declined {
                    latest: latest.version,
                });
            }
        }

        self.enter(UpdateStage::Downloading);
        let package = self
            .with_progress(&format!("Downloading {display_name}"), self.download(&latest))
            .await?;

        self.enter(UpdateStage::Settling);
        settle(self.options.settle_delay).await;

        self.enter(UpdateStage::Installing);
        let installed_ok = self
            .with_progress(&format!("Installing {display_name}"), self.install(&package.path))
            .await;
        if let Err(err) = installed_ok {
            self.enter(UpdateStage::Failed);
            self.logger.error("INSTALL", err.to_string());
            return Err(err);
        }

        self.host
            .store
            .update(&self.keys.current, Some(latest.version))?;
        self.enter(UpdateStage::Installed);

        self.enter(UpdateStage::AwaitingReloadConsent);
        let reloaded = if self.consent_to_reload().await {
            self.host.executor.execute(RELOAD_COMMAND, &[]).await?;
            self.enter(UpdateStage::Reloaded);
            true
        } else {
            self.enter(UpdateStage::Deferred);
            false
        };

        Ok(UpdateOutcome::Installed {
            version: latest.version,
            reloaded,
        })
    }

    fn enter(&self, stage: UpdateStage) {
        self.logger.debug("STAGE", stage.as_str());
    }

    async fn with_progress<T, F>(&self, title: &str, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.host.ui.progress_begin(title);
        let result = work.await;
        self.host.ui.progress_end(title);
        result
    }

    async fn consent_to_install(&self, installed: i64, latest: &VersionInfo) -> bool {
        let message = format!(
            "New version of the '{}' extension is available. The one you are currently using {}may no longer work correctly with the other tools.",
            self.manifest.display_name,
            versions_behind_warning(installed, latest.version)
        );
        let answer = self.host.ui.show_warning(&message, &[INSTALL_ACTION]).await;
        answer.as_deref() == Some(INSTALL_ACTION)
    }

    async fn consent_to_reload(&self) -> bool {
        let message = format!(
            "New version of the '{}' was installed.",
            self.manifest.display_name
        );
        let answer = self
            .host
            .ui
            .show_warning(&message, &[RELOAD_ACTION, LATER_ACTION])
            .await;
        answer.as_deref() == Some(RELOAD_ACTION)
    }

    async fn download(&self, latest: &VersionInfo) -> Result<DownloadedPackage> {
        let path = allocate_temp_file_in(
            &self.temp_dir,
            PACKAGE_FILE_MODE,
            &self.manifest.full_name(),
            PACKAGE_SUFFIX,
        )?;
        let transfer = self.downloader.download(&latest.download_url, &path);

        let result = match self.options.download_timeout {
            Some(limit) => tokio::time::timeout(limit, transfer).await.unwrap_or_else(|_| {
                Err(UpdaterError::Network(format!(
                    "Download from {} timed out after {}s",
                    latest.download_url,
                    limit.as_secs_f32()
                )))
            }),
            None => transfer.await,
        };

        if result.is_err() {
            discard_partial(&path, &self.logger);
        }
        result
    }

    async fn install(&self, package: &Path) -> Result<()> {
        let args = [package.to_string_lossy().into_owned()];
        self.host
            .executor
            .execute(INSTALL_COMMAND, &args)
            .await
            .map_err(|err| match err {
                UpdaterError::Install(_) => err,
                other => UpdaterError::Install(format!(
                    "Failed to install {}: {other}",
                    package.display()
                )),
            })
    }
}

fn discard_partial(path: &Path, logger: &Logger) {
    if let Err(err) = std::fs::remove_file(path) {
        logger.warn(
            "CLEANUP",
            format!("Leaving partial download {}: {err}", path.display()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use reqwest::Url;

    use crate::state::MemoryStateStore;
    use crate::test_utils::{
        sample_manifest, serve_once, serve_stalled, Journal, RecordingExecutor, ScriptedUi,
        StaticSource,
    };

    fn quick_options() -> UpdaterOptions {
        UpdaterOptions {
            settle_delay: Duration::ZERO,
            ..UpdaterOptions::default()
        }
    }

    #[test]
    fn update_decision_matches_version_order() {
        for installed in -1..8 {
            for latest in 0..8 {
                assert_eq!(should_update(installed, latest, false), installed < latest);
                assert!(should_update(installed, latest, true));
            }
        }
    }

    #[test]
    fn behind_warning_only_for_known_gaps() {
        assert_eq!(versions_behind_warning(NEVER_INSTALLED, 5), "");
        assert_eq!(versions_behind_warning(4, 5), "");
        assert_eq!(versions_behind_warning(2, 5), "is 3 releases behind and ");
    }

    #[test]
    fn behind_warning_survives_extreme_versions() {
        assert_eq!(versions_behind_warning(NEVER_INSTALLED, i64::MAX), "");
        assert_eq!(versions_behind_warning(i64::MIN, i64::MAX), "");
        assert_eq!(versions_behind_warning(-5, i64::MAX), "");
        assert_eq!(versions_behind_warning(i64::MAX, i64::MIN), "");
        assert_eq!(
            versions_behind_warning(0, i64::MAX),
            format!("is {} releases behind and ", i64::MAX)
        );
    }

    #[test]
    fn stage_names_are_distinct() {
        let stages = [
            UpdateStage::Idle,
            UpdateStage::Checking,
            UpdateStage::UpToDate,
            UpdateStage::AwaitingConsent,
            UpdateStage::Aborted,
            UpdateStage::Downloading,
            UpdateStage::Settling,
            UpdateStage::Installing,
            UpdateStage::Failed,
            UpdateStage::Installed,
            UpdateStage::AwaitingReloadConsent,
            UpdateStage::Reloaded,
            UpdateStage::Deferred,
        ];
        let mut names: Vec<&str> = stages.iter().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), stages.len());
    }

    #[test]
    fn construction_migrates_deprecated_key() {
        let keys = VersionKeys::for_manifest(&sample_manifest());
        let store = Arc::new(MemoryStateStore::with_value(&keys.deprecated, 3));
        let journal = Journal::default();
        let host = HostServices {
            store: store.clone(),
            ui: Arc::new(ScriptedUi::new(&[], journal.clone())),
            executor: Arc::new(RecordingExecutor::new(journal.clone())),
        };
        let source = Arc::new(StaticSource::failing(journal));

        let updater = UpdateOrchestrator::new(
            sample_manifest(),
            quick_options(),
            source,
            host,
            Arc::new(Logger::stderr_only()),
        )
        .unwrap();

        assert_eq!(updater.installed_version(), 3);
        assert_eq!(store.get(&keys.deprecated), None);
    }

    #[tokio::test]
    async fn source_failure_skips_everything_else() {
        let journal = Journal::default();
        let ui = Arc::new(ScriptedUi::new(&[Some(INSTALL_ACTION)], journal.clone()));
        let executor = Arc::new(RecordingExecutor::new(journal.clone()));
        let host = HostServices {
            store: Arc::new(MemoryStateStore::new()),
            ui,
            executor: executor.clone(),
        };
        let updater = UpdateOrchestrator::new(
            sample_manifest(),
            quick_options(),
            Arc::new(StaticSource::failing(journal.clone())),
            host,
            Arc::new(Logger::stderr_only()),
        )
        .unwrap();

        let err = updater.check_and_install().await.unwrap_err();
        assert!(matches!(err, UpdaterError::RemoteFetch(_)));
        assert_eq!(journal.entries(), vec!["fetch".to_string()]);
        assert!(executor.calls().is_empty());
    }

    #[tokio::test]
    async fn stalled_download_times_out() {
        let server = serve_stalled().await;
        let journal = Journal::default();
        let dir = tempfile::tempdir().unwrap();
        let release = VersionInfo::new(2, 2, server.url("/pkg.vsix"));
        let executor = Arc::new(RecordingExecutor::new(journal.clone()));
        let store = Arc::new(MemoryStateStore::new());
        let host = HostServices {
            store: store.clone(),
            ui: Arc::new(ScriptedUi::new(&[Some(INSTALL_ACTION)], journal.clone())),
            executor: executor.clone(),
        };
        let options = UpdaterOptions {
            download_timeout: Some(Duration::from_millis(200)),
            ..quick_options()
        };
        let updater = UpdateOrchestrator::new(
            sample_manifest(),
            options,
            Arc::new(StaticSource::new(release, journal)),
            host,
            Arc::new(Logger::stderr_only()),
        )
        .unwrap()
        .with_temp_dir(dir.path().to_path_buf());

        let err = updater.check_and_install().await.unwrap_err();
        assert!(matches!(err, UpdaterError::Network(_)));
        assert!(executor.calls().is_empty());
        assert_eq!(updater.installed_version(), NEVER_INSTALLED);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn declined_reload_leaves_install_persisted() {
        let server = serve_once(200, b"vsix".to_vec()).await;
        let journal = Journal::default();
        let dir = tempfile::tempdir().unwrap();
        let release = VersionInfo::new(4, 4, Url::parse(&format!("{}/p.vsix", server.base_url())).unwrap());
        let executor = Arc::new(RecordingExecutor::new(journal.clone()));
        let host = HostServices {
            store: Arc::new(MemoryStateStore::new()),
            ui: Arc::new(ScriptedUi::new(
                &[Some(INSTALL_ACTION), Some(LATER_ACTION)],
                journal.clone(),
            )),
            executor: executor.clone(),
        };
        let updater = UpdateOrchestrator::new(
            sample_manifest(),
            quick_options(),
            Arc::new(StaticSource::new(release, journal)),
            host,
            Arc::new(Logger::stderr_only()),
        )
        .unwrap()
        .with_temp_dir(dir.path().to_path_buf());

        let outcome = updater.check_and_install().await.unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::Installed {
                version: 4,
                reloaded: false
            }
        );
        assert_eq!(updater.installed_version(), 4);
        let commands: Vec<String> = executor.calls().into_iter().map(|(c, _)| c).collect();
        assert_eq!(commands, vec![INSTALL_COMMAND.to_string()]);
    }
}
