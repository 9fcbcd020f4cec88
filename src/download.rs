/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater::download
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Allocate a temporary package file and stream a release
    into it, signalling completion only once the bytes are
    flushed and synced to disk.

  Security / Safety Notes:
    Temporary packages are created 0644 with a unique name.
    A failed download may leave its temp file behind.

  Dependencies:
    reqwest for streaming GET, tempfile for unique names,
    tokio::fs for async writes, sha2 for a diagnostic digest.

  Operational Scope:
    Invoked by the orchestrator between consent and install.

  Revision History:
    2026-10-16 COD  Implemented package download pipeline.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit completion signal before handing files onward
    - Status codes checked before any byte is written
============================================================*/

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::{Result, UpdaterError};
use crate::logger::Logger;

/// Mode of downloaded package files.
pub const PACKAGE_FILE_MODE: u32 = 0o644;

/// Reserve a uniquely named file in `dir`.
///
/// The file persists after this call; callers own its cleanup.
pub fn allocate_temp_file_in(dir: &Path, mode: u32, prefix: &str, suffix: &str) -> Result<PathBuf> {
    let file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(|err| {
            UpdaterError::Filesystem(format!(
                "Failed to create temporary file in {}: {err}",
                dir.display()
            ))
        })?;
    let path = file.into_temp_path().keep().map_err(|err| {
        UpdaterError::Filesystem(format!("Failed to keep temporary file: {err}"))
    })?;

    // Set explicitly so the process umask does not narrow the mode.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).map_err(|err| {
            UpdaterError::Filesystem(format!(
                "Failed to set mode {mode:o} on {}: {err}",
                path.display()
            ))
        })?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(path)
}

/// Outcome of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedPackage {
    pub path: PathBuf,
    pub bytes: u64,
    pub sha256: String,
}

/// Streams release packages to local files.
#[derive(Clone)]
pub struct PackageDownloader {
    client: reqwest::Client,
    logger: Arc<Logger>,
}

impl PackageDownloader {
    pub fn new(logger: Arc<Logger>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("extension-updater/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|err| UpdaterError::Network(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self { client, logger })
    }

    /// GET `url` and write the body to `destination`.
    ///
    /// Returns after the file is flushed, synced and closed.
    pub async fn download(&self, url: &Url, destination: &Path) -> Result<DownloadedPackage> {
        let mut response = self.client.get(url.clone()).send().await.map_err(|err| {
            self.logger.error("NETWORK", format!("Download request failed: {err}"));
            UpdaterError::Network(format!("Download from {url} failed: {err}"))
        })?;

        let status = response.status();
        if status.as_u16() >= 300 {
            self.logger.error("DOWNLOAD", format!("statusCode: {}", status.as_u16()));
            return Err(UpdaterError::Download {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let mut file = File::create(destination).await.map_err(|err| {
            UpdaterError::Filesystem(format!(
                "Failed to open {} for writing: {err}",
                destination.display()
            ))
        })?;

        let mut hasher = Sha256::new();
        let mut bytes = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(|err| {
            UpdaterError::Network(format!("Download from {url} interrupted: {err}"))
        })? {
            hasher.update(&chunk);
            bytes += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        let package = DownloadedPackage {
            path: destination.to_path_buf(),
            bytes,
            sha256: format!("{:x}", hasher.finalize()),
        };
        self.logger.info(
            "DOWNLOAD",
            format!(
                "Done downloading extension package to {} ({} bytes, sha256 {})",
                package.path.display(),
                package.bytes,
                package.sha256
            ),
        );
        Ok(package)
    }
}

/// Fallback pause before handing a freshly written package to the installer.
pub async fn settle(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{closed_base_url, serve_once, serve_redirect};

    fn downloader() -> PackageDownloader {
        PackageDownloader::new(Arc::new(Logger::stderr_only())).unwrap()
    }

    #[test]
    fn temp_files_are_unique_and_named() {
        let dir = tempfile::tempdir().unwrap();
        let first = allocate_temp_file_in(dir.path(), PACKAGE_FILE_MODE, "pub.ext", ".vsix").unwrap();
        let second = allocate_temp_file_in(dir.path(), PACKAGE_FILE_MODE, "pub.ext", ".vsix").unwrap();

        assert_ne!(first, second);
        for path in [&first, &second] {
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with("pub.ext"));
            assert!(name.ends_with(".vsix"));
            assert!(path.exists());
        }
    }

    #[cfg(unix)]
    #[test]
    fn temp_files_use_requested_mode() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = allocate_temp_file_in(dir.path(), 0o644, "pub.ext", ".vsix").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[tokio::test]
    async fn body_is_written_and_digested() {
        let server = serve_once(200, b"PK\x03\x04package".to_vec()).await;
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("pkg.vsix");
        let url = Url::parse(&format!("{}/download/pkg.vsix", server.base_url())).unwrap();

        let package = downloader().download(&url, &destination).await.unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"PK\x03\x04package");
        assert_eq!(package.bytes, 11);
        assert_eq!(package.sha256, format!("{:x}", Sha256::digest(b"PK\x03\x04package")));
        assert!(server.request().await.starts_with("GET /download/pkg.vsix "));
    }

    #[tokio::test]
    async fn not_found_is_download_error() {
        let server = serve_once(404, b"missing".to_vec()).await;
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("pkg.vsix");
        let url = Url::parse(&format!("{}/gone.vsix", server.base_url())).unwrap();

        let err = downloader().download(&url, &destination).await.unwrap_err();
        assert!(matches!(err, UpdaterError::Download { status: 404, .. }));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn redirect_is_not_followed() {
        let target = serve_once(200, b"payload".to_vec()).await;
        let server = serve_redirect(302, &target.url("/real.vsix")).await;
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("pkg.vsix");

        let err = downloader()
            .download(&server.url("/moved.vsix"), &destination)
            .await
            .unwrap_err();

        assert!(matches!(err, UpdaterError::Download { status: 302, .. }));
        assert!(!destination.exists());
        assert!(server.request().await.starts_with("GET /moved.vsix "));
    }

    #[tokio::test]
    async fn not_modified_status_is_rejected() {
        let server = serve_once(304, Vec::new()).await;
        let dir = tempfile::tempdir().unwrap();
        let url = Url::parse(&format!("{}/cached.vsix", server.base_url())).unwrap();

        let err = downloader()
            .download(&url, &dir.path().join("pkg.vsix"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdaterError::Download { status: 304, .. }));
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::parse(&format!("{}/pkg.vsix", closed_base_url().await)).unwrap();

        let err = downloader()
            .download(&url, &dir.path().join("pkg.vsix"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpdaterError::Network(_)));
    }

    #[tokio::test]
    async fn zero_settle_returns_immediately() {
        let started = std::time::Instant::now();
        settle(Duration::ZERO).await;
        assert!(started.elapsed() < Duration::from_millis(500));
    }
}
