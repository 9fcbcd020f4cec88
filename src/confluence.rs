/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater::confluence
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Query a Confluence page's attachment listing to discover
    the newest uploaded `.vsix` package and where to fetch it.

  Security / Safety Notes:
    Performs read-only anonymous HTTPS GET requests. The raw
    listing is logged only when it cannot be interpreted.

  Dependencies:
    reqwest for HTTP, serde for response parsing, urlencoding
    for the attachment file name.

  Operational Scope:
    Default VersionSource for extensions published as page
    attachments. REST reference:
    /rest/api/content/{id}/child/attachment

  Revision History:
    2026-10-16 COD  Implemented Confluence attachment source.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Structured response parsing with explicit error paths
    - Configurable timeouts
============================================================*/

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Url;
use serde::Deserialize;
use urlencoding::encode;

use crate::config::ConfluenceConfig;
use crate::error::{Result, UpdaterError};
use crate::logger::Logger;
use crate::package_info::{ExtensionManifest, VersionInfo};
use crate::source::VersionSource;

const PACKAGE_SUFFIX: &str = ".vsix";

/// Version source backed by Confluence page attachments.
pub struct ConfluenceSource {
    client: reqwest::Client,
    base_url: String,
    page_id: u64,
    file_name: String,
    logger: Arc<Logger>,
}

impl ConfluenceSource {
    /// Construct a source for `manifest` from configuration.
    pub fn new(
        config: &ConfluenceConfig,
        manifest: &ExtensionManifest,
        logger: Arc<Logger>,
    ) -> Result<Self> {
        let host = config.host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(UpdaterError::Config("confluence.host must be set".into()));
        }
        if config.page_id == 0 {
            return Err(UpdaterError::Config("confluence.page_id must be set".into()));
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("extension-updater/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| UpdaterError::Network(format!("Failed to build HTTP client: {err}")))?;

        let file_name = config
            .file_name
            .clone()
            .unwrap_or_else(|| format!("{}{PACKAGE_SUFFIX}", manifest.name));

        Ok(Self {
            client,
            base_url: format!("https://{host}"),
            page_id: config.page_id,
            file_name,
            logger,
        })
    }

    /// Attachment listing URL for the configured page and file.
    pub fn version_url(&self) -> String {
        format!(
            "{}/rest/api/content/{}/child/attachment?filename={}&expand=version",
            self.base_url,
            self.page_id,
            encode(&self.file_name)
        )
    }
}

#[async_trait]
impl VersionSource for ConfluenceSource {
    fn describe(&self) -> String {
        format!("confluence page {} ({})", self.page_id, self.file_name)
    }

    async fn latest_version(&self) -> Result<VersionInfo> {
        let url = self.version_url();
        self.logger
            .info("CHECK", format!("Checking for new versions at {url}"));

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| {
                self.logger.error("NETWORK", format!("Request to {url} failed: {err}"));
                UpdaterError::Network(format!("Confluence request to {url} failed: {err}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| {
            UpdaterError::Network(format!("Failed to read Confluence response from {url}: {err}"))
        })?;

        if !status.is_success() {
            self.logger.warn("LISTING", format!("status={status} body={body}"));
            return Err(UpdaterError::RemoteFetch(format!(
                "Confluence responded with status {status} for {url}"
            )));
        }

        parse_attachment_listing(&body).inspect_err(|_| {
            self.logger.warn("LISTING", format!("Unexpected response: {body}"));
        })
    }
}

#[derive(Debug, Deserialize)]
struct AttachmentListing {
    results: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    version: AttachmentVersion,
    #[serde(rename = "_links")]
    links: AttachmentLinks,
    #[serde(default)]
    metadata: Option<AttachmentMetadata>,
}

#[derive(Debug, Deserialize)]
struct AttachmentVersion {
    number: i64,
}

#[derive(Debug, Deserialize)]
struct AttachmentLinks {
    download: String,
    #[serde(rename = "self")]
    self_link: String,
}

#[derive(Debug, Default, Deserialize)]
struct AttachmentMetadata {
    #[serde(default)]
    labels: Option<LabelPage>,
}

#[derive(Debug, Default, Deserialize)]
struct LabelPage {
    #[serde(default)]
    results: Vec<Label>,
}

#[derive(Debug, Deserialize)]
struct Label {
    name: String,
}

/// Interpret the first entry of an attachment listing.
pub fn parse_attachment_listing(body: &str) -> Result<VersionInfo> {
    let listing: AttachmentListing = serde_json::from_str(body).map_err(|err| {
        UpdaterError::RemoteFetch(format!("Unexpected response from Confluence: {err}"))
    })?;

    let first = listing
        .results
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| {
            UpdaterError::RemoteFetch(
                "Unexpected response from Confluence: no attachment results".into(),
            )
        })?;

    let attachment: Attachment = serde_json::from_value(first).map_err(|err| {
        UpdaterError::RemoteFetch(format!("Malformed Confluence attachment entry: {err}"))
    })?;

    let download_url = resolve_download_url(&attachment.links.self_link, &attachment.links.download)?;
    let tags = attachment
        .metadata
        .and_then(|metadata| metadata.labels)
        .map(|labels| labels.results.into_iter().map(|label| label.name).collect())
        .unwrap_or_default();

    let version = attachment.version.number;
    // Sourced from the version number, as the listing is consumed today.
    let timestamp = version;

    Ok(VersionInfo::new(version, timestamp, download_url).with_tags(tags))
}

/// Combine the scheme and authority of `self_link` with the path (and query)
/// of `download`.
///
/// The download path is kept as given, never resolved against the self link's
/// directory.
pub fn resolve_download_url(self_link: &str, download: &str) -> Result<Url> {
    let origin = Url::parse(self_link).map_err(|err| {
        UpdaterError::RemoteFetch(format!("Invalid attachment self link `{self_link}`: {err}"))
    })?;
    if origin.cannot_be_a_base() {
        return Err(UpdaterError::RemoteFetch(format!(
            "Attachment self link `{self_link}` has no authority"
        )));
    }

    let (path, query) = match Url::parse(download) {
        Ok(absolute) => (absolute.path().to_string(), absolute.query().map(str::to_string)),
        Err(_) => {
            let without_fragment = download.split('#').next().unwrap_or_default();
            match without_fragment.split_once('?') {
                Some((path, query)) => (path.to_string(), Some(query.to_string())),
                None => (without_fragment.to_string(), None),
            }
        }
    };

    let mut resolved = origin;
    if path.starts_with('/') {
        resolved.set_path(&path);
    } else {
        resolved.set_path(&format!("/{path}"));
    }
    resolved.set_query(query.as_deref());
    resolved.set_fragment(None);
    Ok(resolved)
}
