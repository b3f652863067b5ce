use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Default location of the public modlist manifest.
pub const DEFAULT_MANIFEST_URL: &str =
    "https://raw.githubusercontent.com/wabbajack-tools/mod-lists/master/modlists.json";

/// Fields of a modlist owned by the external metadata source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModlistMetadata {
    pub title: String,
    pub version: String,
    pub image_link: String,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("no modlist with id {0} in the manifest")]
    UnknownModlist(String),
    #[error("manifest request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("manifest could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where modlist titles, versions and images come from.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch(&self, modlist_id: &str) -> Result<ModlistMetadata, MetadataError>;
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    version: String,
    links: ManifestLinks,
}

#[derive(Debug, Deserialize)]
struct ManifestLinks {
    #[serde(rename = "machineURL")]
    machine_url: String,
    #[serde(default)]
    image: String,
}

/// Find a modlist by machine id in a manifest document.
pub fn find_in_manifest(body: &str, modlist_id: &str) -> Result<ModlistMetadata, MetadataError> {
    let entries: Vec<ManifestEntry> = serde_json::from_str(body)?;
    entries
        .into_iter()
        .find(|e| e.links.machine_url == modlist_id)
        .map(|e| ModlistMetadata {
            title: e.title,
            version: e.version,
            image_link: e.links.image,
        })
        .ok_or_else(|| MetadataError::UnknownModlist(modlist_id.to_string()))
}

/// Reads metadata from the JSON manifest published by the modlist gallery.
/// The manifest is downloaded on every fetch so a release always announces
/// the version that is live at that moment.
pub struct ManifestMetadataSource {
    client: reqwest::Client,
    manifest_url: String,
    timeout: Duration,
}

impl ManifestMetadataSource {
    pub fn new(client: reqwest::Client, manifest_url: String, timeout: Duration) -> Self {
        Self {
            client,
            manifest_url,
            timeout,
        }
    }
}

#[async_trait]
impl MetadataSource for ManifestMetadataSource {
    async fn fetch(&self, modlist_id: &str) -> Result<ModlistMetadata, MetadataError> {
        let body = self
            .client
            .get(&self.manifest_url)
            .header("User-Agent", "WabbaBot/1.0")
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        debug!(%modlist_id, bytes = body.len(), "fetched modlist manifest");
        find_in_manifest(&body, modlist_id)
    }
}
