//! Composer metadata lookup against the Open Opus API.

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const OPEN_OPUS_API_BASE: &str = "https://api.openopus.org";

/// A composer as described by the lookup service.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ComposerMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub complete_name: String,
    pub birth: Option<String>,
    pub death: Option<String>,
    pub epoch: Option<String>,
    pub portrait: Option<String>,
}

impl ComposerMetadata {
    /// Whether this result describes `requested`, comparing either the short
    /// or the complete name case-insensitively.
    pub fn matches(&self, requested: &str) -> bool {
        let requested = requested.trim().to_lowercase();
        !requested.is_empty()
            && (self.name.trim().to_lowercase() == requested
                || self.complete_name.trim().to_lowercase() == requested)
    }
}

/// Source of composer metadata.
pub trait ComposerLookup: Send + Sync {
    /// Returns candidates for `name`, best match first.
    fn search(&self, name: &str) -> Result<Vec<ComposerMetadata>>;
}

/// Only the first candidate is considered, and only when it matches.
pub fn confident_match<'a>(
    requested: &str,
    candidates: &'a [ComposerMetadata],
) -> Option<&'a ComposerMetadata> {
    candidates.first().filter(|c| c.matches(requested))
}

#[derive(Deserialize)]
struct SearchResponse {
    composers: Option<Vec<ComposerMetadata>>,
}

pub struct OpenOpusClient {
    client: Client,
    base_url: String,
}

impl OpenOpusClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build composer lookup HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, name: &str) -> String {
        format!(
            "{}/composer/list/search/{}.json",
            self.base_url,
            urlencoding::encode(name.trim())
        )
    }
}

impl ComposerLookup for OpenOpusClient {
    fn search(&self, name: &str) -> Result<Vec<ComposerMetadata>> {
        let url = self.search_url(name);
        debug!("Looking up composer at {}", url);

        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            anyhow::bail!("Composer lookup failed with status {}", response.status());
        }

        // A search without results carries no "composers" key at all
        let body: SearchResponse = response.json()?;
        Ok(body.composers.unwrap_or_default())
    }
}
