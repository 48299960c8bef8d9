//! Client for the PDF-to-PNG thumbnail rendering service.

use anyhow::{Context, Result};
use reqwest::blocking::{multipart, Client};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Renders the first page of a PDF into PNG bytes.
pub trait ThumbnailRenderer: Send + Sync {
    fn render(&self, pdf_path: &Path, safe_sheet_name: &str) -> Result<Vec<u8>>;
}

/// Posts the PDF as multipart form data (`file` part plus `name` field) and
/// expects the PNG in a 200 response body.
pub struct HttpThumbnailClient {
    client: Client,
    endpoint: String,
}

impl HttpThumbnailClient {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build thumbnail HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

impl ThumbnailRenderer for HttpThumbnailClient {
    fn render(&self, pdf_path: &Path, safe_sheet_name: &str) -> Result<Vec<u8>> {
        let form = multipart::Form::new()
            .text("name", safe_sheet_name.to_string())
            .file("file", pdf_path)
            .with_context(|| format!("Failed to attach {:?}", pdf_path))?;

        debug!("Requesting thumbnail for {} from {}", safe_sheet_name, self.endpoint);
        let response = self.client.post(&self.endpoint).multipart(form).send()?;

        if response.status() != reqwest::StatusCode::OK {
            anyhow::bail!("Thumbnail service answered {}", response.status());
        }

        let bytes = response.bytes()?;
        if bytes.is_empty() {
            anyhow::bail!("Thumbnail service returned an empty body");
        }
        Ok(bytes.to_vec())
    }
}
