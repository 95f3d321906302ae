//! Results file acquisition.
//!
//! The daily run can either read a results file already on disk or download
//! the latest export over HTTP first. Both paths end in the same place: raw
//! delimited text handed to the parser. The engine itself never performs
//! I/O; acquisition happens up front in the binary.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use tracing::{debug, info};

/// Abstraction over where the raw results text comes from.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch the full results text.
    async fn fetch(&self) -> Result<String>;

    /// Source name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// HTTP source
// ---------------------------------------------------------------------------

/// Downloads the published results export.
pub struct HttpSource {
    http: Client,
    url: String,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("teimosa/0.1")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl EventSource for HttpSource {
    async fn fetch(&self) -> Result<String> {
        debug!(url = %self.url, "Downloading results file");
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to download results from {}", self.url))?
            .error_for_status()
            .with_context(|| format!("Results download rejected by {}", self.url))?;

        let text = response
            .text()
            .await
            .context("Failed to read results response body")?;

        info!(url = %self.url, bytes = text.len(), "Results file downloaded");
        Ok(text)
    }

    fn name(&self) -> &str {
        "http"
    }
}

// ---------------------------------------------------------------------------
// File source
// ---------------------------------------------------------------------------

/// Reads a results file already on disk.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EventSource for FileSource {
    async fn fetch(&self) -> Result<String> {
        debug!(path = %self.path.display(), "Reading results file");
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read results file: {}", self.path.display()))
    }

    fn name(&self) -> &str {
        "file"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
