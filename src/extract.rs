use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::config::ExtractConfig;
use crate::transform::jobs_from_envelope;

pub struct JobBoardClient {
    config: ExtractConfig,
    client: reqwest::blocking::Client,
}

impl JobBoardClient {
    pub fn new(config: ExtractConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    /// Fetches up to `max_pages` pages, following the board's `links.next`.
    pub fn fetch_jobs(&self) -> Result<Vec<Value>> {
        let mut jobs = Vec::new();
        let mut next = Some(self.config.url.clone());
        let mut pages = 0;

        while let Some(url) = next.take() {
            if pages >= self.config.max_pages {
                break;
            }
            let payload = self.fetch_page(&url)?;
            pages += 1;

            next = next_page(&payload);
            let page_jobs = jobs_from_envelope(payload);
            debug!(%url, count = page_jobs.len(), "fetched page");
            jobs.extend(page_jobs);
        }

        info!(pages, total = jobs.len(), "jobs fetched");
        Ok(jobs)
    }

    fn fetch_page(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "Job board request failed with status {}: {}",
                status,
                error_text
            ));
        }

        response
            .json()
            .context("Failed to parse job board response")
    }
}

fn next_page(payload: &Value) -> Option<String> {
    payload
        .pointer("/links/next")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
}

/// Writes `{"data": [...]}` as pretty JSON, creating the parent directory.
pub fn save_bronze(path: &Path, jobs: &[Value]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let body = serde_json::to_string_pretty(&json!({ "data": jobs }))?;
    fs::write(path, body)
        .with_context(|| format!("Failed to write bronze file: {}", path.display()))?;
    info!(path = %path.display(), records = jobs.len(), "bronze layer saved");
    Ok(())
}
