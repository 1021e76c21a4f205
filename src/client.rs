use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;

#[derive(Clone)]
pub struct ResidentClient {
    base_url: Arc<String>,
    http: Arc<Client>,
}

impl ResidentClient {
    /// Create a client for the resident pages under `config.base_url`.
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: Arc::new(config.base_url.trim_end_matches('/').to_string()),
            http: Arc::new(http),
        })
    }

    pub fn profile_url(&self, uuid: &str) -> String {
        format!("{}/{uuid}", self.base_url)
    }

    /// Fetch the raw HTML of a resident page. Single attempt, no retries.
    pub async fn fetch_page(&self, uuid: &str) -> Result<String> {
        let url = self.profile_url(uuid);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Network error fetching {url}: {e}"))?;

        let status = resp.status();
        tracing::debug!(%url, status = status.as_u16(), "resident page fetched");

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Resident page returned HTTP {}",
                status.as_u16()
            ));
        }

        resp.text()
            .await
            .with_context(|| format!("Failed to read body of {url}"))
    }
}
