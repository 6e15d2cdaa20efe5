use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Outbound GET transport. Every call carries its own timeout.
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String>;

    async fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct ReqwestFetch {
    http: Client,
}

impl ReqwestFetch {
    pub fn new() -> Result<Self> {
        Ok(Self::with_client(build_client()?))
    }

    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    async fn get(&self, url: &str, timeout: Duration) -> Result<reqwest::Response> {
        debug!(%url, ?timeout, "GET");
        let res = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .with_context(|| format!("failed to reach {}", url))?;
        if !res.status().is_success() {
            return Err(anyhow!("GET {} returned {}", url, res.status()));
        }
        Ok(res)
    }
}

/// Shared client for source fetches, image downloads and AI calls.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("wp-autosync/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn get_text(&self, url: &str, timeout: Duration) -> Result<String> {
        let res = self.get(url, timeout).await?;
        res.text()
            .await
            .with_context(|| format!("failed to read body of {}", url))
    }

    async fn get_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let res = self.get(url, timeout).await?;
        let bytes = res
            .bytes()
            .await
            .with_context(|| format!("failed to read body of {}", url))?;
        Ok(bytes.to_vec())
    }
}
