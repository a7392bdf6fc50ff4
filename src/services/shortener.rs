//! URL shortening for links placed in messages

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::settings::ShortenerConfig;
use crate::utils::errors::{PoolMateError, Result};

#[async_trait]
pub trait UrlShortener: Send + Sync {
    async fn shorten(&self, url: &str) -> Result<String>;
}

/// Shortener speaking the TinyURL-style `GET <api>?url=<long>` protocol,
/// which answers with the short URL as plain text
#[derive(Clone)]
pub struct HttpUrlShortener {
    client: Client,
    api_url: String,
}

impl HttpUrlShortener {
    pub fn new(config: &ShortenerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("PoolMate/1.0")
            .build()
            .map_err(PoolMateError::Http)?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl UrlShortener for HttpUrlShortener {
    async fn shorten(&self, url: &str) -> Result<String> {
        let request_url = format!("{}?url={}", self.api_url, urlencoding::encode(url));
        let response = self.client.get(&request_url).send().await?;

        if !response.status().is_success() {
            return Err(PoolMateError::InvalidInput(format!(
                "Shortener returned HTTP {}",
                response.status()
            )));
        }

        let short = response.text().await?.trim().to_string();
        url::Url::parse(&short)?;

        debug!(short_url = %short, "URL shortened");
        Ok(short)
    }
}

/// Shortener used when shortening is disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughShortener;

#[async_trait]
impl UrlShortener for PassthroughShortener {
    async fn shorten(&self, url: &str) -> Result<String> {
        Ok(url.to_string())
    }
}
