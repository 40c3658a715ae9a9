// src/services/fetcher.rs

//! Source page fetching.

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::http;

/// Retrieves the HTML of a search result page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch `url` and return the response body.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Plain HTTP GET fetcher.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Wrap an already configured client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a fetcher with the configured user agent and timeout.
    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self::new(http::create_client(config)?))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::fetch(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::fetch(url, format!("HTTP {status}")));
        }

        response.text().await.map_err(|e| AppError::fetch(url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list"))
            .and(header("user-agent", "test-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<ul><li>ok</li></ul>"))
            .mount(&server)
            .await;

        let config = CrawlerConfig {
            user_agent: "test-agent".to_string(),
            ..CrawlerConfig::default()
        };
        let fetcher = HttpFetcher::from_config(&config).unwrap();
        let body = fetcher
            .fetch(&format!("{}/list", server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<ul><li>ok</li></ul>");
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::from_config(&CrawlerConfig::default()).unwrap();
        let err = fetcher
            .fetch(&format!("{}/list", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
        assert!(err.to_string().contains("503"));
    }
}
