// src/services/notifier.rs

//! Webhook notification backends.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;

use crate::error::{AppError, Result};
use crate::models::NotifyConfig;
use crate::utils::http;

/// Delivers a rendered message somewhere a human will read it.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `text`. An `Ok` means the receiver accepted it.
    async fn send(&self, text: &str) -> Result<()>;
}

/// Slack-compatible incoming webhook.
pub struct SlackWebhook {
    webhook_url: String,
    http: Client,
    retries: u32,
}

impl SlackWebhook {
    pub fn new(webhook_url: impl Into<String>, http: Client, retries: u32) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            http,
            retries,
        }
    }

    /// Build from configuration; fails when no webhook URL is configured.
    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        let url = config
            .webhook_url
            .clone()
            .ok_or_else(|| AppError::config("webhook URL is not configured"))?;
        Ok(Self::new(url, http::create_webhook_client(config)?, config.retries))
    }

    fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    async fn post(&self, payload: &serde_json::Value) -> Result<()> {
        let max_attempts = self.retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let failure = match self.http.post(&self.webhook_url).json(payload).send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    log::warn!("Webhook returned {}: {}", status, body);
                    if !Self::is_retryable(status) {
                        return Err(AppError::notify(format!("webhook returned {status}")));
                    }
                    format!("webhook returned {status}")
                }
                Err(e) => {
                    log::warn!("Webhook request failed: {}", e);
                    format!("webhook request failed: {e}")
                }
            };

            if attempt >= max_attempts {
                return Err(AppError::notify(format!(
                    "{failure} (after {attempt} attempts)"
                )));
            }

            log::info!("Retrying webhook ({}/{})", attempt + 1, max_attempts);
            tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
        }
    }
}

#[async_trait]
impl Notifier for SlackWebhook {
    async fn send(&self, text: &str) -> Result<()> {
        let payload = json!({
            "text": text,
            "unfurl_links": false,
        });
        self.post(&payload).await
    }
}

/// Prints messages to stdout instead of posting them.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        println!("{}", "─".repeat(60));
        println!("{text}");
        println!("{}", "─".repeat(60));
        Ok(())
    }
}
