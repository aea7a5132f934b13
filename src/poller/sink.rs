//! Delivery Sinks
//!
//! A sink is whatever carries an alert the last mile. The outbox
//! protocol only needs "did every delivery succeed"; SMTP, chat, or
//! anything else can sit behind this trait. The bundled sink forwards
//! to a webhook as a JSON POST.

use async_trait::async_trait;
use reqwest::{header, Client};
use thiserror::Error;

use crate::types::OutboxEntry;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, entry: &OutboxEntry) -> Result<(), SinkError>;
}

/// Forwards alerts to a configured webhook URL.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    async fn deliver(&self, entry: &OutboxEntry) -> Result<(), SinkError> {
        let payload = serde_json::json!({
            "subject": entry.subject,
            "body": entry.body,
        });

        let response = self
            .client
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(SinkError::SendFailed(format!(
                "Webhook returned non-success status: {status}. Body: {error_body}"
            )));
        }

        Ok(())
    }
}
