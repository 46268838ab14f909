use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::types::{MessageCard, NotificationError};

/// Trait for chat webhook implementations
#[async_trait]
pub trait WebhookService: Send + Sync {
    /// Post `text` as a card titled `title`.
    async fn post_message(&self, title: &str, text: &str) -> Result<(), NotificationError>;
}

/// Posts MessageCard payloads to an incoming-webhook URL
pub struct MessageCardWebhook {
    client: Client,
    url: String,
}

impl MessageCardWebhook {
    /// Create a webhook client for `url`.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NotificationError> {
        if url.trim().is_empty() {
            return Err(NotificationError::Config("Webhook URL must not be empty".to_string()));
        }

        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            NotificationError::Webhook(format!("Failed to create HTTP client: {}", e))
        })?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl WebhookService for MessageCardWebhook {
    async fn post_message(&self, title: &str, text: &str) -> Result<(), NotificationError> {
        let card = MessageCard::new(title, text);

        let response = self
            .client
            .post(&self.url)
            .json(&card)
            .send()
            .await
            .map_err(|e| NotificationError::Webhook(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(NotificationError::Webhook(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }
}
