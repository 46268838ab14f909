use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::WatcherConfig;
use crate::scan_types::ScanError;
use crate::session::session_headers;

/// Source of delivery-slot responses
#[async_trait]
pub trait SlotSource: Send + Sync {
    /// Fetch the raw deliveries body.
    async fn fetch_deliveries(&self) -> Result<String, ScanError>;
}

/// Client for the shop's deliveries API
pub struct BarboraClient {
    client: Client,
    endpoint: String,
}

impl BarboraClient {
    /// Create a client with the session headers and request timeout baked in.
    pub fn new(config: &WatcherConfig) -> Result<Self, ScanError> {
        let client = Client::builder()
            .default_headers(session_headers(config)?)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ScanError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }

    /// Endpoint this client polls.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SlotSource for BarboraClient {
    async fn fetch_deliveries(&self) -> Result<String, ScanError> {
        debug!("Fetching deliveries from {}", self.endpoint);

        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ScanError::SessionExpired);
        }
        if !status.is_success() {
            return Err(ScanError::HttpStatus(status.as_u16()));
        }

        response.text().await.map_err(map_request_error)
    }
}

fn map_request_error(e: reqwest::Error) -> ScanError {
    if e.is_timeout() {
        ScanError::Timeout(e.to_string())
    } else if e.is_connect() {
        ScanError::Connection(e.to_string())
    } else {
        ScanError::Transport(e.to_string())
    }
}
