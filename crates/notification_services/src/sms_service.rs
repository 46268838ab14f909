use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::types::{NotificationError, TwilioCredentials};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Trait for SMS provider implementations
#[async_trait]
pub trait SmsService: Send + Sync {
    /// Send `body` from `from` to `to`, returning the provider's message id.
    async fn send_sms(&self, to: &str, from: &str, body: &str)
    -> Result<String, NotificationError>;
}

/// Twilio Programmable Messaging client
pub struct TwilioSmsService {
    client: Client,
    api_base: String,
    account_id: String,
    auth_token: String,
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorResponse {
    code: Option<i64>,
    message: Option<String>,
}

impl TwilioSmsService {
    /// Create a Twilio client for the given account.
    pub fn new(credentials: &TwilioCredentials, timeout: Duration) -> Result<Self, NotificationError> {
        Self::with_api_base(credentials, timeout, TWILIO_API_BASE)
    }

    /// Create a Twilio client against a custom API base URL.
    pub fn with_api_base(
        credentials: &TwilioCredentials,
        timeout: Duration,
        api_base: &str,
    ) -> Result<Self, NotificationError> {
        if credentials.account_id.is_empty() || credentials.auth_token.is_empty() {
            return Err(NotificationError::Config(
                "Twilio account id and auth token must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotificationError::Sms(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            account_id: credentials.account_id.clone(),
            auth_token: credentials.auth_token.clone(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", self.api_base, self.account_id)
    }
}

#[async_trait]
impl SmsService for TwilioSmsService {
    async fn send_sms(
        &self,
        to: &str,
        from: &str,
        body: &str,
    ) -> Result<String, NotificationError> {
        log::debug!("Sending SMS to {} from {}", to, from);

        let params = [("To", to), ("From", from), ("Body", body)];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_id, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| NotificationError::Sms(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<TwilioErrorResponse>().await {
                Ok(TwilioErrorResponse {
                    code: Some(code),
                    message: Some(message),
                }) => format!("{} (code {})", message, code),
                Ok(TwilioErrorResponse {
                    message: Some(message),
                    ..
                }) => message,
                _ => "Unknown error".to_string(),
            };
            return Err(NotificationError::Sms(format!("HTTP {}: {}", status, detail)));
        }

        let message: TwilioMessageResponse = response
            .json()
            .await
            .map_err(|e| NotificationError::Sms(format!("Failed to parse response: {}", e)))?;

        Ok(message.sid)
    }
}

/// SMS service that only logs, for dry runs without provider credentials
pub struct MockSmsService;

#[async_trait]
impl SmsService for MockSmsService {
    async fn send_sms(
        &self,
        to: &str,
        from: &str,
        body: &str,
    ) -> Result<String, NotificationError> {
        log::info!("📱 [MOCK SMS] To: {} From: {}", to, from);
        log::info!("📱 [MOCK SMS] Message: {}", body);

        let mock_id = format!("mock-sms-{}", uuid::Uuid::new_v4());
        Ok(mock_id)
    }
}
