use std::fmt;

use serde::Serialize;

/// Errors raised by a single notification channel.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    /// SMS provider errors (auth, quota, network).
    #[error("SMS provider error: {0}")]
    Sms(String),

    /// Chat webhook errors.
    #[error("Webhook error: {0}")]
    Webhook(String),

    /// Local alert command errors.
    #[error("Alert command error: {0}")]
    Alert(String),

    /// Invalid channel configuration.
    #[error("Invalid notification configuration: {0}")]
    Config(String),
}

/// A notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Text message through the SMS provider.
    Sms,
    /// Chat message posted to a webhook.
    Webhook,
    /// Local command, e.g. a spoken alert.
    Alert,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Sms => write!(f, "sms"),
            Channel::Webhook => write!(f, "webhook"),
            Channel::Alert => write!(f, "alert"),
        }
    }
}

/// What a message is about, which decides the channels it goes out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// A delivery slot opened up. Goes out on every channel, local alert included.
    SlotFound,
    /// Status of the watcher itself (cooldown, session expiry). SMS and webhook only.
    Status,
}

impl NotificationKind {
    /// Whether messages of this kind go out on `channel`.
    pub fn uses(&self, channel: Channel) -> bool {
        match self {
            NotificationKind::SlotFound => true,
            NotificationKind::Status => channel != Channel::Alert,
        }
    }
}

/// Outcome of one dispatch across all configured channels.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Channels that accepted the message.
    pub delivered: Vec<Channel>,
    /// Channels that failed; the failure was logged and swallowed.
    pub failed: Vec<Channel>,
}

impl DispatchReport {
    /// True when no channel was attempted.
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty() && self.failed.is_empty()
    }
}

/// Twilio account and phone numbers used for SMS.
#[derive(Clone)]
pub struct TwilioCredentials {
    /// Account SID.
    pub account_id: String,
    /// Account auth token.
    pub auth_token: String,
    /// Number the SMS is sent to.
    pub to_number: String,
    /// Twilio number the SMS is sent from.
    pub from_number: String,
}

impl fmt::Debug for TwilioCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioCredentials")
            .field("account_id", &self.account_id)
            .field("auth_token", &"<redacted>")
            .field("to_number", &self.to_number)
            .field("from_number", &self.from_number)
            .finish()
    }
}

/// Card-shaped chat payload posted to the webhook.
#[derive(Debug, Serialize)]
pub struct MessageCard {
    #[serde(rename = "@context")]
    context: &'static str,
    #[serde(rename = "@type")]
    card_type: &'static str,
    /// Card title, the bot name.
    pub title: String,
    /// Message body.
    pub text: String,
}

impl MessageCard {
    /// Build a card with the fixed schema.org context.
    pub fn new(title: &str, text: &str) -> Self {
        Self {
            context: "http://schema.org/extensions",
            card_type: "MessageCard",
            title: title.to_string(),
            text: text.to_string(),
        }
    }
}
