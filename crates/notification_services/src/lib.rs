//! # Notification Services
//!
//! This crate provides the channels used to tell a human that a delivery slot opened up.
//! It includes an SMS channel (Twilio), a chat webhook channel (MessageCard), a local
//! alert command, and the [`NotificationService`] that fans a message out over all of them.

/// Local alert command channel.
pub mod alert_service;
/// Service composing the configured channels.
pub mod service;
/// SMS channel implementations.
pub mod sms_service;
/// Types and errors shared by the notification channels.
pub mod types;
/// Chat webhook channel.
pub mod webhook_service;

pub use alert_service::{AlertService, ShellAlertService};
pub use service::{NotificationService, Notifier};
pub use sms_service::{MockSmsService, SmsService, TwilioSmsService};
pub use types::{
    Channel, DispatchReport, MessageCard, NotificationError, NotificationKind, TwilioCredentials,
};
pub use webhook_service::{MessageCardWebhook, WebhookService};
