use std::sync::Arc;

use async_trait::async_trait;

use crate::alert_service::AlertService;
use crate::sms_service::SmsService;
use crate::types::{Channel, DispatchReport, NotificationKind};
use crate::webhook_service::WebhookService;

/// Anything that can tell a human about a slot.
///
/// Implementations never fail: channel errors are logged and reported in the
/// returned [`DispatchReport`].
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send `message` over every configured channel that carries `kind`.
    async fn notify(&self, kind: NotificationKind, message: &str) -> DispatchReport;

    /// Whether at least one configured channel carries `kind`.
    fn has_channels(&self, kind: NotificationKind) -> bool;
}

struct SmsRoute {
    service: Arc<dyn SmsService>,
    to: String,
    from: String,
}

/// Notification service fanning a message out to SMS, webhook and local alert.
pub struct NotificationService {
    bot_name: String,
    sms: Option<SmsRoute>,
    webhook: Option<Arc<dyn WebhookService>>,
    alert: Option<Arc<dyn AlertService>>,
}

impl NotificationService {
    /// Create a service with no channels; `bot_name` titles webhook cards.
    pub fn new(bot_name: &str) -> Self {
        Self {
            bot_name: bot_name.to_string(),
            sms: None,
            webhook: None,
            alert: None,
        }
    }

    /// Enable SMS from `from` to `to`.
    pub fn with_sms(mut self, service: Arc<dyn SmsService>, to: &str, from: &str) -> Self {
        self.sms = Some(SmsRoute {
            service,
            to: to.to_string(),
            from: from.to_string(),
        });
        self
    }

    /// Enable the chat webhook.
    pub fn with_webhook(mut self, service: Arc<dyn WebhookService>) -> Self {
        self.webhook = Some(service);
        self
    }

    /// Enable the local alert.
    pub fn with_alert(mut self, service: Arc<dyn AlertService>) -> Self {
        self.alert = Some(service);
        self
    }

    /// Channels currently enabled.
    pub fn enabled_channels(&self) -> Vec<Channel> {
        let mut channels = Vec::new();
        if self.sms.is_some() {
            channels.push(Channel::Sms);
        }
        if self.webhook.is_some() {
            channels.push(Channel::Webhook);
        }
        if self.alert.is_some() {
            channels.push(Channel::Alert);
        }
        channels
    }

    /// Log the channel setup. Call once at startup.
    pub fn log_channels(&self) {
        match &self.sms {
            Some(route) => log::info!("📱 SMS enabled: {} -> {}", route.from, route.to),
            None => log::warn!("📱 SMS disabled: Twilio credentials not configured"),
        }
        if self.webhook.is_some() {
            log::info!("💬 Webhook enabled");
        } else {
            log::warn!("💬 Webhook disabled: no webhook URL configured");
        }
        if self.alert.is_some() {
            log::info!("🔔 Local alert command enabled");
        } else {
            log::info!("🔔 Local alert command disabled");
        }
        if self.enabled_channels().is_empty() {
            log::warn!("⚠️ No notification channel enabled, slots will only be logged");
        }
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn notify(&self, kind: NotificationKind, message: &str) -> DispatchReport {
        let mut report = DispatchReport::default();

        if let Some(route) = self.sms.as_ref().filter(|_| kind.uses(Channel::Sms)) {
            match route.service.send_sms(&route.to, &route.from, message).await {
                Ok(external_id) => {
                    log::info!("✅ SMS sent to {} ({})", route.to, external_id);
                    report.delivered.push(Channel::Sms);
                }
                Err(e) => {
                    log::error!("❌ Failed to send SMS to {}: {}", route.to, e);
                    report.failed.push(Channel::Sms);
                }
            }
        }

        if let Some(webhook) = self.webhook.as_ref().filter(|_| kind.uses(Channel::Webhook)) {
            match webhook.post_message(&self.bot_name, message).await {
                Ok(()) => {
                    log::info!("✅ Webhook message posted");
                    report.delivered.push(Channel::Webhook);
                }
                Err(e) => {
                    log::error!("❌ Failed to post webhook message: {}", e);
                    report.failed.push(Channel::Webhook);
                }
            }
        }

        if let Some(alert) = self.alert.as_ref().filter(|_| kind.uses(Channel::Alert)) {
            match alert.alert(message).await {
                Ok(()) => report.delivered.push(Channel::Alert),
                Err(e) => {
                    log::error!("❌ Local alert failed: {}", e);
                    report.failed.push(Channel::Alert);
                }
            }
        }

        report
    }

    fn has_channels(&self, kind: NotificationKind) -> bool {
        self.enabled_channels()
            .into_iter()
            .any(|channel| kind.uses(channel))
    }
}
