//! Main entry point for the delivery slot watcher.
//! Polls the shop's deliveries endpoint and notifies over SMS, webhook and local alert.

use std::sync::Arc;

use notification_services::{
    MessageCardWebhook, MockSmsService, NotificationError, NotificationService, ShellAlertService,
    TwilioSmsService,
};
use slot_scan::{BarboraClient, SlotPoller, WatcherConfig};

/// Build the notifier from whichever channels are configured.
fn build_notification_service(
    config: &WatcherConfig,
) -> Result<NotificationService, NotificationError> {
    let timeout = config.request_timeout();
    let mut service = NotificationService::new(&config.bot_name);

    match &config.twilio {
        Some(twilio) => {
            let sms = TwilioSmsService::new(twilio, timeout)?;
            service = service.with_sms(Arc::new(sms), &twilio.to_number, &twilio.from_number);
        }
        None if config.dry_run => {
            service = service.with_sms(Arc::new(MockSmsService), "dry-run", "dry-run");
        }
        None => {}
    }

    if let Some(url) = &config.webhook_url {
        service = service.with_webhook(Arc::new(MessageCardWebhook::new(url, timeout)?));
    }

    if let Some(command) = &config.alert_command {
        service = service.with_alert(Arc::new(ShellAlertService::new(command, timeout)?));
    }

    Ok(service)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    log::info!("🚀 Starting delivery slot watcher...");

    let config = match WatcherConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            log::error!("💡 Copy the session cookie from a logged-in browser into BARBORA_COOKIE");
            std::process::exit(1);
        }
    };
    log::info!("⚙️ {:?}", config);

    let notification_service = match build_notification_service(&config) {
        Ok(service) => service,
        Err(e) => {
            log::error!("❌ Failed to initialize notification service: {}", e);
            std::process::exit(1);
        }
    };
    notification_service.log_channels();

    let client = match BarboraClient::new(&config) {
        Ok(client) => {
            log::info!("🛒 Polling {}", client.endpoint());
            client
        }
        Err(e) => {
            log::error!("❌ Failed to create deliveries client: {}", e);
            std::process::exit(1);
        }
    };

    let mut poller = SlotPoller::new(Arc::new(client), Arc::new(notification_service), config);
    let exit = poller.run().await;

    log::info!("👋 Poller stopped: {:?}", exit);
    std::process::exit(exit.exit_code());
}
