use std::fmt;
use std::time::Duration;

use notification_services::TwilioCredentials;
use tracing::warn;
use validator::Validate;

use crate::scan_types::ScanError;

/// Default deliveries endpoint
pub const DEFAULT_ENDPOINT: &str = "https://www.barbora.lt/api/eshop/v1/cart/deliveries";
/// Default seconds between polls
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
/// Default notifications before cooldown
pub const DEFAULT_NOTIFICATION_BUDGET: u32 = 2;
/// Default cooldown, 5 hours
pub const DEFAULT_COOLDOWN_SECS: u64 = 5 * 60 * 60;
/// Default upstream request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Default card title and message prefix
pub const DEFAULT_BOT_NAME: &str = "Barbora Slot Watcher";

/// Watcher configuration, fixed for the life of the process
#[derive(Clone, Validate)]
pub struct WatcherConfig {
    /// Deliveries endpoint polled with GET
    #[validate(url(message = "Endpoint must be a valid URL"))]
    pub endpoint: String,

    /// Session cookie sent with every request
    pub cookie: String,

    /// Optional Authorization header value
    pub authorization: Option<String>,

    /// Seconds between polls
    #[validate(range(min = 1, message = "Poll interval must be at least one second"))]
    pub poll_interval_secs: u64,

    /// Notifications allowed before cooldown
    #[validate(range(min = 1, message = "Notification budget must be at least 1"))]
    pub notification_budget: u32,

    /// Seconds to sleep once the budget is used up
    pub cooldown_secs: u64,

    /// Upstream request timeout in seconds
    #[validate(range(min = 1, message = "Request timeout must be at least one second"))]
    pub request_timeout_secs: u64,

    /// Skip the upstream request and act as if a slot were available
    pub dry_run: bool,

    /// Send a message when entering cooldown
    pub notify_on_cooldown: bool,

    /// Twilio credentials, SMS is disabled when absent
    pub twilio: Option<TwilioCredentials>,

    /// Chat webhook URL, webhook is disabled when absent
    #[validate(url(message = "Webhook URL must be a valid URL"))]
    pub webhook_url: Option<String>,

    /// Card title and message prefix
    #[validate(length(min = 1, message = "Bot name is required"))]
    pub bot_name: String,

    /// Local command run on every notification
    pub alert_command: Option<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            cookie: String::new(),
            authorization: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            notification_budget: DEFAULT_NOTIFICATION_BUDGET,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            dry_run: false,
            notify_on_cooldown: false,
            twilio: None,
            webhook_url: None,
            bot_name: DEFAULT_BOT_NAME.to_string(),
            alert_command: None,
        }
    }
}

impl fmt::Debug for WatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherConfig")
            .field("endpoint", &self.endpoint)
            .field("cookie", &redact(&self.cookie))
            .field("authorization", &self.authorization.as_deref().map(redact))
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("notification_budget", &self.notification_budget)
            .field("cooldown_secs", &self.cooldown_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("dry_run", &self.dry_run)
            .field("notify_on_cooldown", &self.notify_on_cooldown)
            .field("twilio", &self.twilio)
            .field("webhook_url", &self.webhook_url.as_deref().map(redact))
            .field("bot_name", &self.bot_name)
            .field("alert_command", &self.alert_command)
            .finish()
    }
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() { "<unset>" } else { "<redacted>" }
}

impl WatcherConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ScanError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScanError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let dry_run = parse_flag(&get, "DRY_RUN")?.unwrap_or(false);

        let cookie = match get("BARBORA_COOKIE") {
            Some(cookie) => cookie,
            None if dry_run => String::new(),
            None => {
                return Err(ScanError::Config(
                    "BARBORA_COOKIE environment variable not set".to_string(),
                ));
            }
        };

        let twilio = match (
            get("TWILIO_ACCOUNT_ID"),
            get("TWILIO_ACCOUNT_AUTH_TOKEN"),
            get("TWILIO_NUMBER_TO_SEND"),
            get("TWILIO_FROM_NUMBER"),
        ) {
            (Some(account_id), Some(auth_token), Some(to_number), Some(from_number)) => {
                Some(TwilioCredentials {
                    account_id,
                    auth_token,
                    to_number,
                    from_number,
                })
            }
            (None, None, None, None) => None,
            _ => {
                warn!(
                    "Incomplete Twilio configuration: TWILIO_ACCOUNT_ID, TWILIO_ACCOUNT_AUTH_TOKEN, \
                     TWILIO_NUMBER_TO_SEND and TWILIO_FROM_NUMBER are all required, SMS disabled"
                );
                None
            }
        };

        let config = Self {
            endpoint: get("BARBORA_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            cookie,
            authorization: get("BARBORA_AUTHORIZATION"),
            poll_interval_secs: parse_number(&get, "POLL_INTERVAL_SECS")?
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            notification_budget: parse_number(&get, "NOTIFICATION_BUDGET")?
                .unwrap_or(DEFAULT_NOTIFICATION_BUDGET),
            cooldown_secs: parse_number(&get, "COOLDOWN_SECS")?.unwrap_or(DEFAULT_COOLDOWN_SECS),
            request_timeout_secs: parse_number(&get, "REQUEST_TIMEOUT_SECS")?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            dry_run,
            notify_on_cooldown: parse_flag(&get, "NOTIFY_ON_COOLDOWN")?.unwrap_or(false),
            twilio,
            webhook_url: get("WEBHOOK_URL"),
            bot_name: get("BOT_NAME").unwrap_or_else(|| DEFAULT_BOT_NAME.to_string()),
            alert_command: get("ALERT_COMMAND"),
        };

        config
            .validate()
            .map_err(|e| ScanError::Validation(format!("Invalid configuration: {}", e)))?;

        Ok(config)
    }

    /// Sleep between polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Sleep once the budget is used up.
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Upstream request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_number<T, G>(get: &G, key: &str) -> Result<Option<T>, ScanError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| ScanError::Config(format!("{} must be a number, got {:?}: {}", key, raw, e)))
        })
        .transpose()
}

fn parse_flag<G>(get: &G, key: &str) -> Result<Option<bool>, ScanError>
where
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ScanError::Config(format!(
                "{} must be a boolean flag, got {:?}",
                key, raw
            ))),
        })
        .transpose()
}
