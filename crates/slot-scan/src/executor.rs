use std::sync::Arc;

use chrono::Local;
use notification_services::{NotificationKind, Notifier};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::barbora_client::SlotSource;
use crate::classifier::classify_response;
use crate::config::WatcherConfig;
use crate::scan_types::*;
use crate::throttle::Throttle;

/// Polling state machine
///
/// Polls the deliveries endpoint every `poll_interval`, notifies on an open
/// slot and spends the notification budget. Once the budget is gone the next
/// iteration sleeps through the cooldown before polling again. A 401 ends the
/// loop.
pub struct SlotPoller {
    source: Arc<dyn SlotSource>,
    notifier: Arc<dyn Notifier>,
    throttle: Throttle,
    config: WatcherConfig,
}

impl SlotPoller {
    /// Create a poller with a full notification budget.
    pub fn new(
        source: Arc<dyn SlotSource>,
        notifier: Arc<dyn Notifier>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            source,
            notifier,
            throttle: Throttle::new(config.notification_budget),
            config,
        }
    }

    /// Notifications left before the next cooldown.
    pub fn throttle_remaining(&self) -> u32 {
        self.throttle.remaining()
    }

    /// Mode the next iteration starts in.
    pub fn mode(&self) -> PollerMode {
        if self.throttle.is_exhausted() {
            PollerMode::Cooldown
        } else {
            PollerMode::Active
        }
    }

    /// Poll until the session expires.
    pub async fn run(&mut self) -> PollerExit {
        info!(
            "Starting slot poller: every {}s, budget {}, cooldown {}s{}",
            self.config.poll_interval_secs,
            self.config.notification_budget,
            self.config.cooldown_secs,
            if self.config.dry_run { " (dry run)" } else { "" }
        );

        loop {
            match self.tick().await {
                Ok(outcome) => debug!("Iteration finished: {:?}", outcome),
                Err(ScanError::SessionExpired) => return PollerExit::SessionExpired,
                Err(e) => error!("Unexpected error in poll loop: {}", e),
            }
        }
    }

    /// Run one iteration: cooldown if needed, poll, classify, notify, sleep.
    ///
    /// Recoverable failures are logged and reported as
    /// [`TickOutcome::Recovered`]. Only [`ScanError::SessionExpired`] is
    /// returned as an error, after the expiry notification went out and
    /// without the trailing sleep.
    pub async fn tick(&mut self) -> Result<TickOutcome, ScanError> {
        let cooled_down = if self.throttle.is_exhausted() {
            self.cool_down().await;
            true
        } else {
            false
        };

        let outcome = match self.poll().await {
            Ok(status) => {
                let notified = self.handle_status(status).await;
                TickOutcome::Classified {
                    status,
                    notified,
                    cooled_down,
                }
            }
            Err(e) if e.is_fatal() => {
                warn!("No need to run, cookie expired - access denied");
                self.notify_session_expired().await;
                return Err(e);
            }
            Err(e) => {
                warn!("Poll failed, retrying in {}s: {}", self.config.poll_interval_secs, e);
                TickOutcome::Recovered { cooled_down }
            }
        };

        sleep(self.config.poll_interval()).await;
        Ok(outcome)
    }

    async fn poll(&self) -> Result<SlotStatus, ScanError> {
        if self.config.dry_run {
            debug!("Dry run, skipping deliveries request");
            return Ok(SlotStatus::Available);
        }

        let body = self.source.fetch_deliveries().await?;
        classify_response(&body)
    }

    /// Log the classification and notify on an open slot. Returns whether a
    /// notification was dispatched.
    async fn handle_status(&mut self, status: SlotStatus) -> bool {
        let now = timestamp();
        debug!("Deliveries response classified as {}", status);

        match status {
            SlotStatus::Available => {
                info!("Slot found at {}", now);
                let message = format!("{}: slot found at {}", self.config.bot_name, now);
                let report = self
                    .notifier
                    .notify(NotificationKind::SlotFound, &message)
                    .await;
                if report.is_empty() {
                    warn!("No notification channel configured, slot only logged");
                } else if !report.failed.is_empty() {
                    warn!("Notification failed on {:?}", report.failed);
                }
                // Spent per slot-found dispatch, delivered or not.
                self.throttle.consume();
                debug!("{} notifications left before cooldown", self.throttle.remaining());
                true
            }
            SlotStatus::Empty => {
                info!("Empty response returned at {}", now);
                false
            }
            SlotStatus::NoSlot => {
                info!("No slots at {}", now);
                false
            }
        }
    }

    async fn cool_down(&mut self) {
        let cooldown = self.config.cooldown();
        info!(
            "Notification budget used up, sleeping for {}s",
            cooldown.as_secs()
        );

        if self.config.notify_on_cooldown && self.notifier.has_channels(NotificationKind::Status) {
            let message = format!(
                "{}: notification limit reached, going to sleep for {} minutes",
                self.config.bot_name,
                cooldown.as_secs() / 60
            );
            self.notifier.notify(NotificationKind::Status, &message).await;
        }

        sleep(cooldown).await;
        self.throttle.reset();
        info!(
            "Cooldown over, budget reset to {}, resuming polling",
            self.throttle.budget()
        );
    }

    async fn notify_session_expired(&self) {
        if !self.notifier.has_channels(NotificationKind::Status) {
            return;
        }

        let message = format!(
            "{}: session cookie expired at {}, update BARBORA_COOKIE and restart",
            self.config.bot_name,
            timestamp()
        );
        self.notifier.notify(NotificationKind::Status, &message).await;
    }
}

fn timestamp() -> String {
    Local::now().format("%a %b %e %H:%M:%S %Y").to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use notification_services::{Channel, DispatchReport};
    use tokio::time::Instant;

    use super::*;

    const NO_SLOT: &str = r#"{"deliveries":[{"title":"Tomorrow","hours":[{"available": false}]}]}"#;
    const AVAILABLE: &str = r#"{"available": true}"#;

    /// Replays scripted responses, then keeps answering with no slot.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<String, ScanError>>>,
        fetched_at: Mutex<Vec<Instant>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<&str, ScanError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                fetched_at: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.fetched_at.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl SlotSource for ScriptedSource {
        async fn fetch_deliveries(&self) -> Result<String, ScanError> {
            self.fetched_at.lock().unwrap().push(Instant::now());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(NO_SLOT.to_string()))
        }
    }

    /// Records messages sent over the given channels, which all accept or all fail.
    struct RecordingNotifier {
        channels: Vec<Channel>,
        failing: bool,
        messages: Mutex<Vec<(NotificationKind, String)>>,
    }

    impl RecordingNotifier {
        fn new(enabled: bool) -> Arc<Self> {
            let channels = if enabled { vec![Channel::Webhook] } else { Vec::new() };
            Self::with_channels(channels, false)
        }

        fn with_channels(channels: Vec<Channel>, failing: bool) -> Arc<Self> {
            Arc::new(Self {
                channels,
                failing,
                messages: Mutex::new(Vec::new()),
            })
        }

        fn messages(&self) -> Vec<String> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .map(|(_, message)| message.clone())
                .collect()
        }

        fn kinds(&self) -> Vec<NotificationKind> {
            self.messages.lock().unwrap().iter().map(|(kind, _)| *kind).collect()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, kind: NotificationKind, message: &str) -> DispatchReport {
            self.messages.lock().unwrap().push((kind, message.to_string()));
            let used: Vec<Channel> = self
                .channels
                .iter()
                .copied()
                .filter(|channel| kind.uses(*channel))
                .collect();
            if self.failing {
                DispatchReport {
                    delivered: Vec::new(),
                    failed: used,
                }
            } else {
                DispatchReport {
                    delivered: used,
                    failed: Vec::new(),
                }
            }
        }

        fn has_channels(&self, kind: NotificationKind) -> bool {
            self.channels.iter().any(|channel| kind.uses(*channel))
        }
    }

    fn config(budget: u32) -> WatcherConfig {
        WatcherConfig {
            cookie: "session=abc".to_string(),
            notification_budget: budget,
            poll_interval_secs: 10,
            cooldown_secs: 3_600,
            bot_name: "Slot Bot".to_string(),
            ..Default::default()
        }
    }

    fn new_poller(
        source: &Arc<ScriptedSource>,
        notifier: &Arc<RecordingNotifier>,
        config: WatcherConfig,
    ) -> SlotPoller {
        SlotPoller::new(source.clone(), notifier.clone(), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_slot_keeps_budget() {
        let source = ScriptedSource::new(vec![]);
        let notifier = RecordingNotifier::new(true);
        let mut poller = new_poller(&source, &notifier, config(2));

        for _ in 0..5 {
            let outcome = poller.tick().await.unwrap();
            assert_eq!(
                outcome,
                TickOutcome::Classified {
                    status: SlotStatus::NoSlot,
                    notified: false,
                    cooled_down: false,
                }
            );
        }

        assert_eq!(poller.throttle_remaining(), 2);
        assert_eq!(source.calls(), 5);
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_listing_is_logged_only() {
        let source = ScriptedSource::new(vec![Ok(r#"{"deliveries":[{"title": null}]}"#)]);
        let notifier = RecordingNotifier::new(true);
        let mut poller = new_poller(&source, &notifier, config(2));

        let outcome = poller.tick().await.unwrap();

        assert!(matches!(
            outcome,
            TickOutcome::Classified {
                status: SlotStatus::Empty,
                notified: false,
                ..
            }
        ));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_of_one_cools_down_before_next_poll() {
        let source = ScriptedSource::new(vec![Ok(AVAILABLE)]);
        let notifier = RecordingNotifier::new(true);
        let mut poller = new_poller(&source, &notifier, config(1));
        let start = Instant::now();

        let first = poller.tick().await.unwrap();
        assert!(matches!(
            first,
            TickOutcome::Classified {
                status: SlotStatus::Available,
                notified: true,
                cooled_down: false,
            }
        ));
        assert_eq!(poller.throttle_remaining(), 0);
        assert_eq!(poller.mode(), PollerMode::Cooldown);
        assert_eq!(notifier.messages().len(), 1);
        assert!(notifier.messages()[0].starts_with("Slot Bot: slot found at "));

        let second = poller.tick().await.unwrap();
        assert!(second.cooled_down());
        assert_eq!(poller.throttle_remaining(), 1);
        assert_eq!(poller.mode(), PollerMode::Active);

        // The second request only went out after interval + cooldown.
        let fetched_at = source.fetched_at.lock().unwrap().clone();
        assert_eq!(fetched_at.len(), 2);
        assert!(fetched_at[1] - start >= Duration::from_secs(10 + 3_600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_cools_down_before_notifying_again() {
        let source = ScriptedSource::new(vec![Ok(AVAILABLE), Ok(AVAILABLE), Ok(AVAILABLE)]);
        let notifier = RecordingNotifier::new(true);
        let mut poller = new_poller(&source, &notifier, config(2));

        assert!(!poller.tick().await.unwrap().cooled_down());
        assert!(!poller.tick().await.unwrap().cooled_down());
        assert_eq!(notifier.messages().len(), 2);
        assert_eq!(poller.throttle_remaining(), 0);

        let before = Instant::now();
        let third = poller.tick().await.unwrap();
        assert!(third.cooled_down());
        assert!(Instant::now() - before >= Duration::from_secs(3_600));
        assert_eq!(notifier.messages().len(), 3);
        assert_eq!(poller.throttle_remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_message_when_enabled() {
        let source = ScriptedSource::new(vec![Ok(AVAILABLE)]);
        let notifier = RecordingNotifier::new(true);
        let config = WatcherConfig {
            notify_on_cooldown: true,
            ..config(1)
        };
        let mut poller = new_poller(&source, &notifier, config);

        poller.tick().await.unwrap();
        poller.tick().await.unwrap();

        let messages = notifier.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].contains("going to sleep for 60 minutes"));
        assert_eq!(
            notifier.kinds(),
            vec![NotificationKind::SlotFound, NotificationKind::Status]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_expiry_stops_with_one_notification() {
        let source = ScriptedSource::new(vec![Ok(NO_SLOT), Err(ScanError::SessionExpired)]);
        let notifier = RecordingNotifier::new(true);
        let mut poller = new_poller(&source, &notifier, config(2));

        let exit = poller.run().await;

        assert_eq!(exit, PollerExit::SessionExpired);
        assert_eq!(exit.exit_code(), 0);
        assert_eq!(source.calls(), 2);
        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("session cookie expired"));
        assert_eq!(notifier.kinds(), vec![NotificationKind::Status]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_alert_only_setup_sends_no_status_messages() {
        let notifier = RecordingNotifier::with_channels(vec![Channel::Alert], false);
        let source = ScriptedSource::new(vec![Ok(AVAILABLE), Err(ScanError::SessionExpired)]);
        let config = WatcherConfig {
            notify_on_cooldown: true,
            ..config(1)
        };
        let mut poller = new_poller(&source, &notifier, config);

        let exit = poller.run().await;

        assert_eq!(exit, PollerExit::SessionExpired);
        assert_eq!(notifier.kinds(), vec![NotificationKind::SlotFound]);
        assert!(notifier.messages()[0].contains("slot found"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_spent_even_when_no_channel_delivers() {
        let source = ScriptedSource::new(vec![Ok(AVAILABLE), Ok(AVAILABLE)]);
        let failing = RecordingNotifier::with_channels(vec![Channel::Sms, Channel::Webhook], true);
        let mut poller = new_poller(&source, &failing, config(2));

        poller.tick().await.unwrap();
        assert_eq!(poller.throttle_remaining(), 1);

        let silent = RecordingNotifier::new(false);
        let mut poller = SlotPoller::new(source.clone(), silent.clone(), config(2));
        let outcome = poller.tick().await.unwrap();

        assert!(matches!(
            outcome,
            TickOutcome::Classified {
                status: SlotStatus::Available,
                notified: true,
                ..
            }
        ));
        assert_eq!(poller.throttle_remaining(), 1);
        assert_eq!(silent.kinds(), vec![NotificationKind::SlotFound]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_expiry_without_channels_sends_nothing() {
        let source = ScriptedSource::new(vec![Err(ScanError::SessionExpired)]);
        let notifier = RecordingNotifier::new(false);
        let mut poller = new_poller(&source, &notifier, config(2));

        let result = poller.tick().await;

        assert!(matches!(result, Err(ScanError::SessionExpired)));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_and_parse_errors_are_recovered() {
        let source = ScriptedSource::new(vec![
            Err(ScanError::Timeout("timed out".to_string())),
            Err(ScanError::Connection("refused".to_string())),
            Err(ScanError::HttpStatus(502)),
            Ok("<html>maintenance</html>"),
            Ok(AVAILABLE),
        ]);
        let notifier = RecordingNotifier::new(true);
        let mut poller = new_poller(&source, &notifier, config(2));

        for _ in 0..4 {
            assert_eq!(
                poller.tick().await.unwrap(),
                TickOutcome::Recovered { cooled_down: false }
            );
        }
        assert_eq!(poller.throttle_remaining(), 2);

        let outcome = poller.tick().await.unwrap();
        assert!(matches!(
            outcome,
            TickOutcome::Classified {
                status: SlotStatus::Available,
                notified: true,
                ..
            }
        ));
        assert_eq!(poller.throttle_remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovered_error_still_waits_interval() {
        let source = ScriptedSource::new(vec![Err(ScanError::Transport("reset".to_string()))]);
        let notifier = RecordingNotifier::new(true);
        let mut poller = new_poller(&source, &notifier, config(2));

        let before = Instant::now();
        poller.tick().await.unwrap();
        assert!(Instant::now() - before >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_never_calls_upstream() {
        let source = ScriptedSource::new(vec![]);
        let notifier = RecordingNotifier::new(true);
        let config = WatcherConfig {
            dry_run: true,
            ..config(2)
        };
        let mut poller = new_poller(&source, &notifier, config);

        let outcomes = [
            poller.tick().await.unwrap(),
            poller.tick().await.unwrap(),
            poller.tick().await.unwrap(),
        ];

        assert_eq!(source.calls(), 0);
        assert!(outcomes.iter().all(|o| matches!(
            o,
            TickOutcome::Classified {
                status: SlotStatus::Available,
                notified: true,
                ..
            }
        )));
        assert!(!outcomes[1].cooled_down());
        assert!(outcomes[2].cooled_down());
        assert_eq!(notifier.messages().len(), 3);
    }
}
