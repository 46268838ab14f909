use std::fmt;

/// Classification of one upstream response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotStatus {
    /// At least one delivery slot is open
    Available,
    /// The upstream returned an empty delivery listing
    Empty,
    /// Slots are listed but none is open
    NoSlot,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Available => write!(f, "available"),
            SlotStatus::Empty => write!(f, "empty"),
            SlotStatus::NoSlot => write!(f, "no slot"),
        }
    }
}

/// Poller mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerMode {
    /// Polling at the short interval, budget left
    Active,
    /// Long sleep after the budget ran out
    Cooldown,
}

/// What a single loop iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The response was classified; `notified` is true when the notifier ran
    Classified {
        /// Classification of the response
        status: SlotStatus,
        /// Whether a slot notification was dispatched
        notified: bool,
        /// Whether the iteration started with a cooldown sleep
        cooled_down: bool,
    },
    /// A recoverable error was logged and the iteration was skipped
    Recovered {
        /// Whether the iteration started with a cooldown sleep
        cooled_down: bool,
    },
}

impl TickOutcome {
    /// Whether the iteration began with a cooldown sleep.
    pub fn cooled_down(&self) -> bool {
        match self {
            TickOutcome::Classified { cooled_down, .. } | TickOutcome::Recovered { cooled_down } => {
                *cooled_down
            }
        }
    }
}

/// Why the poller stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerExit {
    /// The upstream answered 401; the session cookie has to be replaced
    SessionExpired,
}

impl PollerExit {
    /// Process exit code for this stop reason.
    pub fn exit_code(&self) -> i32 {
        match self {
            PollerExit::SessionExpired => 0,
        }
    }
}

/// Custom error type for scan operations
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Could not connect to the upstream
    #[error("Connection error: {0}")]
    Connection(String),

    /// The request timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Any other request failure
    #[error("Request failed: {0}")]
    Transport(String),

    /// Non-success HTTP status other than 401
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),

    /// HTTP 401, the session cookie expired
    #[error("Session expired - access denied")]
    SessionExpired,

    /// Body was not the expected JSON
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl ScanError {
    /// Whether the poller must stop on this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScanError::SessionExpired)
    }
}
