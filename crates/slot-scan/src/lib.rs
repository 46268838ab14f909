//! # Slot Scan
//!
//! This crate polls a grocery delivery-slot endpoint and notifies when a slot opens up.
//! It holds the watcher configuration, the upstream client, the response classifier,
//! the notification throttle and the polling state machine.

/// Upstream delivery-slot client
mod barbora_client;
pub use barbora_client::*;

/// Response body classification
mod classifier;
pub use classifier::*;

/// Watcher configuration loaded from the environment
mod config;
pub use config::*;

/// Polling state machine
mod executor;
pub use executor::*;

/// Types and errors for scan operations
mod scan_types;
pub use scan_types::*;

/// Static request headers carrying the session
mod session;
pub use session::*;

/// Notification budget counter
mod throttle;
pub use throttle::*;
