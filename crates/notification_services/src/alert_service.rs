use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use crate::types::NotificationError;

/// Trait for local alert implementations
#[async_trait]
pub trait AlertService: Send + Sync {
    /// Raise the alert. `message` is exported to the command as `SLOT_MESSAGE`.
    async fn alert(&self, message: &str) -> Result<(), NotificationError>;
}

/// Runs a shell command, e.g. `say "Slot found! Be quick"`
pub struct ShellAlertService {
    command: String,
    timeout: Duration,
}

impl ShellAlertService {
    /// Create an alert that runs `command` through `sh -c`, killed after `timeout`.
    pub fn new(command: &str, timeout: Duration) -> Result<Self, NotificationError> {
        if command.trim().is_empty() {
            return Err(NotificationError::Config("Alert command must not be empty".to_string()));
        }

        Ok(Self {
            command: command.to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl AlertService for ShellAlertService {
    async fn alert(&self, message: &str) -> Result<(), NotificationError> {
        // The child is killed when the timed-out status future is dropped.
        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env("SLOT_MESSAGE", message)
            .kill_on_drop(true)
            .status();

        let status = timeout(self.timeout, status)
            .await
            .map_err(|_| {
                NotificationError::Alert(format!(
                    "Command `{}` did not finish within {}s",
                    self.command,
                    self.timeout.as_secs_f32()
                ))
            })?
            .map_err(|e| NotificationError::Alert(format!("Failed to spawn command: {}", e)))?;

        if !status.success() {
            return Err(NotificationError::Alert(format!(
                "Command `{}` exited with {}",
                self.command, status
            )));
        }

        Ok(())
    }
}
