//! TimeSync - One-Shot Device Clock Synchronization
//!
//! The device has no RTC; a client pushes its own clock once after boot.
//! Updates are gated by a process-wide flag and a sanity floor rejecting
//! bogus epoch values.

use crate::error::{Error, Result};
use tokio::process::Command;

/// Oldest accepted epoch value (2019-08-05); anything at or below is bogus
pub const TIME_FLOOR: i64 = 1_565_013_742;

/// Outcome of evaluating a clock update request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockUpdate {
    /// Value fails the sanity floor
    Rejected,
    /// Clock was already set this process lifetime
    AlreadySet,
    /// Update should be applied
    Apply,
}

/// Decide what to do with a clock update request
///
/// The floor check comes first so a bogus value is rejected with the same
/// status whether or not the clock was already set.
pub fn evaluate(epoch: i64, already_set: bool) -> ClockUpdate {
    if epoch <= TIME_FLOOR {
        ClockUpdate::Rejected
    } else if already_set {
        ClockUpdate::AlreadySet
    } else {
        ClockUpdate::Apply
    }
}

/// Sets the system clock by invoking an external command
///
/// Defaults to `date -s @<epoch>`. The command is injectable so tests can
/// exercise the update path without touching the host clock.
pub struct ClockService {
    command: String,
}

impl Default for ClockService {
    fn default() -> Self {
        Self {
            command: "date".to_string(),
        }
    }
}

impl ClockService {
    /// Use an alternative clock-set command
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Set the system clock to the given epoch seconds
    pub async fn set_system_clock(&self, epoch: i64) -> Result<()> {
        let status = Command::new(&self.command)
            .arg("-s")
            .arg(format!("@{}", epoch))
            .status()
            .await
            .map_err(|e| Error::Clock(format!("{} spawn failed: {}", self.command, e)))?;

        if !status.success() {
            return Err(Error::Clock(format!(
                "{} exited with {}",
                self.command, status
            )));
        }

        tracing::info!(epoch, "System clock updated");
        Ok(())
    }
}
