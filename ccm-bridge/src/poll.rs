//! Bounded readiness polling.
//!
//! Node start-up is asynchronous from ccm's point of view, so readiness is
//! checked repeatedly with a fixed delay. Errors from the probe are not
//! retried; only a `false` answer is.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_POLL_ATTEMPTS: u32 = 100;
pub const DEFAULT_POLL_DELAY_MS: u64 = 100;

/// How many times a readiness predicate is checked, and how long to wait in between.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_POLL_ATTEMPTS,
            delay_ms: DEFAULT_POLL_DELAY_MS,
        }
    }
}

impl PollPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            delay_ms: delay.as_millis() as u64,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Check `probe` until it answers `true` or the attempts run out.
///
/// Returns `Ok(false)` on exhaustion. There is no cancellation hook; wrap the
/// caller if it needs a deadline shorter than `attempts * delay`.
pub fn poll_until<F, E>(policy: &PollPolicy, what: &str, mut probe: F) -> Result<bool, E>
where
    F: FnMut() -> Result<bool, E>,
{
    for attempt in 1..=policy.attempts {
        if probe()? {
            tracing::debug!(what, attempt, "condition reached");
            return Ok(true);
        }

        if attempt < policy.attempts {
            tracing::trace!(
                what,
                attempt,
                delay_ms = policy.delay_ms,
                "condition not reached, waiting"
            );
            std::thread::sleep(policy.delay());
        }
    }

    tracing::warn!(what, attempts = policy.attempts, "condition not reached, giving up");
    Ok(false)
}
