//! Rate-limit hints and retry backoff policy
//!
//! Throttled responses from the complaint API carry the suggested wait time
//! as plain text in the body. The first run of ASCII digits in the body is
//! taken as the wait in seconds. Without a hint, retries fall back to a
//! capped exponential backoff.

use super::config::{
    calculate_backoff, HINT_PADDING_SECS, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, MAX_HINT_WAIT_SECS,
    RETRY_DEADLINE_SECS,
};
use std::time::Duration;

/// Extract the first integer-looking token from a response body
pub fn parse_wait_hint(body: &str) -> Option<u64> {
    let start = body.find(|c: char| c.is_ascii_digit())?;
    let digits: String = body[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    // Absurdly long digit runs saturate instead of failing the hint.
    Some(digits.parse::<u64>().unwrap_or(u64::MAX))
}

/// Where a retry delay came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffSource {
    /// Server-suggested wait found in the response body
    Hint(u64),
    /// Exponential backoff, no hint available
    Exponential,
}

/// Retry delay policy shared by every fetch of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// First exponential delay when no hint is present
    pub initial_backoff: Duration,
    /// Cap on exponential delays
    pub max_backoff: Duration,
    /// Added on top of every hinted wait
    pub hint_padding: Duration,
    /// Cap applied to the hinted wait before padding
    pub max_hint_wait: Duration,
    /// Total waiting budget per task; `None` disables the bound
    pub retry_deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(MAX_BACKOFF_MS),
            hint_padding: Duration::from_secs(HINT_PADDING_SECS),
            max_hint_wait: Duration::from_secs(MAX_HINT_WAIT_SECS),
            retry_deadline: Some(Duration::from_secs(RETRY_DEADLINE_SECS)),
        }
    }
}

impl RetryPolicy {
    /// Policy that never sleeps, for tests and dry runs
    pub fn immediate() -> Self {
        Self {
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            hint_padding: Duration::ZERO,
            max_hint_wait: Duration::ZERO,
            retry_deadline: None,
        }
    }

    /// Delay before retry number `retry_index` (0-based), given the failing body if any
    pub fn delay_for(&self, retry_index: u32, body: Option<&str>) -> (Duration, BackoffSource) {
        match body.and_then(parse_wait_hint) {
            Some(hint) => {
                let wait = Duration::from_secs(hint).min(self.max_hint_wait);
                (wait.saturating_add(self.hint_padding), BackoffSource::Hint(hint))
            }
            None => (
                calculate_backoff(retry_index, self.initial_backoff, self.max_backoff),
                BackoffSource::Exponential,
            ),
        }
    }

    /// Whether waiting `next_delay` on top of `waited_so_far` stays inside the deadline
    pub fn within_deadline(&self, waited_so_far: Duration, next_delay: Duration) -> bool {
        match self.retry_deadline {
            Some(deadline) => waited_so_far.saturating_add(next_delay) <= deadline,
            None => true,
        }
    }
}
