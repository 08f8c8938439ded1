//! Download configuration constants

use std::time::Duration;

/// Default retry budget per interval.
pub const MAX_RETRIES: u32 = 5;

/// Upper bound accepted for a configured retry budget.
pub const MAX_RETRIES_LIMIT: u32 = 20;

/// Initial backoff delay in milliseconds when the server gives no wait hint.
pub const INITIAL_BACKOFF_MS: u64 = 1000; // 1 second

/// Maximum backoff delay in milliseconds when the server gives no wait hint.
pub const MAX_BACKOFF_MS: u64 = 30000; // 30 seconds

/// Seconds added on top of a server-suggested wait before retrying.
pub const HINT_PADDING_SECS: u64 = 2;

/// Largest server-suggested wait honoured, in seconds.
/// Wait hints come from response bodies, so they are clamped.
pub const MAX_HINT_WAIT_SECS: u64 = 300;

/// Total time a single interval may spend waiting between retries.
pub const RETRY_DEADLINE_SECS: u64 = 1800; // 30 minutes

/// Per-request HTTP timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Default number of intervals fetched concurrently.
/// One reproduces strictly sequential ingestion.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency.
pub const MAX_CONCURRENCY: usize = 32;

/// Calculate exponential backoff delay from a base and cap
pub fn calculate_backoff(retry_count: u32, initial: Duration, max: Duration) -> Duration {
    let factor = 2u32.saturating_pow(retry_count);
    initial.saturating_mul(factor).min(max)
}
