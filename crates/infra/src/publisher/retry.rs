//! Bounded, blocking connection retry.

use std::time::Duration;

use tracing::warn;

use stockline_events::{ScopedChannel, SinkConnector, SinkError};

/// Connection attempts per publish.
pub const CONNECT_ATTEMPTS: u32 = 5;

/// Fixed pause between connection attempts.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: CONNECT_ATTEMPTS,
            delay: CONNECT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// All attempts failed; carries the last connection error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetriesExhausted {
    pub attempts: u32,
    pub last_error: SinkError,
}

/// Connect with up to `policy.max_attempts` tries, sleeping `policy.delay`
/// between tries (not after the last one). Blocks the calling thread.
pub fn connect_with_retry<C>(connector: &C, policy: RetryPolicy) -> Result<ScopedChannel, RetriesExhausted>
where
    C: SinkConnector + ?Sized,
{
    let attempts = policy.max_attempts.max(1);
    let mut last_error = SinkError::Connection("no connection attempted".to_string());

    for attempt in 1..=attempts {
        match connector.connect() {
            Ok(channel) => return Ok(ScopedChannel::new(channel)),
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts = attempts,
                    sink = %connector.address(),
                    error = %e,
                    "sink connection failed"
                );
                last_error = e;
                if attempt < attempts && !policy.delay.is_zero() {
                    std::thread::sleep(policy.delay);
                }
            }
        }
    }

    Err(RetriesExhausted { attempts, last_error })
}
