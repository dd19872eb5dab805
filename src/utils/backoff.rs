//! Exponential backoff between svn retry attempts.

use crate::constants::{MAX_BACKOFF_DELAY_MS, STARTING_BACKOFF_DELAY_MS};
use std::time::Duration;

/// Delay before retry number `attempt` (0-based): 50ms, 100ms, 200ms... capped at 800ms.
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let delay = STARTING_BACKOFF_DELAY_MS.saturating_mul(factor).min(MAX_BACKOFF_DELAY_MS);
    Duration::from_millis(delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_doubles_and_caps() {
        assert_eq!(backoff_delay(0), Duration::from_millis(50));
        assert_eq!(backoff_delay(1), Duration::from_millis(100));
        assert_eq!(backoff_delay(3), Duration::from_millis(400));
        assert_eq!(backoff_delay(4), Duration::from_millis(800));
        assert_eq!(backoff_delay(10), Duration::from_millis(800));
        assert_eq!(backoff_delay(200), Duration::from_millis(800));
    }
}
