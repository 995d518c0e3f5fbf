use std::time::Instant;

use crate::ports::Clock;

// ============================================================================
// SystemClock - Production Clock
// ============================================================================

/// Production clock.
///
/// Reads the tokio timer rather than `std::time::Instant::now()` directly, so
/// that a paused test runtime also pauses scheduling decisions. Outside a
/// paused runtime both are the same monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}
