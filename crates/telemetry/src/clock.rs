// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Monotonic clock source used by token-bucket style rate limiters and by the
//! `rate_limiting` tail-sampling policy's per-second window.
//!
//! Abstracted behind a trait so tests can supply a fake clock instead of
//! depending on wall-clock time (`std::time::Instant` cannot be constructed
//! with an arbitrary value, which makes deterministic window-rollover tests
//! awkward without this seam).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A source of monotonically increasing time, expressed in whole seconds since
/// an arbitrary epoch.
pub trait Clock: Send + Sync {
    /// Returns the current second counter. Two calls separated by less than a
    /// second MUST return the same value; the value MUST never decrease.
    fn now_secs(&self) -> u64;
}

/// [`Clock`] backed by `std::time::Instant`.
#[derive(Debug)]
pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

/// A [`Clock`] whose value is set explicitly, for deterministic tests of
/// second-rollover behavior (e.g. the `rate_limiting` sampling policy).
#[derive(Debug, Default)]
pub struct FakeClock {
    secs: AtomicU64,
}

impl FakeClock {
    /// Creates a fake clock starting at second 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by `d`, rounding down to whole seconds.
    pub fn advance(&self, d: Duration) {
        let _ = self.secs.fetch_add(d.as_secs(), Ordering::SeqCst);
    }

    /// Sets the clock to an explicit second value.
    pub fn set_secs(&self, secs: u64) {
        self.secs.store(secs, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_secs(&self) -> u64 {
        self.secs.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances() {
        let clock = FakeClock::new();
        assert_eq!(clock.now_secs(), 0);
        clock.advance(Duration::from_secs(3));
        assert_eq!(clock.now_secs(), 3);
        clock.set_secs(100);
        assert_eq!(clock.now_secs(), 100);
    }
}
