// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-call context threaded through a limiter chain.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Context passed to every limiter operation. Carries cancellation so a
/// limiter blocked waiting for capacity (a token bucket's wait, a semaphore
/// acquire) can be woken up without waiting out its full timeout.
///
/// Cheap to clone: cancellation is shared via an `Arc`, so every clone of a
/// `Ctx` observes the same cancellation.
#[derive(Debug, Clone, Default)]
pub struct Ctx {
    cancelled: Arc<AtomicBool>,
}

impl Ctx {
    /// Builds a fresh, non-cancelled context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks this context (and every clone of it) cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// True once [`Ctx::cancel`] has been called on this context or a clone
    /// of it.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_observed_by_clones() {
        let ctx = Ctx::new();
        let clone = ctx.clone();
        assert!(!clone.is_cancelled());
        ctx.cancel();
        assert!(clone.is_cancelled());
    }
}
