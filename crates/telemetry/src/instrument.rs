// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Minimal counter instrument.
//!
//! Deliberately not a full metrics SDK: each subsystem owns a plain struct of
//! `Counter<u64>` fields (see e.g. `otelcol_core_batch::metrics::BatchMetrics`)
//! and exposes it for an embedder to snapshot and export however it likes.

use std::sync::atomic::{AtomicU64, Ordering};

/// A monotonically increasing counter, safe to share across threads.
#[derive(Debug, Default)]
pub struct Counter<T = u64> {
    value: AtomicU64,
    _marker: std::marker::PhantomData<T>,
}

impl Counter<u64> {
    /// Increments the counter by one.
    pub fn inc(&self) {
        let _ = self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Increments the counter by `n`.
    pub fn add(&self, n: u64) {
        let _ = self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Returns the current value.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

impl Clone for Counter<u64> {
    fn clone(&self) -> Self {
        Self {
            value: AtomicU64::new(self.get()),
            _marker: std::marker::PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_and_adds() {
        let c = Counter::<u64>::default();
        c.inc();
        c.add(41);
        assert_eq!(c.get(), 42);
    }
}
