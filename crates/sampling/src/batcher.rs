// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Time-sliced decision batcher: a ring of per-second slots that lets the
//! engine process "all traces first seen `decision_wait` seconds ago" as one
//! batch per tick, without scanning the whole trace map.

use otelcol_core_pdata::TraceId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A ring of `N` append-only slots, one written to per second. Each tick,
/// the slot about to be reused (last written to exactly `N` ticks ago) is
/// harvested and cleared for the next cycle.
pub struct DecisionBatcher {
    slots: Vec<Mutex<Vec<TraceId>>>,
    current: AtomicUsize,
}

impl DecisionBatcher {
    /// Builds a batcher with `num_slots` slots (== `decision_wait` rounded up
    /// to whole seconds), each pre-reserving `expected_new_traces_per_sec`
    /// capacity.
    #[must_use]
    pub fn new(num_slots: usize, expected_new_traces_per_sec: usize) -> Self {
        let num_slots = num_slots.max(1);
        let slots = (0..num_slots)
            .map(|_| Mutex::new(Vec::with_capacity(expected_new_traces_per_sec)))
            .collect();
        Self {
            slots,
            current: AtomicUsize::new(0),
        }
    }

    /// Appends a newly admitted trace ID to the slot currently accepting
    /// writes.
    pub fn add(&self, id: TraceId) {
        let idx = self.current.load(Ordering::Acquire);
        self.slots[idx].lock().push(id);
    }

    /// Advances the ring by one slot and returns the contents of the slot
    /// that just became the new write target — the one last used as the
    /// write target `N` ticks ago, i.e. the batch whose age is
    /// `decision_wait`.
    pub fn close_current_and_take_first_batch(&self) -> Vec<TraceId> {
        let len = self.slots.len();
        let next = (self.current.load(Ordering::Acquire) + 1) % len;
        let harvested = std::mem::take(&mut *self.slots[next].lock());
        self.current.store(next, Ordering::Release);
        harvested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_slot_batcher_harvests_every_tick() {
        let batcher = DecisionBatcher::new(1, 4);
        batcher.add([1; 16]);
        let batch = batcher.close_current_and_take_first_batch();
        assert_eq!(batch, vec![[1; 16]]);
        // the slot was cleared and is the only write target again
        batcher.add([2; 16]);
        let batch = batcher.close_current_and_take_first_batch();
        assert_eq!(batch, vec![[2; 16]]);
    }

    #[test]
    fn multi_slot_batcher_delays_by_ring_size() {
        let batcher = DecisionBatcher::new(3, 4);
        batcher.add([1; 16]);
        // first two ticks rotate through still-empty slots.
        assert!(batcher.close_current_and_take_first_batch().is_empty());
        assert!(batcher.close_current_and_take_first_batch().is_empty());
        // third tick harvests the slot [1;16] was written into.
        assert_eq!(batcher.close_current_and_take_first_batch(), vec![[1; 16]]);
    }
}
