// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The bounded, shard-locked cache of in-flight (undecided) traces.
//!
//! `trace_map` mutations are serialized per trace ID by hashing the trace ID
//! down to a shard index, mirroring the "shard by a low-bit hash" guidance
//! for concurrent keyed caches; admission additionally holds a dedicated
//! lock around the evict-then-insert sequence so `|trace_map| <= max_traces`
//! holds for any outside observer, even though the bounded `delete_channel`
//! is logically single-producer single-consumer.

use crate::decision::TraceData;
use otelcol_core_pdata::TraceId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

const SHARD_COUNT: usize = 16;

fn shard_index(id: &TraceId) -> usize {
    // Trace IDs are already high-entropy (random per the OTLP spec); the low
    // byte is as good a shard selector as any stronger hash.
    (id[15] as usize) % SHARD_COUNT
}

/// Shard-locked map of trace ID to in-flight trace state, bounded to
/// `max_traces` resident entries via a paired eviction FIFO.
pub struct TraceMap {
    shards: Vec<Mutex<HashMap<TraceId, TraceData>>>,
    num_traces_on_map: AtomicUsize,
    max_traces: NonZeroUsize,
    admit_lock: Mutex<()>,
    delete_tx: mpsc::Sender<TraceId>,
    delete_rx: Mutex<mpsc::Receiver<TraceId>>,
}

/// Outcome of admitting a span's trace ID.
pub enum Admission {
    /// The trace was already resident; its spans were appended.
    Existing,
    /// The trace was newly admitted, possibly evicting the oldest resident
    /// trace to make room.
    New {
        /// Trace evicted to make room, if the map was at capacity.
        evicted: Option<TraceId>,
    },
}

impl TraceMap {
    /// Builds an empty trace map bounded to `max_traces` entries.
    #[must_use]
    pub fn new(max_traces: NonZeroUsize) -> Self {
        let (delete_tx, delete_rx) = mpsc::channel(max_traces.get());
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
            num_traces_on_map: AtomicUsize::new(0),
            max_traces,
            admit_lock: Mutex::new(()),
            delete_tx,
            delete_rx: Mutex::new(delete_rx),
        }
    }

    /// Current resident trace count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.num_traces_on_map.load(Ordering::Acquire)
    }

    /// True if there are no resident traces.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Admits a trace ID seen for the first time at `tick` if not already
    /// resident, evicting the oldest admitted trace if the map is full, then
    /// runs `append` against the (possibly just-created) entry's data.
    pub fn admit_and_append(&self, id: TraceId, tick: u64, append: impl FnOnce(&mut TraceData)) -> Admission {
        let shard = shard_index(&id);

        // Fast path: trace already resident, no need for the admit lock.
        {
            let mut guard = self.shards[shard].lock();
            if let Some(data) = guard.get_mut(&id) {
                append(data);
                return Admission::Existing;
            }
        }

        // Slow path: admitting a brand new trace. Serialize the
        // evict-then-insert sequence so the map never briefly exceeds
        // `max_traces` under concurrent admitters.
        let _admit_guard = self.admit_lock.lock();

        // Re-check: another admitter may have inserted this ID while we
        // waited for the admit lock.
        {
            let mut guard = self.shards[shard].lock();
            if let Some(data) = guard.get_mut(&id) {
                append(data);
                return Admission::Existing;
            }
        }

        let evicted = match self.delete_tx.try_send(id) {
            Ok(()) => None,
            Err(mpsc::error::TrySendError::Full(id)) => {
                let mut delete_rx = self.delete_rx.lock();
                let oldest = delete_rx.try_recv().ok();
                if let Some(oldest_id) = oldest {
                    self.remove(&oldest_id);
                }
                // The channel has a free slot now (we just drained one, and
                // this path is the only producer/consumer pair in practice).
                let _ = self.delete_tx.try_send(id);
                oldest
            }
            Err(mpsc::error::TrySendError::Closed(_)) => None,
        };

        let mut data = TraceData::new(tick);
        append(&mut data);
        self.shards[shard].lock().insert(id, data);
        self.num_traces_on_map.fetch_add(1, Ordering::AcqRel);

        Admission::New { evicted }
    }

    /// Removes a trace's entry, decrementing the resident count. No-op if
    /// already absent (e.g. removed by both a decision tick and an eviction
    /// racing on the same ID).
    pub fn remove(&self, id: &TraceId) -> Option<TraceData> {
        let shard = shard_index(id);
        let removed = self.shards[shard].lock().remove(id);
        if removed.is_some() {
            self.num_traces_on_map.fetch_sub(1, Ordering::AcqRel);
        }
        removed
    }

    /// Runs `f` against a resident trace's data without removing it.
    pub fn with_trace<R>(&self, id: &TraceId, f: impl FnOnce(&mut TraceData) -> R) -> Option<R> {
        let shard = shard_index(id);
        self.shards[shard].lock().get_mut(id).map(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u8) -> TraceId {
        [n; 16]
    }

    #[test]
    fn new_trace_is_admitted_and_counted() {
        let map = TraceMap::new(NonZeroUsize::new(10).unwrap());
        let admission = map.admit_and_append(id(1), 0, |data| data.span_count += 1);
        assert!(matches!(admission, Admission::New { evicted: None }));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn existing_trace_appends_without_growing_count() {
        let map = TraceMap::new(NonZeroUsize::new(10).unwrap());
        map.admit_and_append(id(1), 0, |data| data.span_count += 1);
        let admission = map.admit_and_append(id(1), 0, |data| data.span_count += 1);
        assert!(matches!(admission, Admission::Existing));
        assert_eq!(map.len(), 1);
        map.with_trace(&id(1), |data| assert_eq!(data.span_count, 2)).unwrap();
    }

    #[test]
    fn full_map_evicts_oldest_admitted_trace() {
        let map = TraceMap::new(NonZeroUsize::new(2).unwrap());
        map.admit_and_append(id(1), 0, |_| {});
        map.admit_and_append(id(2), 0, |_| {});
        let admission = map.admit_and_append(id(3), 0, |_| {});
        assert!(matches!(admission, Admission::New { evicted: Some(e) } if e == id(1)));
        assert_eq!(map.len(), 2);
        assert!(map.with_trace(&id(1), |_| ()).is_none());
    }

    #[test]
    fn remove_decrements_count_and_is_idempotent() {
        let map = TraceMap::new(NonZeroUsize::new(10).unwrap());
        map.admit_and_append(id(1), 0, |_| {});
        assert!(map.remove(&id(1)).is_some());
        assert_eq!(map.len(), 0);
        assert!(map.remove(&id(1)).is_none());
    }
}
