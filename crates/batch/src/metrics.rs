// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Batching processor metrics.
//!
//! A hand-rolled, much-reduced stand-in for the teacher's
//! `#[metric_set(...)]`-macro-generated `OtapBatchProcessorMetrics` /
//! `MetricSet<T>` machinery (a proc-macro-driven metric registry this core
//! does not reconstruct — see DESIGN.md). Each field is an
//! `otelcol_core_telemetry::instrument::Counter<u64>`, matching the
//! instrument type the teacher uses, just registered and read directly
//! rather than through the macro-generated `MetricSet` collector.

use otelcol_core_telemetry::instrument::Counter;

/// Counters for the batching processor, one instance per processor.
#[derive(Debug, Default)]
pub struct BatchMetrics {
    /// Total items consumed, traces.
    pub consumed_items_traces: Counter<u64>,
    /// Total items consumed, metrics.
    pub consumed_items_metrics: Counter<u64>,
    /// Total items consumed, logs.
    pub consumed_items_logs: Counter<u64>,
    /// Total items consumed, profiles.
    pub consumed_items_profiles: Counter<u64>,

    /// Flushes triggered by the size threshold.
    pub flushes_size: Counter<u64>,
    /// Flushes triggered by the idle timer.
    pub flushes_timer: Counter<u64>,
    /// Flushes triggered by shutdown drain.
    pub flushes_shutdown: Counter<u64>,

    /// Export calls that required a split at `send_batch_max_size`.
    pub split_requests: Counter<u64>,
    /// Ingress items dropped for carrying zero signal items.
    pub dropped_empty: Counter<u64>,
}
