// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Tail-sampling engine metrics: a hand-rolled, much-reduced stand-in for
//! the teacher's `#[metric_set(...)]`-generated metric structs — see
//! `otelcol_core_batch::metrics` for the same pattern applied to batching.

use otelcol_core_telemetry::instrument::Counter;

/// Counters for one tail-sampling engine instance.
#[derive(Debug, Default)]
pub struct SamplingMetrics {
    /// New traces admitted into `trace_map`.
    pub traces_admitted: Counter<u64>,
    /// Traces evicted from `trace_map` to make room for a new one.
    pub traces_evicted: Counter<u64>,
    /// Traces decided Sampled.
    pub decisions_sampled: Counter<u64>,
    /// Traces decided NotSampled.
    pub decisions_not_sampled: Counter<u64>,
    /// Individual policy evaluations that returned an error.
    pub policy_errors: Counter<u64>,
    /// Late spans forwarded downstream for an already-Sampled trace.
    pub late_spans_forwarded: Counter<u64>,
    /// Late spans dropped for an already-NotSampled trace.
    pub late_spans_dropped: Counter<u64>,
    /// Downstream export errors on a Sampled dispatch.
    pub downstream_errors: Counter<u64>,
}
