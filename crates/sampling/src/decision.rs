// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Per-trace state and the vocabulary of sampling decisions.

use otelcol_core_pdata::Span;
use std::sync::Arc;

/// A policy's per-trace decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// The policy votes to keep the trace.
    Sampled,
    /// The policy votes to drop the trace.
    NotSampled,
    /// The policy has no opinion; only meaningful under `FirstMatchWins`,
    /// where it is skipped rather than counted against the trace.
    Unspecified,
}

/// The engine's final verdict on a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Forward the trace's spans downstream.
    Sampled,
    /// Drop the trace's spans.
    NotSampled,
}

/// Attribution context captured from the policy that decided a `Sampled`
/// verdict, for downstream per-policy accounting.
#[derive(Debug, Clone)]
pub struct PolicyContext {
    /// Position of the deciding policy in the configured policy list.
    pub policy_index: usize,
    /// Name of the deciding policy.
    pub policy_name: Arc<str>,
}

/// State tracked for one trace while it is resident in `trace_map`.
#[derive(Debug, Clone, Default)]
pub struct TraceData {
    /// Spans received for this trace so far, in arrival order.
    pub received_spans: Vec<Span>,
    /// One slot per configured policy, filled in exactly once at decision
    /// time.
    pub decisions: Vec<Option<PolicyDecision>>,
    /// Decision tick (since engine start) this trace was first admitted.
    pub arrival_tick: u64,
    /// Total spans received so far (== `received_spans.len()`, kept alongside
    /// it since policies read it far more often than the full span list).
    pub span_count: usize,
    /// Context from the policy that produced a `Sampled` verdict, if any.
    pub policy_ctx: Option<PolicyContext>,
}

impl TraceData {
    /// Creates an empty trace record admitted at the given tick.
    #[must_use]
    pub fn new(arrival_tick: u64) -> Self {
        Self {
            arrival_tick,
            ..Self::default()
        }
    }

    /// Appends incoming spans, updating `span_count`.
    pub fn append(&mut self, spans: impl IntoIterator<Item = Span>) {
        let before = self.received_spans.len();
        self.received_spans.extend(spans);
        self.span_count += self.received_spans.len() - before;
    }
}
