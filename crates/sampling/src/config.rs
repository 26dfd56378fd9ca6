// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Tail-sampling engine configuration.

use crate::error::ConfigError;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::time::Duration;

/// How the final verdict is derived from each policy's individual decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMode {
    /// Evaluate every policy in declaration order; Sampled iff any policy
    /// returned Sampled. `policy_ctx` is taken from the first one that did.
    AllPoliciesOr,
    /// Evaluate in declaration order, stopping at the first policy that
    /// returns an opinion (Sampled or NotSampled). Policies that decline are
    /// skipped. NotSampled if every policy declines.
    FirstMatchWins,
}

impl Default for DecisionMode {
    fn default() -> Self {
        Self::AllPoliciesOr
    }
}

/// How many decision ticks a decided trace's verdict is remembered after its
/// entry leaves `trace_map`, so spans arriving just after a verdict are
/// routed by that verdict instead of being treated as a brand new trace. See
/// DESIGN.md for why this is a fixed tick count rather than a duration.
pub const DEFAULT_LATE_ARRIVAL_GRACE_TICKS: u32 = 5;

/// Tail-sampling engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Wall-clock delay between a trace's first span and its verdict.
    #[serde(with = "humantime_serde")]
    pub decision_wait: Duration,
    /// Hard cap on concurrent in-flight (undecided) traces.
    pub max_traces: NonZeroUsize,
    /// Sizing hint for batcher slot capacity; never a correctness bound.
    pub expected_new_traces_per_sec: usize,
    /// Precedence rule for combining individual policy decisions.
    pub decision_mode: DecisionMode,
    /// Grace window, in decision ticks, for late-arriving spans after a
    /// trace's verdict has been reached.
    pub late_arrival_grace_ticks: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            decision_wait: Duration::from_secs(30),
            max_traces: NonZeroUsize::new(50_000).expect("50_000 is non-zero"),
            expected_new_traces_per_sec: 100,
            decision_mode: DecisionMode::default(),
            late_arrival_grace_ticks: DEFAULT_LATE_ARRIVAL_GRACE_TICKS,
        }
    }
}

impl Config {
    /// Number of ring-batcher slots backing `decision_wait`: whole seconds,
    /// rounded up, minimum one.
    #[must_use]
    pub fn batcher_slots(&self) -> usize {
        let secs = self.decision_wait.as_secs_f64().ceil() as usize;
        secs.max(1)
    }

    /// Validates this configuration. `decision_wait = 0` is valid: it means
    /// an admitted trace gets an immediate verdict on the next decision
    /// tick, since `batcher_slots` already floors at one slot for it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}
