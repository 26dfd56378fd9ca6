// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Tail-sampling configuration and policy errors.

use std::sync::Arc;
use thiserror::Error;

/// Tail-sampling engine configuration errors. Every field of
/// [`crate::config::Config`] is either type-enforced (`max_traces` is a
/// `NonZeroUsize`) or has no invalid value (`decision_wait` of zero just
/// means an immediate verdict on the next tick), so there is currently
/// nothing for [`crate::config::Config::validate`] to reject; the type
/// stays so a future field with a real invariant has somewhere to report it.
#[derive(Debug, Error)]
pub enum ConfigError {}

/// A policy failed to evaluate a trace. Treated as that policy returning
/// `NotSampled`; never aborts the overall verdict.
#[derive(Debug, Error, Clone)]
#[error("policy {policy} failed: {message}")]
pub struct PolicyError {
    /// Name of the policy that failed.
    pub policy: Arc<str>,
    /// Human-readable failure reason.
    pub message: Arc<str>,
}

impl PolicyError {
    /// Builds a policy error.
    pub fn new(policy: impl Into<Arc<str>>, message: impl Into<Arc<str>>) -> Self {
        Self {
            policy: policy.into(),
            message: message.into(),
        }
    }
}
