// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Tail-sampling engine: a bounded per-trace cache evaluated by a set of
//! configurable policies once each trace's decision-wait window elapses.

pub mod batcher;
pub mod config;
pub mod decision;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod trace_map;

pub use config::{Config, DecisionMode};
pub use decision::{PolicyContext, PolicyDecision, TraceData, Verdict};
pub use engine::{spawn, ShutdownHandle, TailSamplingHandle};
pub use error::{ConfigError, PolicyError};
pub use metrics::SamplingMetrics;
pub use policy::{
    AlwaysSample, And, Composite, CompositeChild, CompositeChildSpec, NumericAttribute, Policy, PolicySpec,
    PolicyView, Probabilistic, RateLimiting, StringAttribute,
};
pub use trace_map::{Admission, TraceMap};
