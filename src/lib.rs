// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Wires the limiter substrate, batching processor, and tail-sampling engine
//! into one pipeline.
//!
//! Ingress order per signal is fixed: the [`otelcol_core_limiter`] weight-key
//! chain gates the call first, then the call lands on the single batching
//! processor task ([`otelcol_core_batch`]). Trace data leaving the batching
//! processor passes through the tail-sampling engine
//! ([`otelcol_core_sampling`]) before reaching the caller-supplied terminal
//! consumer; the other three signals go straight from the batching processor
//! to their terminal consumer. Re-exported as submodules so a caller can
//! reach any sub-crate's types without adding it as a direct dependency.

pub mod pipeline;

pub use otelcol_core_batch as batch;
pub use otelcol_core_limiter as limiter;
pub use otelcol_core_pdata as pdata;
pub use otelcol_core_sampling as sampling;
pub use otelcol_core_telemetry as telemetry;

pub use pipeline::{CoreError, Downstream, Host, LimiterConfig, Pipeline, PipelineConfig};
