// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Minimal, in-memory stand-ins for the four OpenTelemetry signal containers.
//!
//! The real wire-level pdata types (protobuf-generated OTLP messages, or the
//! Arrow-encoded OTAP records the teacher crate works with) are an external
//! collaborator per the scope of this core — see the PURPOSE & SCOPE section of
//! the design document. This crate only needs to supply the two operations the
//! rest of the core consumes, [`PipelineData::item_count`] and
//! [`PipelineData::byte_size`], plus the move-append used when coalescing
//! batches. Everything here is generic over a resource-grouped shape
//! (`Vec<ResourceGroup<R, I>>`) so the four concrete containers
//! ([`TracesData`], [`MetricsData`], [`LogsData`], [`ProfilesData`]) share one
//! implementation, matching the "factor per-signal operations into a traits
//! object, parameterize over it" guidance for statically typed targets.

pub mod attribute;
pub mod consumer;
pub mod container;
pub mod logs;
pub mod metrics;
pub mod profiles;
pub mod traces;

pub use attribute::AttributeValue;
pub use consumer::{ConsumeError, Consumer};
pub use container::{Capabilities, EstimateSize, PipelineData, ResourceAttrs, ResourceGroup};
pub use logs::{LogRecord, LogsData};
pub use metrics::{DataPoint, MetricsData};
pub use profiles::{ProfileSample, ProfilesData};
pub use traces::{Span, TraceId, TracesData};

/// Which of the four pipeline signals a piece of data belongs to.
///
/// A non-closed set in spirit (profiles joined traces/metrics/logs relatively
/// recently in the OpenTelemetry data model) but closed here since the core
/// only has to reason about these four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalType {
    /// Spans grouped into traces.
    Traces,
    /// Metric data points.
    Metrics,
    /// Log records.
    Logs,
    /// Profiling samples.
    Profiles,
}

impl std::fmt::Display for SignalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalType::Traces => "traces",
            SignalType::Metrics => "metrics",
            SignalType::Logs => "logs",
            SignalType::Profiles => "profiles",
        };
        write!(f, "{s}")
    }
}
