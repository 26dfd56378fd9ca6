// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! A single container type spanning all four signals, so one accumulator,
//! one ingress channel, and one flush path serve traces, metrics, logs, and
//! profiles alike.

use otelcol_core_pdata::{LogsData, MetricsData, PipelineData, ProfilesData, SignalType, TracesData};

/// One signal's worth of pipeline data, tagged by which signal it is.
#[derive(Debug, Clone)]
pub enum SignalData {
    /// Trace spans.
    Traces(TracesData),
    /// Metric data points.
    Metrics(MetricsData),
    /// Log records.
    Logs(LogsData),
    /// Profiling samples.
    Profiles(ProfilesData),
}

impl SignalData {
    /// An empty container of the given signal kind.
    #[must_use]
    pub fn empty(kind: SignalType) -> Self {
        match kind {
            SignalType::Traces => Self::Traces(TracesData::default()),
            SignalType::Metrics => Self::Metrics(MetricsData::default()),
            SignalType::Logs => Self::Logs(LogsData::default()),
            SignalType::Profiles => Self::Profiles(ProfilesData::default()),
        }
    }

    /// Which signal this container holds.
    #[must_use]
    pub fn kind(&self) -> SignalType {
        match self {
            Self::Traces(_) => SignalType::Traces,
            Self::Metrics(_) => SignalType::Metrics,
            Self::Logs(_) => SignalType::Logs,
            Self::Profiles(_) => SignalType::Profiles,
        }
    }

    /// Number of items (spans / points / records / samples).
    #[must_use]
    pub fn item_count(&self) -> usize {
        match self {
            Self::Traces(d) => d.item_count(),
            Self::Metrics(d) => d.item_count(),
            Self::Logs(d) => d.item_count(),
            Self::Profiles(d) => d.item_count(),
        }
    }

    /// Estimated encoded byte size.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        match self {
            Self::Traces(d) => d.byte_size(),
            Self::Metrics(d) => d.byte_size(),
            Self::Logs(d) => d.byte_size(),
            Self::Profiles(d) => d.byte_size(),
        }
    }

    /// True if there are no items at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Traces(d) => d.is_empty(),
            Self::Metrics(d) => d.is_empty(),
            Self::Logs(d) => d.is_empty(),
            Self::Profiles(d) => d.is_empty(),
        }
    }

    /// Drains `other` into `self`. Panics if the two are not the same
    /// signal kind — callers (the batching accumulator) never mix kinds.
    pub fn move_and_append_from(&mut self, mut other: Self) {
        match (self, &mut other) {
            (Self::Traces(dst), Self::Traces(src)) => src.move_and_append_to(dst),
            (Self::Metrics(dst), Self::Metrics(src)) => src.move_and_append_to(dst),
            (Self::Logs(dst), Self::Logs(src)) => src.move_and_append_to(dst),
            (Self::Profiles(dst), Self::Profiles(src)) => src.move_and_append_to(dst),
            _ => panic!("move_and_append_from: mismatched signal kinds"),
        }
    }

    /// Splits off exactly `n` items, preferring whole resource groups. See
    /// `Container::split_off`.
    #[must_use]
    pub fn split_off(&mut self, n: usize) -> Self {
        match self {
            Self::Traces(d) => Self::Traces(d.split_off(n)),
            Self::Metrics(d) => Self::Metrics(d.split_off(n)),
            Self::Logs(d) => Self::Logs(d.split_off(n)),
            Self::Profiles(d) => Self::Profiles(d.split_off(n)),
        }
    }
}
