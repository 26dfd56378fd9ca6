// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Metrics container.

use crate::container::{Container, EstimateSize};

/// A single metric data point (gauge/sum/histogram point, collapsed into one
/// shape since this core never inspects the metric type, only counts and
/// sizes it).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataPoint {
    /// The metric name this point belongs to.
    pub metric_name: String,
    /// The numeric value.
    pub value: f64,
}

impl EstimateSize for DataPoint {
    fn estimate_size(&self) -> usize {
        self.metric_name.len() + 8
    }
}

/// Metrics container: resource groups of data points.
pub type MetricsData = Container<DataPoint>;
