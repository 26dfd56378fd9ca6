// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Trace container: the only signal the tail-sampling engine operates on.

use crate::attribute::AttributeValue;
use crate::container::{Container, EstimateSize, ResourceAttrs, ResourceGroup};
use std::collections::HashMap;

/// A 16-byte OTLP trace ID.
pub type TraceId = [u8; 16];

/// A single span.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Span {
    /// The trace this span belongs to.
    pub trace_id: TraceId,
    /// This span's own ID.
    pub span_id: [u8; 8],
    /// Span name.
    pub name: String,
    /// Span attributes, read by `numeric_attribute` / `string_attribute` policies.
    pub attributes: HashMap<String, AttributeValue>,
}

impl Span {
    /// Builds a span with the given trace ID and name, with empty attributes.
    #[must_use]
    pub fn new(trace_id: TraceId, span_id: [u8; 8], name: impl Into<String>) -> Self {
        Self {
            trace_id,
            span_id,
            name: name.into(),
            attributes: HashMap::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        let _ = self.attributes.insert(key.into(), value.into());
        self
    }
}

impl EstimateSize for Span {
    fn estimate_size(&self) -> usize {
        16 + 8
            + self.name.len()
            + self
                .attributes
                .iter()
                .map(|(k, v)| k.len() + v.estimate_size())
                .sum::<usize>()
    }
}

/// Trace container: resource groups of spans.
pub type TracesData = Container<Span>;

/// Convenience constructor for a single-resource, single-span trace, used
/// heavily in tests.
#[must_use]
pub fn one_span_trace(trace_id: TraceId, span: Span) -> TracesData {
    let mut group = ResourceGroup::new(ResourceAttrs::new());
    group.items.push(span);
    Container {
        groups: vec![group],
    }
}
