// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Attribute values attached to spans, resources, and log records.
//!
//! This is intentionally a small subset of the OTLP `AnyValue` union: it
//! covers exactly what the tail-sampling policies in
//! `otelcol_core_sampling::policy` need to evaluate (`numeric_attribute`,
//! `string_attribute`) and nothing more.

use crate::container::EstimateSize;

/// An attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// A signed integer value (the `numeric_attribute` policy reads this variant).
    Int(i64),
    /// A string value (the `string_attribute` policy reads this variant).
    Str(String),
    /// A boolean value.
    Bool(bool),
    /// A floating point value.
    Double(f64),
}

impl AttributeValue {
    /// Returns the integer value, if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttributeValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string value, if this is a `Str`.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }
}

impl EstimateSize for AttributeValue {
    fn estimate_size(&self) -> usize {
        match self {
            AttributeValue::Int(_) | AttributeValue::Double(_) => 8,
            AttributeValue::Bool(_) => 1,
            AttributeValue::Str(s) => s.len(),
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Str(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Str(v)
    }
}

impl From<bool> for AttributeValue {
    fn from(v: bool) -> Self {
        AttributeValue::Bool(v)
    }
}
