// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Logs container.

use crate::container::{Container, EstimateSize};

/// A single log record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogRecord {
    /// The log body.
    pub body: String,
    /// The severity text (e.g. `"ERROR"`).
    pub severity: String,
}

impl EstimateSize for LogRecord {
    fn estimate_size(&self) -> usize {
        self.body.len() + self.severity.len()
    }
}

/// Logs container: resource groups of log records.
pub type LogsData = Container<LogRecord>;
