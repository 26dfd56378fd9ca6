// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The consumer interface every downstream hand-off in this core targets:
//! limiter-wired ingress, the batching processor's export, and the
//! tail-sampling processor's dispatch of a sampled trace all end in a call to
//! some `Consumer<D>`.

use crate::container::Capabilities;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Error returned by a [`Consumer`].
#[derive(Debug, Clone)]
pub struct ConsumeError {
    message: Arc<str>,
}

impl ConsumeError {
    /// Builds a new consume error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Arc::from(message.into()),
        }
    }
}

impl fmt::Display for ConsumeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "consumer error: {}", self.message)
    }
}

impl std::error::Error for ConsumeError {}

/// A downstream consumer of signal data, parameterized over the pipeline data
/// type it accepts. Implemented by the next stage in the pipeline (a further
/// processor, an exporter, or — in tests — a recording stub).
#[async_trait]
pub trait Consumer<D>: Send + Sync {
    /// Consumes `data`, taking ownership of it.
    async fn consume(&self, data: D) -> Result<(), ConsumeError>;

    /// Capabilities this consumer advertises. Defaults to not mutating data.
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}
