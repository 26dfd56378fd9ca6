// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Configuration errors for the batching processor.

/// Errors raised validating a [`crate::config::Config`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Neither `send_batch_size` nor `send_batch_max_size` was set.
    #[error("send_batch_max_size or send_batch_size must be set")]
    NoThreshold,

    /// `send_batch_max_size` was set below `send_batch_size`.
    #[error("send_batch_max_size ({max}) must be >= send_batch_size ({size}) or unset")]
    MaxBelowSize {
        /// The configured `send_batch_max_size`.
        max: usize,
        /// The configured `send_batch_size`.
        size: usize,
    },
}
