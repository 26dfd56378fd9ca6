// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! A single-task batching processor: coalesces signal data by size or idle
//! timeout, with optional per-call back-pressure and item-accurate splitting
//! of over-large exports.

pub mod config;
pub mod error;
pub mod metrics;
pub mod processor;
pub mod signal_data;

pub use config::Config;
pub use error::ConfigError;
pub use metrics::BatchMetrics;
pub use processor::{spawn, BatchProcessorHandle, ShutdownHandle};
pub use signal_data::SignalData;
