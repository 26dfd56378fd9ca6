// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Profiles container.
//!
//! Profiles joined the OpenTelemetry signal family most recently; this core
//! treats them exactly like the other three signals for limiter and batching
//! purposes (the tail-sampling engine, per the spec, only ever operates on
//! traces).

use crate::container::{Container, EstimateSize};

/// A single profiling sample (a stack-trace location plus a value, collapsed
/// into the minimum this core needs to count and size it).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileSample {
    /// Symbolized (or not) location string.
    pub location: String,
    /// Sample value (e.g. nanoseconds of CPU time).
    pub value: i64,
}

impl EstimateSize for ProfileSample {
    fn estimate_size(&self) -> usize {
        self.location.len() + 8
    }
}

/// Profiles container: resource groups of profile samples.
pub type ProfilesData = Container<ProfileSample>;
