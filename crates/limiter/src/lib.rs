// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! A polymorphic, keyed limiter substrate.
//!
//! Two limiter shapes — [`RateLimiter`] (counts, never holds anything across
//! the call it admits) and [`ResourceLimiter`] (acquires a held resource,
//! released via a guard) — both adapt into the single scoped form,
//! [`LimiterWrapper`], that the rest of this crate operates on:
//! [`compose::seq`] folds a sequence of wrappers into one with LIFO release
//! order, [`registry::ExtensionRegistry`] resolves a configured middleware ID
//! and weight key to a wrapper, and [`wiring::WiredConsumer`] applies the
//! fixed `request_count` → `request_items` → `memory_size` weight-key chain
//! around a signal consumer.

pub mod compose;
pub mod ctx;
pub mod error;
pub mod primitives;
pub mod registry;
pub mod wiring;

pub use compose::{seq, Composed};
pub use ctx::Ctx;
pub use error::LimiterError;
pub use primitives::{
    boxed, CallFuture, LimiterWrapper, PassThrough, RateLimiter, RateLimiterWrapper, ReleaseGuard,
    ResourceLimiter, ResourceLimiterWrapper,
};
pub use registry::{ExtensionProbe, ExtensionRegistry, RateLimiterProvider, ResourceLimiterProvider};
pub use wiring::{weight_key, PerSignalLimiters, WiredConsumer};
