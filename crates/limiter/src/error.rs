// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Error kinds for the limiter substrate.

use std::error::Error as StdError;
use std::sync::Arc;

/// Errors raised while admitting a call through a limiter, composing
/// limiters, or resolving a limiter from an extension registry.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LimiterError {
    /// A limiter denied the call. Carries the limiter's own explanation.
    #[error("denied: {reason}")]
    Denied {
        /// Human-readable reason the limiter gave for denying the call.
        reason: String,
    },

    /// The wrapped call (the downstream consumer, or whatever `f` the caller
    /// passed to `limit_call`) returned an error of its own. The original
    /// error is preserved via [`std::error::Error::source`].
    #[error("downstream call failed: {0}")]
    Downstream(#[source] Arc<dyn StdError + Send + Sync>),

    /// A middleware ID named in configuration has no extension registered
    /// under it.
    #[error("no extension registered under id {id:?}")]
    Unresolved {
        /// The middleware ID that failed to resolve.
        id: String,
    },

    /// The extension registered under `id` implements neither
    /// `RateLimiterProvider` nor `ResourceLimiterProvider`.
    #[error("extension {id:?} is not a rate or resource limiter provider")]
    NotALimiter {
        /// The middleware ID whose extension lacks either provider interface.
        id: String,
    },

    /// The extension registered under `id` implements both
    /// `RateLimiterProvider` and `ResourceLimiterProvider`. Configuration
    /// error, reported at wiring time rather than silently picking one.
    #[error("extension {id:?} implements both RateLimiterProvider and ResourceLimiterProvider")]
    Conflict {
        /// The middleware ID whose extension is ambiguous.
        id: String,
    },

    /// A weight key named in configuration is not one of the keys a provider
    /// recognizes.
    #[error("unrecognized weight key {key:?} for provider {id:?}")]
    UnrecognizedKey {
        /// The middleware ID the key was requested from.
        id: String,
        /// The offending weight key.
        key: String,
    },
}

impl LimiterError {
    /// Builds a [`LimiterError::Denied`] with the given reason.
    pub fn denied(reason: impl Into<String>) -> Self {
        Self::Denied {
            reason: reason.into(),
        }
    }

    /// Wraps an arbitrary downstream error.
    pub fn downstream(err: impl StdError + Send + Sync + 'static) -> Self {
        Self::Downstream(Arc::new(err))
    }
}
