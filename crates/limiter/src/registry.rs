// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Resolving a configured middleware ID to a limiter.
//!
//! Grounded on the collector's extension registry: a middleware ID in
//! configuration names an extension, looked up in a `HashMap<String, _>`, and
//! resolution fails with a distinguishable error for "no such extension"
//! versus "wrong kind of extension". Host languages with structural
//! interfaces let a single extension object satisfy two interfaces at once
//! and detect that at the point of use; Rust has no such structural check, so
//! the equivalent here is explicit: an extension registers under
//! [`ExtensionProbe`], which default-declines both provider roles, and
//! registration itself rejects an extension that opts into both (mirroring
//! the "mutual exclusion enforced at wiring time" invariant).

use crate::error::LimiterError;
use crate::primitives::{LimiterWrapper, RateLimiter, ResourceLimiter};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolves a named weight key to a concrete [`RateLimiter`].
pub trait RateLimiterProvider: Send + Sync {
    /// Returns the rate limiter backing `weight_key`, or
    /// [`LimiterError::UnrecognizedKey`] if this provider doesn't recognize it.
    fn rate_limiter(&self, weight_key: &str) -> Result<Arc<dyn RateLimiter>, LimiterError>;
}

/// Resolves a named weight key to a concrete [`ResourceLimiter`].
pub trait ResourceLimiterProvider: Send + Sync {
    /// Returns the resource limiter backing `weight_key`, or
    /// [`LimiterError::UnrecognizedKey`] if this provider doesn't recognize it.
    fn resource_limiter(&self, weight_key: &str) -> Result<Arc<dyn ResourceLimiter>, LimiterError>;
}

/// An extension's opt-in to one or both provider roles. Implement this for
/// the concrete extension type; override only the method(s) matching the
/// role(s) the extension actually plays. Overriding both is a legitimate
/// thing to write, but [`ExtensionRegistry::register`] will refuse to accept
/// the result — a single middleware ID must resolve unambiguously.
pub trait ExtensionProbe {
    /// Returns `self` as a [`RateLimiterProvider`], if it is one.
    fn as_rate_provider(self: Arc<Self>) -> Option<Arc<dyn RateLimiterProvider>> {
        None
    }

    /// Returns `self` as a [`ResourceLimiterProvider`], if it is one.
    fn as_resource_provider(self: Arc<Self>) -> Option<Arc<dyn ResourceLimiterProvider>> {
        None
    }
}

enum RegisteredProvider {
    Rate(Arc<dyn RateLimiterProvider>),
    Resource(Arc<dyn ResourceLimiterProvider>),
}

/// Maps middleware IDs (as named in pipeline configuration) to the extension
/// registered under them.
#[derive(Default)]
pub struct ExtensionRegistry {
    entries: HashMap<String, RegisteredProvider>,
}

impl ExtensionRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `extension` under `id`. Fails if `extension` declares
    /// neither provider role ([`LimiterError::NotALimiter`]) or both
    /// ([`LimiterError::Conflict`]).
    pub fn register<T>(&mut self, id: impl Into<String>, extension: Arc<T>) -> Result<(), LimiterError>
    where
        T: ExtensionProbe + 'static,
    {
        let id = id.into();
        let as_rate = Arc::clone(&extension).as_rate_provider();
        let as_resource = extension.as_resource_provider();
        let provider = match (as_rate, as_resource) {
            (Some(_), Some(_)) => return Err(LimiterError::Conflict { id }),
            (None, None) => return Err(LimiterError::NotALimiter { id }),
            (Some(r), None) => RegisteredProvider::Rate(r),
            (None, Some(r)) => RegisteredProvider::Resource(r),
        };
        let _ = self.entries.insert(id, provider);
        Ok(())
    }

    /// Resolves `id` and `weight_key` to a [`LimiterWrapper`], dispatching to
    /// the [`RateLimiter`] or [`ResourceLimiter`] adapter depending on which
    /// role the registered extension plays.
    pub fn resolve_limiter_wrapper(
        &self,
        id: &str,
        weight_key: &str,
    ) -> Result<Arc<dyn LimiterWrapper>, LimiterError> {
        match self.entries.get(id) {
            None => Err(LimiterError::Unresolved { id: id.to_string() }),
            Some(RegisteredProvider::Rate(p)) => {
                let limiter = p.rate_limiter(weight_key)?;
                Ok(Arc::new(ArcRateLimiter(limiter)) as Arc<dyn LimiterWrapper>)
            }
            Some(RegisteredProvider::Resource(p)) => {
                let limiter = p.resource_limiter(weight_key)?;
                Ok(Arc::new(ArcResourceLimiter(limiter)) as Arc<dyn LimiterWrapper>)
            }
        }
    }
}

/// Adapts an `Arc<dyn RateLimiter>` into a [`LimiterWrapper`]: admits, then
/// runs `f` unconditionally, same as `RateLimiterWrapper` but over the
/// trait object the registry hands back rather than a generic `R`.
struct ArcRateLimiter(Arc<dyn RateLimiter>);

#[async_trait::async_trait]
impl LimiterWrapper for ArcRateLimiter {
    fn must_deny(&self, ctx: &crate::ctx::Ctx) -> Option<LimiterError> {
        self.0.must_deny(ctx)
    }

    async fn limit_call(
        &self,
        ctx: crate::ctx::Ctx,
        value: u64,
        f: crate::primitives::CallFuture,
    ) -> Result<(), LimiterError> {
        self.0.limit(&ctx, value).await?;
        f.await
    }
}

/// Adapts an `Arc<dyn ResourceLimiter>` into a [`LimiterWrapper`]: acquires,
/// runs `f`, releases. Same shape as `ResourceLimiterWrapper`.
struct ArcResourceLimiter(Arc<dyn ResourceLimiter>);

#[async_trait::async_trait]
impl LimiterWrapper for ArcResourceLimiter {
    fn must_deny(&self, ctx: &crate::ctx::Ctx) -> Option<LimiterError> {
        self.0.must_deny(ctx)
    }

    async fn limit_call(
        &self,
        ctx: crate::ctx::Ctx,
        value: u64,
        f: crate::primitives::CallFuture,
    ) -> Result<(), LimiterError> {
        let guard = self.0.acquire(&ctx, value).await?;
        let result = f.await;
        drop(guard);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctx::Ctx;
    use crate::primitives::boxed;

    struct FixedRate;

    #[async_trait::async_trait]
    impl RateLimiter for FixedRate {
        async fn limit(&self, _ctx: &Ctx, _value: u64) -> Result<(), LimiterError> {
            Ok(())
        }
    }

    struct OnlyRateProvider;

    impl RateLimiterProvider for OnlyRateProvider {
        fn rate_limiter(&self, weight_key: &str) -> Result<Arc<dyn RateLimiter>, LimiterError> {
            if weight_key == "request_count" {
                Ok(Arc::new(FixedRate))
            } else {
                Err(LimiterError::UnrecognizedKey {
                    id: "only-rate".to_string(),
                    key: weight_key.to_string(),
                })
            }
        }
    }

    impl ExtensionProbe for OnlyRateProvider {
        fn as_rate_provider(self: Arc<Self>) -> Option<Arc<dyn RateLimiterProvider>> {
            Some(self)
        }
    }

    struct NeitherProvider;
    impl ExtensionProbe for NeitherProvider {}

    struct BothProvider;
    impl RateLimiterProvider for BothProvider {
        fn rate_limiter(&self, _weight_key: &str) -> Result<Arc<dyn RateLimiter>, LimiterError> {
            Ok(Arc::new(FixedRate))
        }
    }
    impl ResourceLimiterProvider for BothProvider {
        fn resource_limiter(&self, _weight_key: &str) -> Result<Arc<dyn ResourceLimiter>, LimiterError> {
            unreachable!("registration should be rejected before this is ever called")
        }
    }
    impl ExtensionProbe for BothProvider {
        fn as_rate_provider(self: Arc<Self>) -> Option<Arc<dyn RateLimiterProvider>> {
            Some(self)
        }
        fn as_resource_provider(self: Arc<Self>) -> Option<Arc<dyn ResourceLimiterProvider>> {
            Some(self)
        }
    }

    #[test]
    fn unresolved_id_is_distinguishable() {
        let registry = ExtensionRegistry::new();
        let err = registry
            .resolve_limiter_wrapper("missing", "request_count")
            .unwrap_err();
        assert!(matches!(err, LimiterError::Unresolved { .. }));
    }

    #[test]
    fn neither_provider_is_not_a_limiter() {
        let mut registry = ExtensionRegistry::new();
        let err = registry
            .register("ext", Arc::new(NeitherProvider))
            .unwrap_err();
        assert!(matches!(err, LimiterError::NotALimiter { .. }));
    }

    #[test]
    fn both_providers_is_conflict() {
        let mut registry = ExtensionRegistry::new();
        let err = registry.register("ext", Arc::new(BothProvider)).unwrap_err();
        assert!(matches!(err, LimiterError::Conflict { .. }));
    }

    #[tokio::test]
    async fn resolves_and_drives_a_rate_provider() {
        let mut registry = ExtensionRegistry::new();
        registry
            .register("ext", Arc::new(OnlyRateProvider))
            .unwrap();
        let wrapper = registry
            .resolve_limiter_wrapper("ext", "request_count")
            .unwrap();
        wrapper
            .limit_call(Ctx::new(), 1, boxed(async { Ok(()) }))
            .await
            .unwrap();

        let err = registry
            .resolve_limiter_wrapper("ext", "memory_size")
            .unwrap_err();
        assert!(matches!(err, LimiterError::UnrecognizedKey { .. }));
    }
}
