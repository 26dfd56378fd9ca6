// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The `RateLimiter` / `ResourceLimiter` primitives and the `LimiterWrapper`
//! scoped form that composition and wiring operate on.

use crate::ctx::Ctx;
use crate::error::LimiterError;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

/// A boxed, owned future yielding the outcome of whatever call a limiter is
/// guarding. Not tied to a borrow of the limiter chain, so it can be built up
/// one nesting level at a time and handed across an `await` point.
pub type CallFuture = Pin<Box<dyn Future<Output = Result<(), LimiterError>> + Send>>;

/// Boxes `fut` into a [`CallFuture`].
pub fn boxed(fut: impl Future<Output = Result<(), LimiterError>> + Send + 'static) -> CallFuture {
    Box::pin(fut)
}

/// A counting admission control: caps how many calls (or how much of some
/// quantity) pass per unit time. Never holds a resource across the call it
/// admits — there is nothing to release.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Fast, synchronous pre-check: `Some(err)` if this limiter can already
    /// tell the call would be denied without doing any blocking work. MUST
    /// NOT block or perform I/O.
    fn must_deny(&self, ctx: &Ctx) -> Option<LimiterError> {
        let _ = ctx;
        None
    }

    /// Admits `value` units of whatever this limiter counts (calls, items,
    /// bytes). May block (e.g. waiting for a token bucket to refill).
    async fn limit(&self, ctx: &Ctx, value: u64) -> Result<(), LimiterError>;
}

/// A held-resource admission control: acquiring succeeds by handing back a
/// [`ReleaseGuard`] that must be dropped (or released) once the caller is
/// done with the resource.
#[async_trait]
pub trait ResourceLimiter: Send + Sync {
    /// See [`RateLimiter::must_deny`].
    fn must_deny(&self, ctx: &Ctx) -> Option<LimiterError> {
        let _ = ctx;
        None
    }

    /// Acquires `value` units of the resource, returning a guard that
    /// releases them when dropped.
    async fn acquire(&self, ctx: &Ctx, value: u64) -> Result<ReleaseGuard, LimiterError>;
}

/// Releases an acquired resource exactly once: on an explicit call to
/// [`ReleaseGuard::release`], or — if that's never called — when dropped.
/// Safe to let a panic unwind through: the release still runs.
pub struct ReleaseGuard {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl ReleaseGuard {
    /// Builds a guard that runs `f` on release/drop.
    pub fn new(f: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(f)),
        }
    }

    /// A guard that releases nothing (for limiters with no held resource to
    /// give back, or for [`PassThrough`]).
    #[must_use]
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Releases the resource now, rather than waiting for drop.
    pub fn release(mut self) {
        if let Some(f) = self.release.take() {
            f();
        }
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        if let Some(f) = self.release.take() {
            f();
        }
    }
}

impl std::fmt::Debug for ReleaseGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseGuard")
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// The scoped form every limiter is ultimately used through: wrap a call with
/// admission, run the call only if admitted, and guarantee any resource the
/// admission acquired is released once the call (however it exits) is done.
///
/// `LimiterWrapper` is the unit of composition: [`crate::compose::seq`] folds
/// a sequence of wrappers into one, and [`crate::wiring`] builds the
/// weight-keyed chain around a consumer out of these.
#[async_trait]
pub trait LimiterWrapper: Send + Sync {
    /// See [`RateLimiter::must_deny`] / [`ResourceLimiter::must_deny`].
    fn must_deny(&self, ctx: &Ctx) -> Option<LimiterError> {
        let _ = ctx;
        None
    }

    /// Admits `value`, then — iff admission succeeds — drives `f` to
    /// completion, releasing any acquired resource once `f` resolves.
    async fn limit_call(&self, ctx: Ctx, value: u64, f: CallFuture) -> Result<(), LimiterError>;
}

/// A `LimiterWrapper` that never denies and holds nothing: `limit_call`
/// simply runs `f`. The identity element of composition — composing zero
/// limiters, or wrapping a consumer no weight key applies to, yields this.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

#[async_trait]
impl LimiterWrapper for PassThrough {
    async fn limit_call(&self, _ctx: Ctx, _value: u64, f: CallFuture) -> Result<(), LimiterError> {
        f.await
    }
}

/// Adapts a [`RateLimiter`] into a [`LimiterWrapper`]: admits, then runs `f`
/// unconditionally (there is no resource to release).
pub struct RateLimiterWrapper<R> {
    limiter: R,
}

impl<R> RateLimiterWrapper<R> {
    /// Wraps `limiter`.
    pub fn new(limiter: R) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl<R: RateLimiter> LimiterWrapper for RateLimiterWrapper<R> {
    fn must_deny(&self, ctx: &Ctx) -> Option<LimiterError> {
        self.limiter.must_deny(ctx)
    }

    async fn limit_call(&self, ctx: Ctx, value: u64, f: CallFuture) -> Result<(), LimiterError> {
        self.limiter.limit(&ctx, value).await?;
        f.await
    }
}

/// Adapts a [`ResourceLimiter`] into a [`LimiterWrapper`]: acquires, runs
/// `f`, and releases the acquired resource once `f` resolves — on every exit
/// path, since the guard's `Drop` runs regardless of how the `await` above it
/// completes.
pub struct ResourceLimiterWrapper<R> {
    limiter: R,
}

impl<R> ResourceLimiterWrapper<R> {
    /// Wraps `limiter`.
    pub fn new(limiter: R) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl<R: ResourceLimiter> LimiterWrapper for ResourceLimiterWrapper<R> {
    fn must_deny(&self, ctx: &Ctx) -> Option<LimiterError> {
        self.limiter.must_deny(ctx)
    }

    async fn limit_call(&self, ctx: Ctx, value: u64, f: CallFuture) -> Result<(), LimiterError> {
        let guard = self.limiter.acquire(&ctx, value).await?;
        let result = f.await;
        drop(guard);
        result
    }
}
