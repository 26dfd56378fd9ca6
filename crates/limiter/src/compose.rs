// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Sequential composition of `LimiterWrapper`s.
//!
//! Composing `[L1, L2, ..., Ln]` is equivalent to the nested call
//! `L1.limit_call(ctx, v, L2.limit_call(ctx, v, ... Ln.limit_call(ctx, v, f)))`:
//! `L1` admits first and, if it held a resource, releases last. Denial by any
//! `Li` short-circuits before `Li+1` is ever consulted, and `f` never runs.

use crate::ctx::Ctx;
use crate::error::LimiterError;
use crate::primitives::{CallFuture, LimiterWrapper};
use async_trait::async_trait;
use std::sync::Arc;

/// Composes `limiters`, in order, into a single [`LimiterWrapper`]. An empty
/// sequence composes to a pass-through.
#[must_use]
pub fn seq(limiters: Vec<Arc<dyn LimiterWrapper>>) -> Composed {
    Composed {
        limiters: Arc::new(limiters),
    }
}

/// A sequence of limiters composed into one [`LimiterWrapper`], built by
/// [`seq`].
pub struct Composed {
    limiters: Arc<Vec<Arc<dyn LimiterWrapper>>>,
}

#[async_trait]
impl LimiterWrapper for Composed {
    fn must_deny(&self, ctx: &Ctx) -> Option<LimiterError> {
        self.limiters.iter().find_map(|l| l.must_deny(ctx))
    }

    async fn limit_call(&self, ctx: Ctx, value: u64, f: CallFuture) -> Result<(), LimiterError> {
        chain(Arc::clone(&self.limiters), 0, ctx, value, f).await
    }
}

/// Builds the nested continuation starting at `idx`: a future that, when
/// polled, consults `limiters[idx]` (if any remain) and recurses for the
/// rest, bottoming out at `f` once `idx` reaches the end.
///
/// A plain (non-`async`) function so the recursion is ordinary value
/// construction rather than self-referential `async fn` recursion: each call
/// returns a boxed future without itself being one.
fn chain(
    limiters: Arc<Vec<Arc<dyn LimiterWrapper>>>,
    idx: usize,
    ctx: Ctx,
    value: u64,
    f: CallFuture,
) -> CallFuture {
    if idx >= limiters.len() {
        return f;
    }
    Box::pin(async move {
        let lim = Arc::clone(&limiters[idx]);
        let ctx_for_rest = ctx.clone();
        let rest = chain(limiters, idx + 1, ctx_for_rest, value, f);
        lim.limit_call(ctx, value, rest).await
    })
}
