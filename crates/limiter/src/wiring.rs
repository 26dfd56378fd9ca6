// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Wiring resolved limiters onto a signal-agnostic consumer.
//!
//! A pipeline node applies, in fixed cost order, up to three weight keys —
//! `request_count`, `request_items`, `memory_size` — wrapping a
//! [`Consumer`] so the cheapest-to-compute weight gates first and the most
//! expensive (the container's estimated byte size) is only computed once the
//! cheaper gates have already admitted the call. A missing key is skipped
//! entirely: no limiter is consulted and nothing is computed for it.

use crate::ctx::Ctx;
use crate::error::LimiterError;
use crate::primitives::{boxed, CallFuture, LimiterWrapper};
use async_trait::async_trait;
use otelcol_core_pdata::{ConsumeError, Consumer, PipelineData};
use std::sync::Arc;

/// Well-known weight keys this core wires, in the fixed application order:
/// outermost (cheapest, applied first) to innermost (most expensive,
/// applied last).
pub mod weight_key {
    /// One unit per call.
    pub const REQUEST_COUNT: &str = "request_count";
    /// The container's item count.
    pub const REQUEST_ITEMS: &str = "request_items";
    /// The container's estimated encoded byte size.
    pub const MEMORY_SIZE: &str = "memory_size";
}

/// The (optional) limiter resolved for each of the three weight keys a
/// signal consumer is wired with.
#[derive(Clone, Default)]
pub struct PerSignalLimiters {
    /// Limiter backing `request_count`, if configured.
    pub request_count: Option<Arc<dyn LimiterWrapper>>,
    /// Limiter backing `request_items`, if configured.
    pub request_items: Option<Arc<dyn LimiterWrapper>>,
    /// Limiter backing `memory_size`, if configured.
    pub memory_size: Option<Arc<dyn LimiterWrapper>>,
}

impl PerSignalLimiters {
    /// No limiters wired for any key: wrapping a consumer with this is a
    /// no-op.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// Wraps `inner` so every call to [`WiredConsumer::consume`] first clears, in
/// order, `request_count`, then `request_items`, then `memory_size`
/// (skipping any key with no limiter configured) before reaching `inner`.
pub struct WiredConsumer<D> {
    inner: Arc<dyn Consumer<D>>,
    limiters: PerSignalLimiters,
}

impl<D> WiredConsumer<D> {
    /// Builds a wired consumer around `inner` with the given per-key
    /// limiters.
    #[must_use]
    pub fn new(inner: Arc<dyn Consumer<D>>, limiters: PerSignalLimiters) -> Self {
        Self { inner, limiters }
    }
}

#[async_trait]
impl<D> Consumer<D> for WiredConsumer<D>
where
    D: PipelineData + Send + 'static,
{
    async fn consume(&self, data: D) -> Result<(), ConsumeError> {
        let ctx = Ctx::new();
        let result = run_count_gate(
            self.limiters.request_count.clone(),
            self.limiters.request_items.clone(),
            self.limiters.memory_size.clone(),
            ctx,
            Arc::clone(&self.inner),
            data,
        )
        .await;
        result.map_err(|e| ConsumeError::new(e.to_string()))
    }

    fn capabilities(&self) -> otelcol_core_pdata::Capabilities {
        self.inner.capabilities()
    }
}

fn call_inner<D>(inner: Arc<dyn Consumer<D>>, data: D) -> CallFuture
where
    D: Send + 'static,
{
    boxed(async move { inner.consume(data).await.map_err(LimiterError::downstream) })
}

/// Applies the `memory_size` gate (if configured), then calls `inner`. The
/// innermost stage: `data.byte_size()` is computed here, lazily, only once
/// control reaches this point (i.e. only after `request_count` and
/// `request_items` have already admitted the call).
fn run_memory_gate<D>(
    memory_size: Option<Arc<dyn LimiterWrapper>>,
    ctx: Ctx,
    inner: Arc<dyn Consumer<D>>,
    data: D,
) -> CallFuture
where
    D: PipelineData + Send + 'static,
{
    match memory_size {
        Some(lim) => {
            let byte_size = data.byte_size() as u64;
            let f = call_inner(inner, data);
            Box::pin(async move { lim.limit_call(ctx, byte_size, f).await })
        }
        None => call_inner(inner, data),
    }
}

/// Applies the `request_items` gate (if configured), deferring everything
/// below it (including the `memory_size` gate and its byte-size computation)
/// into the future passed to `limit_call`, so none of it runs unless this
/// gate admits.
fn run_items_gate<D>(
    request_items: Option<Arc<dyn LimiterWrapper>>,
    memory_size: Option<Arc<dyn LimiterWrapper>>,
    ctx: Ctx,
    inner: Arc<dyn Consumer<D>>,
    data: D,
) -> CallFuture
where
    D: PipelineData + Send + 'static,
{
    match request_items {
        Some(lim) => {
            let item_count = data.item_count() as u64;
            let ctx_rest = ctx.clone();
            let f: CallFuture = Box::pin(async move {
                run_memory_gate(memory_size, ctx_rest, inner, data).await
            });
            Box::pin(async move { lim.limit_call(ctx, item_count, f).await })
        }
        None => run_memory_gate(memory_size, ctx, inner, data),
    }
}

/// Applies the `request_count` gate (if configured), the outermost stage.
async fn run_count_gate<D>(
    request_count: Option<Arc<dyn LimiterWrapper>>,
    request_items: Option<Arc<dyn LimiterWrapper>>,
    memory_size: Option<Arc<dyn LimiterWrapper>>,
    ctx: Ctx,
    inner: Arc<dyn Consumer<D>>,
    data: D,
) -> Result<(), LimiterError>
where
    D: PipelineData + Send + 'static,
{
    match request_count {
        Some(lim) => {
            let ctx_rest = ctx.clone();
            let f: CallFuture = Box::pin(async move {
                run_items_gate(request_items, memory_size, ctx_rest, inner, data).await
            });
            lim.limit_call(ctx, 1, f).await
        }
        None => run_items_gate(request_items, memory_size, ctx, inner, data).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{RateLimiter, RateLimiterWrapper};
    use otelcol_core_pdata::traces::{one_span_trace, Span};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    struct Recorder {
        calls: Arc<AtomicU64>,
    }

    #[async_trait]
    impl<D: Send + 'static> Consumer<D> for Recorder {
        async fn consume(&self, _data: D) -> Result<(), ConsumeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct OrderRecordingLimiter {
        order: Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
        expect_value: u64,
        deny: bool,
    }

    #[async_trait]
    impl RateLimiter for OrderRecordingLimiter {
        async fn limit(&self, _ctx: &Ctx, value: u64) -> Result<(), LimiterError> {
            assert_eq!(value, self.expect_value, "{} saw unexpected value", self.name);
            self.order.lock().unwrap().push(self.name);
            if self.deny {
                Err(LimiterError::denied(self.name))
            } else {
                Ok(())
            }
        }
    }

    fn trace_with_two_spans() -> otelcol_core_pdata::traces::TracesData {
        let mut data = one_span_trace([1; 16], Span::new([1; 16], [1; 8], "a"));
        data.groups[0].items.push(Span::new([1; 16], [2; 8], "b"));
        data
    }

    #[tokio::test]
    async fn no_limiters_configured_reaches_inner() {
        let calls = Arc::new(AtomicU64::new(0));
        let inner = Arc::new(Recorder {
            calls: Arc::clone(&calls),
        });
        let wired = WiredConsumer::new(inner, PerSignalLimiters::none());
        wired.consume(trace_with_two_spans()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gates_apply_in_cost_order_with_correct_values() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicU64::new(0));
        let inner = Arc::new(Recorder {
            calls: Arc::clone(&calls),
        });

        let limiters = PerSignalLimiters {
            request_count: Some(Arc::new(RateLimiterWrapper::new(OrderRecordingLimiter {
                order: Arc::clone(&order),
                name: "request_count",
                expect_value: 1,
                deny: false,
            }))),
            request_items: Some(Arc::new(RateLimiterWrapper::new(OrderRecordingLimiter {
                order: Arc::clone(&order),
                name: "request_items",
                expect_value: 2,
                deny: false,
            }))),
            memory_size: Some(Arc::new(RateLimiterWrapper::new(OrderRecordingLimiter {
                order: Arc::clone(&order),
                name: "memory_size",
                expect_value: trace_with_two_spans().byte_size() as u64,
                deny: false,
            }))),
        };

        let wired = WiredConsumer::new(inner, limiters);
        wired.consume(trace_with_two_spans()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *order.lock().unwrap(),
            vec!["request_count", "request_items", "memory_size"]
        );
    }

    #[tokio::test]
    async fn denial_at_request_count_skips_later_gates_and_inner() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(AtomicU64::new(0));
        let inner = Arc::new(Recorder {
            calls: Arc::clone(&calls),
        });

        let limiters = PerSignalLimiters {
            request_count: Some(Arc::new(RateLimiterWrapper::new(OrderRecordingLimiter {
                order: Arc::clone(&order),
                name: "request_count",
                expect_value: 1,
                deny: true,
            }))),
            request_items: Some(Arc::new(RateLimiterWrapper::new(OrderRecordingLimiter {
                order: Arc::clone(&order),
                name: "request_items",
                expect_value: 2,
                deny: false,
            }))),
            memory_size: None,
        };

        let wired = WiredConsumer::new(inner, limiters);
        let err = wired.consume(trace_with_two_spans()).await.unwrap_err();
        assert!(err.to_string().contains("request_count"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(*order.lock().unwrap(), vec!["request_count"]);
    }
}
