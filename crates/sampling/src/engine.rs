// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The tail-sampling orchestrator: wires the trace map, decision batcher,
//! and policy set together behind a `Consumer<TracesData>` admission front
//! end and a 1-second decision-tick background task.

use crate::batcher::DecisionBatcher;
use crate::config::{Config, DecisionMode};
use crate::decision::{PolicyContext, PolicyDecision, TraceData, Verdict};
use crate::error::ConfigError;
use crate::metrics::SamplingMetrics;
use crate::policy::{Policy, PolicySpec, PolicyView};
use crate::trace_map::{Admission, TraceMap};
use async_trait::async_trait;
use otelcol_core_pdata::{ConsumeError, Consumer, ResourceAttrs, ResourceGroup, Span, TraceId, TracesData};
use otelcol_core_telemetry::clock::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

struct Inner {
    config: Config,
    trace_map: TraceMap,
    batcher: DecisionBatcher,
    policies: Vec<Arc<dyn Policy>>,
    recent_verdicts: Mutex<HashMap<TraceId, (Verdict, u64)>>,
    tick_counter: AtomicU64,
    downstream: Arc<dyn Consumer<TracesData>>,
    metrics: Arc<SamplingMetrics>,
}

/// A cloneable front end admitting spans into the tail-sampling engine.
/// Admission never blocks on the downstream consumer for in-flight traces —
/// only on a per-trace shard lock — but does await it when forwarding
/// late-arriving spans for a trace that was already decided `Sampled`.
#[derive(Clone)]
pub struct TailSamplingHandle {
    inner: Arc<Inner>,
}

#[async_trait]
impl Consumer<TracesData> for TailSamplingHandle {
    async fn consume(&self, data: TracesData) -> Result<(), ConsumeError> {
        self.inner.admit(data).await;
        Ok(())
    }
}

/// Stops the engine's decision-tick task, waiting for any in-flight tick to
/// finish first.
pub struct ShutdownHandle {
    tx: oneshot::Sender<oneshot::Sender<()>>,
}

impl ShutdownHandle {
    /// Signals the decision-tick task to stop and waits for it to do so.
    pub async fn shutdown(self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(ack_tx).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

/// Builds and spawns a tail-sampling engine, returning an admission handle
/// and a handle to stop its decision-tick task.
pub fn spawn(
    config: Config,
    policies: &[PolicySpec],
    downstream: Arc<dyn Consumer<TracesData>>,
    metrics: Arc<SamplingMetrics>,
    clock: Arc<dyn Clock>,
) -> Result<(TailSamplingHandle, ShutdownHandle), ConfigError> {
    config.validate()?;

    let built_policies: Vec<Arc<dyn Policy>> = policies.iter().map(|spec| spec.build(&clock)).collect();
    let batcher = DecisionBatcher::new(config.batcher_slots(), config.expected_new_traces_per_sec);
    let trace_map = TraceMap::new(config.max_traces);

    let inner = Arc::new(Inner {
        config,
        trace_map,
        batcher,
        policies: built_policies,
        recent_verdicts: Mutex::new(HashMap::new()),
        tick_counter: AtomicU64::new(0),
        downstream,
        metrics,
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let task = Task {
        inner: Arc::clone(&inner),
        shutdown_rx,
    };
    tokio::spawn(task.run());

    Ok((TailSamplingHandle { inner }, ShutdownHandle { tx: shutdown_tx }))
}

struct Task {
    inner: Arc<Inner>,
    shutdown_rx: oneshot::Receiver<oneshot::Sender<()>>,
}

impl Task {
    async fn run(mut self) {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                biased;

                ack_tx = &mut self.shutdown_rx => {
                    if let Ok(ack_tx) = ack_tx {
                        let _ = ack_tx.send(());
                    }
                    return;
                }

                _ = interval.tick() => {
                    self.inner.run_decision_tick().await;
                }
            }
        }
    }
}

/// Resource attribute key carrying the deciding policy's name, so downstream
/// middleware can attribute a dispatched trace to the policy that sampled it
/// without a side-channel.
const POLICY_CTX_RESOURCE_KEY: &str = "sampling.policy";

fn one_trace_container(spans: Vec<Span>, ctx: Option<&PolicyContext>) -> TracesData {
    let mut resource = ResourceAttrs::new();
    if let Some(ctx) = ctx {
        let _ = resource.insert(POLICY_CTX_RESOURCE_KEY.to_string(), ctx.policy_name.to_string().into());
    }
    let mut group = ResourceGroup::new(resource);
    group.items = spans;
    TracesData { groups: vec![group] }
}

impl Inner {
    async fn admit(&self, data: TracesData) {
        let mut by_trace: HashMap<TraceId, Vec<Span>> = HashMap::new();
        for group in data.groups {
            for span in group.items {
                by_trace.entry(span.trace_id).or_default().push(span);
            }
        }
        for (id, spans) in by_trace {
            self.admit_one(id, spans).await;
        }
    }

    async fn admit_one(&self, id: TraceId, spans: Vec<Span>) {
        let late_verdict = self.recent_verdicts.lock().get(&id).map(|(v, _)| *v);
        if let Some(verdict) = late_verdict {
            for policy in &self.policies {
                policy.on_late_arriving_spans(verdict, &spans);
            }
            match verdict {
                Verdict::Sampled => {
                    self.metrics.late_spans_forwarded.add(spans.len() as u64);
                    let container = one_trace_container(spans, None);
                    if let Err(err) = self.downstream.consume(container).await {
                        tracing::warn!(%err, "tail-sampling: downstream rejected late-arriving spans");
                        self.metrics.downstream_errors.inc();
                    }
                }
                Verdict::NotSampled => {
                    self.metrics.late_spans_dropped.add(spans.len() as u64);
                }
            }
            return;
        }

        let tick = self.tick_counter.load(Ordering::Acquire);
        let admission = self.trace_map.admit_and_append(id, tick, |data| data.append(spans));
        if let Admission::New { evicted } = admission {
            self.metrics.traces_admitted.inc();
            self.batcher.add(id);
            if let Some(evicted_id) = evicted {
                self.metrics.traces_evicted.inc();
                self.recent_verdicts.lock().remove(&evicted_id);
            }
        }
    }

    async fn run_decision_tick(&self) {
        let now_tick = self.tick_counter.fetch_add(1, Ordering::AcqRel) + 1;
        self.sweep_recent_verdicts(now_tick);

        let batch = self.batcher.close_current_and_take_first_batch();
        for id in batch {
            self.decide_trace(id, now_tick).await;
        }
    }

    async fn decide_trace(&self, id: TraceId, now_tick: u64) {
        let Some((verdict, spans, ctx)) = self.trace_map.with_trace(&id, |data| self.evaluate_trace(data)) else {
            // Already gone: decided by a concurrent tick, or evicted for
            // capacity between batching and this tick.
            return;
        };

        match verdict {
            Verdict::Sampled => {
                self.metrics.decisions_sampled.inc();
                let container = one_trace_container(spans, ctx.as_ref());
                if let Err(err) = self.downstream.consume(container).await {
                    tracing::warn!(%err, trace_ctx = ?ctx, "tail-sampling: downstream rejected sampled trace");
                    self.metrics.downstream_errors.inc();
                }
                for policy in &self.policies {
                    policy.on_late_arriving_spans(Verdict::Sampled, &[]);
                }
            }
            Verdict::NotSampled => {
                self.metrics.decisions_not_sampled.inc();
                for policy in &self.policies {
                    policy.on_late_arriving_spans(Verdict::NotSampled, &[]);
                }
            }
        }

        self.trace_map.remove(&id);
        self.recent_verdicts.lock().insert(id, (verdict, now_tick));
    }

    /// Evaluates every configured policy against `data` per the configured
    /// decision mode, recording each policy's vote and returning the final
    /// verdict, a copy of the spans to dispatch, and the winning policy's
    /// context (if any).
    fn evaluate_trace(&self, data: &mut TraceData) -> (Verdict, Vec<Span>, Option<PolicyContext>) {
        if data.decisions.len() != self.policies.len() {
            data.decisions = vec![None; self.policies.len()];
        }

        let mut policy_ctx: Option<PolicyContext> = None;
        let mut any_sampled = false;

        for (i, policy) in self.policies.iter().enumerate() {
            let view = PolicyView {
                spans: &data.received_spans,
                span_count: data.span_count,
            };
            let decision = match policy.evaluate(view) {
                Ok(decision) => decision,
                Err(err) => {
                    tracing::error!(policy = policy.name(), %err, "tail-sampling policy failed; treating as NotSampled");
                    self.metrics.policy_errors.inc();
                    PolicyDecision::NotSampled
                }
            };
            data.decisions[i] = Some(decision);

            match self.config.decision_mode {
                DecisionMode::AllPoliciesOr => {
                    if matches!(decision, PolicyDecision::Sampled) {
                        any_sampled = true;
                        if policy_ctx.is_none() {
                            policy_ctx = Some(PolicyContext {
                                policy_index: i,
                                policy_name: Arc::from(policy.name()),
                            });
                        }
                    }
                }
                DecisionMode::FirstMatchWins => match decision {
                    PolicyDecision::Sampled => {
                        any_sampled = true;
                        policy_ctx = Some(PolicyContext {
                            policy_index: i,
                            policy_name: Arc::from(policy.name()),
                        });
                        break;
                    }
                    PolicyDecision::NotSampled => break,
                    PolicyDecision::Unspecified => {}
                },
            }
        }

        data.policy_ctx = policy_ctx.clone();
        let verdict = if any_sampled { Verdict::Sampled } else { Verdict::NotSampled };
        (verdict, data.received_spans.clone(), policy_ctx)
    }

    fn sweep_recent_verdicts(&self, now_tick: u64) {
        let grace = u64::from(self.config.late_arrival_grace_ticks);
        self.recent_verdicts
            .lock()
            .retain(|_, (_, recorded_tick)| now_tick.saturating_sub(*recorded_tick) <= grace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use otelcol_core_telemetry::clock::FakeClock;
    use std::num::NonZeroUsize;
    use std::sync::Mutex as StdMutex;

    struct RecordingConsumer {
        exports: StdMutex<Vec<TracesData>>,
    }

    impl RecordingConsumer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                exports: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Consumer<TracesData> for RecordingConsumer {
        async fn consume(&self, data: TracesData) -> Result<(), ConsumeError> {
            self.exports.lock().unwrap().push(data);
            Ok(())
        }
    }

    fn trace(id: u8) -> TracesData {
        one_trace_container(vec![Span::new([id; 16], [1; 8], "s")], None)
    }

    // Mirrors an always_sample configuration: every admitted trace is
    // dispatched downstream once a decision tick fires for its batch slot.
    #[tokio::test]
    async fn always_sample_dispatches_after_one_tick() {
        let downstream = RecordingConsumer::new();
        let config = Config {
            decision_wait: Duration::from_secs(1),
            max_traces: NonZeroUsize::new(10).unwrap(),
            ..Config::default()
        };
        let policies = vec![PolicySpec::AlwaysSample { name: "always".into() }];
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
        let (handle, shutdown) =
            spawn(config, &policies, downstream.clone(), Arc::new(SamplingMetrics::default()), clock).unwrap();

        handle.consume(trace(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(downstream.exports.lock().unwrap().len(), 1);
        shutdown.shutdown().await;
    }

    // A trace that never matches any policy is dropped rather than forwarded.
    #[tokio::test]
    async fn not_sampled_trace_is_dropped() {
        let downstream = RecordingConsumer::new();
        let config = Config {
            decision_wait: Duration::from_secs(1),
            max_traces: NonZeroUsize::new(10).unwrap(),
            ..Config::default()
        };
        let policies = vec![PolicySpec::NumericAttribute {
            name: "num".into(),
            key: "x".into(),
            min: 0,
            max: 0,
        }];
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
        let (handle, shutdown) =
            spawn(config, &policies, downstream.clone(), Arc::new(SamplingMetrics::default()), clock).unwrap();

        handle.consume(trace(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(downstream.exports.lock().unwrap().is_empty());
        shutdown.shutdown().await;
    }

    // S5: under AllPoliciesOr, every policy is evaluated regardless of an
    // earlier Sampled vote, and policy_ctx resolves to the first policy (in
    // declaration order) that returned Sampled, even if a later one also did.
    #[tokio::test]
    async fn policy_ctx_resolves_to_first_sampled_policy_in_declaration_order() {
        let downstream = RecordingConsumer::new();
        let config = Config {
            decision_wait: Duration::from_secs(1),
            max_traces: NonZeroUsize::new(10).unwrap(),
            decision_mode: DecisionMode::AllPoliciesOr,
            ..Config::default()
        };
        let policies = vec![
            PolicySpec::NumericAttribute {
                name: "err".into(),
                key: "http.status_code".into(),
                min: 500,
                max: 599,
            },
            PolicySpec::Probabilistic {
                name: "prob".into(),
                rate: 1.0,
                seed: 0,
            },
            PolicySpec::RateLimiting {
                name: "rl".into(),
                spans_per_second: 100,
            },
        ];
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
        let (handle, shutdown) =
            spawn(config, &policies, downstream.clone(), Arc::new(SamplingMetrics::default()), clock).unwrap();

        let span = Span::new([9; 16], [1; 8], "s").with_attribute("http.status_code", 503i64);
        let mut data = trace(9);
        data.groups[0].items = vec![span];
        handle.consume(data).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        let exports = downstream.exports.lock().unwrap();
        assert_eq!(exports.len(), 1);
        let policy_name = exports[0].groups[0].resource.get(POLICY_CTX_RESOURCE_KEY).and_then(|v| v.as_str());
        assert_eq!(policy_name, Some("err"));
        shutdown.shutdown().await;
    }

    // decision_wait = 0 still validates and still waits for a decision tick;
    // it just collapses the ring batcher to one slot, so the trace's verdict
    // lands on the very next tick rather than being held over several.
    #[tokio::test]
    async fn zero_decision_wait_dispatches_on_the_next_tick() {
        let downstream = RecordingConsumer::new();
        let config = Config {
            decision_wait: Duration::ZERO,
            max_traces: NonZeroUsize::new(10).unwrap(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
        let policies = vec![PolicySpec::AlwaysSample { name: "always".into() }];
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
        let (handle, shutdown) =
            spawn(config, &policies, downstream.clone(), Arc::new(SamplingMetrics::default()), clock).unwrap();

        handle.consume(trace(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert_eq!(downstream.exports.lock().unwrap().len(), 1);
        shutdown.shutdown().await;
    }
}
