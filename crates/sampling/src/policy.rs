// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Policy evaluators and their declarative specifications.
//!
//! Evaluation is synchronous and CPU-bound (attribute scans, hashing, token
//! bookkeeping) — no policy needs to suspend, so `Policy` is a plain trait
//! rather than an `async_trait` one, unlike the `Consumer`/limiter traits
//! elsewhere in this core.

use crate::decision::{PolicyDecision, Verdict};
use crate::error::PolicyError;
use otelcol_core_pdata::Span;
use otelcol_core_telemetry::clock::Clock;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;

/// A trace, as seen by a policy: the spans received so far and their count.
pub struct PolicyView<'a> {
    /// Spans received for the trace so far.
    pub spans: &'a [Span],
    /// Total span count (== `spans.len()` at evaluation time).
    pub span_count: usize,
}

/// A sampling policy: votes on whether a trace should be kept.
pub trait Policy: Send + Sync {
    /// The policy's configured name, used in logs and `PolicyContext`.
    fn name(&self) -> &str;

    /// Votes on the trace's fate given the spans received so far.
    fn evaluate(&self, trace: PolicyView<'_>) -> Result<PolicyDecision, PolicyError>;

    /// Called once a verdict is reached (with an empty `spans` slice) and
    /// again for every batch of spans that arrive afterward, so stateful
    /// policies (`rate_limiting`, `composite`) can adjust their bookkeeping.
    /// A no-op default for stateless policies.
    fn on_late_arriving_spans(&self, _verdict: Verdict, _spans: &[Span]) {}
}

/// Always votes to keep the trace.
pub struct AlwaysSample {
    name: Arc<str>,
}

impl AlwaysSample {
    /// Builds an `always_sample` policy with the given name.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }
}

impl Policy for AlwaysSample {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, _trace: PolicyView<'_>) -> Result<PolicyDecision, PolicyError> {
        Ok(PolicyDecision::Sampled)
    }
}

/// Samples a trace if any span carries an integer attribute within
/// `[min, max]`.
pub struct NumericAttribute {
    name: Arc<str>,
    key: String,
    min: i64,
    max: i64,
}

impl NumericAttribute {
    /// Builds a `numeric_attribute` policy.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, key: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            min,
            max,
        }
    }
}

impl Policy for NumericAttribute {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, trace: PolicyView<'_>) -> Result<PolicyDecision, PolicyError> {
        let hit = trace.spans.iter().any(|s| {
            s.attributes
                .get(&self.key)
                .and_then(|v| v.as_int())
                .is_some_and(|v| v >= self.min && v <= self.max)
        });
        Ok(if hit { PolicyDecision::Sampled } else { PolicyDecision::NotSampled })
    }
}

/// Samples a trace if any span's string attribute is in (or, inverted, not
/// in) a configured value set.
pub struct StringAttribute {
    name: Arc<str>,
    key: String,
    values: HashSet<String>,
    invert: bool,
}

impl StringAttribute {
    /// Builds a `string_attribute` policy.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, key: impl Into<String>, values: HashSet<String>, invert: bool) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            values,
            invert,
        }
    }
}

impl Policy for StringAttribute {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, trace: PolicyView<'_>) -> Result<PolicyDecision, PolicyError> {
        let hit = trace.spans.iter().any(|s| {
            s.attributes
                .get(&self.key)
                .and_then(|v| v.as_str())
                .is_some_and(|v| self.values.contains(v) != self.invert)
        });
        Ok(if hit { PolicyDecision::Sampled } else { PolicyDecision::NotSampled })
    }
}

/// Deterministically samples a fixed share of traces by hashing the trace ID.
pub struct Probabilistic {
    name: Arc<str>,
    rate: f64,
    seed: u64,
}

impl Probabilistic {
    /// Builds a `probabilistic` policy. `rate` is clamped to `(0, 1]`.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, rate: f64, seed: u64) -> Self {
        Self {
            name: name.into(),
            rate: rate.clamp(f64::MIN_POSITIVE, 1.0),
            seed,
        }
    }
}

impl Policy for Probabilistic {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, trace: PolicyView<'_>) -> Result<PolicyDecision, PolicyError> {
        let Some(span) = trace.spans.first() else {
            return Ok(PolicyDecision::NotSampled);
        };
        if self.rate >= 1.0 {
            return Ok(PolicyDecision::Sampled);
        }
        let threshold = (self.rate * u64::MAX as f64) as u64;
        let sampled = trace_id_hash(&span.trace_id, self.seed) < threshold;
        Ok(if sampled { PolicyDecision::Sampled } else { PolicyDecision::NotSampled })
    }
}

/// Hashes a trace ID XOR'd with `seed` into a stable `u64`, used by
/// `probabilistic` so the same trace ID and seed always produce the same
/// decision across restarts.
fn trace_id_hash(trace_id: &[u8; 16], seed: u64) -> u64 {
    let mut bytes = *trace_id;
    for (b, s) in bytes.iter_mut().zip(seed.to_le_bytes().iter().cycle()) {
        *b ^= s;
    }
    xxhash_rust::xxh3::xxh3_64(&bytes)
}

/// Span-proportional rate limiting: admits traces whose span count fits
/// within the remaining per-second budget.
pub struct RateLimiting {
    name: Arc<str>,
    spans_per_second: u64,
    clock: Arc<dyn Clock>,
    window: Mutex<(u64, u64)>,
}

impl RateLimiting {
    /// Builds a `rate_limiting` policy admitting up to `spans_per_second`
    /// spans (summed across admitted traces) each second.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, spans_per_second: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            spans_per_second,
            clock,
            window: Mutex::new((0, 0)),
        }
    }

    fn try_admit(&self, spans: u64) -> bool {
        let now = self.clock.now_secs();
        let mut window = self.window.lock();
        if window.0 != now {
            *window = (now, 0);
        }
        if window.1 + spans <= self.spans_per_second {
            window.1 += spans;
            true
        } else {
            false
        }
    }
}

impl Policy for RateLimiting {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, trace: PolicyView<'_>) -> Result<PolicyDecision, PolicyError> {
        let admitted = self.try_admit(trace.span_count as u64);
        Ok(if admitted { PolicyDecision::Sampled } else { PolicyDecision::NotSampled })
    }
}

/// Samples a trace iff every child policy does.
pub struct And {
    name: Arc<str>,
    children: Vec<Arc<dyn Policy>>,
}

impl And {
    /// Builds an `and` policy over the given children, evaluated in order.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, children: Vec<Arc<dyn Policy>>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }
}

impl Policy for And {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, trace: PolicyView<'_>) -> Result<PolicyDecision, PolicyError> {
        for child in &self.children {
            let view = PolicyView {
                spans: trace.spans,
                span_count: trace.span_count,
            };
            if !matches!(child.evaluate(view)?, PolicyDecision::Sampled) {
                return Ok(PolicyDecision::NotSampled);
            }
        }
        Ok(PolicyDecision::Sampled)
    }

    fn on_late_arriving_spans(&self, verdict: Verdict, spans: &[Span]) {
        for child in &self.children {
            child.on_late_arriving_spans(verdict, spans);
        }
    }
}

/// One weighted child of a `composite` policy.
pub struct CompositeChild {
    /// Share of `max_total_spans_per_second` allotted to this child, in
    /// `(0, 1]`.
    pub share: f64,
    /// The child's own admission rule.
    pub policy: Arc<dyn Policy>,
}

/// Evaluates weighted children in order, each throttled to its own share of
/// a total span budget; the trace is Sampled by the first child that both
/// admits the trace and has remaining budget.
pub struct Composite {
    name: Arc<str>,
    children: Vec<CompositeChild>,
    budgets: Vec<Mutex<(u64, u64)>>,
    max_total_spans_per_second: u64,
    clock: Arc<dyn Clock>,
}

impl Composite {
    /// Builds a `composite` policy.
    #[must_use]
    pub fn new(
        name: impl Into<Arc<str>>,
        children: Vec<CompositeChild>,
        max_total_spans_per_second: u64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let budgets = children.iter().map(|_| Mutex::new((0, 0))).collect();
        Self {
            name: name.into(),
            children,
            budgets,
            max_total_spans_per_second,
            clock,
        }
    }
}

impl Policy for Composite {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, trace: PolicyView<'_>) -> Result<PolicyDecision, PolicyError> {
        let now = self.clock.now_secs();
        for (child, budget) in self.children.iter().zip(self.budgets.iter()) {
            let view = PolicyView {
                spans: trace.spans,
                span_count: trace.span_count,
            };
            if !matches!(child.policy.evaluate(view)?, PolicyDecision::Sampled) {
                continue;
            }
            let quota = (child.share * self.max_total_spans_per_second as f64) as u64;
            let mut window = budget.lock();
            if window.0 != now {
                *window = (now, 0);
            }
            let spans = trace.span_count as u64;
            if window.1 + spans <= quota {
                window.1 += spans;
                return Ok(PolicyDecision::Sampled);
            }
        }
        Ok(PolicyDecision::NotSampled)
    }

    fn on_late_arriving_spans(&self, verdict: Verdict, spans: &[Span]) {
        for child in &self.children {
            child.policy.on_late_arriving_spans(verdict, spans);
        }
    }
}

/// Declarative specification for one of the seven policy kinds, the
/// serde-deserializable form embedders assemble into `Arc<dyn Policy>` trees
/// via [`PolicySpec::build`].
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicySpec {
    /// See [`AlwaysSample`].
    AlwaysSample {
        /// Policy name.
        name: String,
    },
    /// See [`NumericAttribute`].
    NumericAttribute {
        /// Policy name.
        name: String,
        /// Attribute key to inspect.
        key: String,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },
    /// See [`StringAttribute`].
    StringAttribute {
        /// Policy name.
        name: String,
        /// Attribute key to inspect.
        key: String,
        /// Candidate values.
        values: Vec<String>,
        /// Invert set membership.
        #[serde(default)]
        invert: bool,
    },
    /// See [`Probabilistic`].
    Probabilistic {
        /// Policy name.
        name: String,
        /// Sampling rate in `(0, 1]`.
        rate: f64,
        /// Hash seed, for deterministic rollout changes.
        #[serde(default)]
        seed: u64,
    },
    /// See [`RateLimiting`].
    RateLimiting {
        /// Policy name.
        name: String,
        /// Span budget per second.
        spans_per_second: u64,
    },
    /// See [`And`].
    And {
        /// Policy name.
        name: String,
        /// Child policy specifications, all of which must admit.
        children: Vec<PolicySpec>,
    },
    /// See [`Composite`].
    Composite {
        /// Policy name.
        name: String,
        /// Weighted child policy specifications.
        children: Vec<CompositeChildSpec>,
        /// Total span budget per second, split across children by share.
        max_total_spans_per_second: u64,
    },
}

/// Declarative form of [`CompositeChild`].
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeChildSpec {
    /// Share of the parent's total budget, in `(0, 1]`.
    pub share: f64,
    /// The child's own specification.
    pub policy: PolicySpec,
}

impl PolicySpec {
    /// Builds the live policy tree this specification describes.
    #[must_use]
    pub fn build(&self, clock: &Arc<dyn Clock>) -> Arc<dyn Policy> {
        match self {
            PolicySpec::AlwaysSample { name } => Arc::new(AlwaysSample::new(name.clone())),
            PolicySpec::NumericAttribute { name, key, min, max } => {
                Arc::new(NumericAttribute::new(name.clone(), key.clone(), *min, *max))
            }
            PolicySpec::StringAttribute {
                name,
                key,
                values,
                invert,
            } => Arc::new(StringAttribute::new(
                name.clone(),
                key.clone(),
                values.iter().cloned().collect(),
                *invert,
            )),
            PolicySpec::Probabilistic { name, rate, seed } => {
                Arc::new(Probabilistic::new(name.clone(), *rate, *seed))
            }
            PolicySpec::RateLimiting { name, spans_per_second } => {
                Arc::new(RateLimiting::new(name.clone(), *spans_per_second, Arc::clone(clock)))
            }
            PolicySpec::And { name, children } => {
                let children = children.iter().map(|c| c.build(clock)).collect();
                Arc::new(And::new(name.clone(), children))
            }
            PolicySpec::Composite {
                name,
                children,
                max_total_spans_per_second,
            } => {
                let children = children
                    .iter()
                    .map(|c| CompositeChild {
                        share: c.share,
                        policy: c.policy.build(clock),
                    })
                    .collect();
                Arc::new(Composite::new(
                    name.clone(),
                    children,
                    *max_total_spans_per_second,
                    Arc::clone(clock),
                ))
            }
        }
    }

    /// The configured name, without building the policy.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            PolicySpec::AlwaysSample { name }
            | PolicySpec::NumericAttribute { name, .. }
            | PolicySpec::StringAttribute { name, .. }
            | PolicySpec::Probabilistic { name, .. }
            | PolicySpec::RateLimiting { name, .. }
            | PolicySpec::And { name, .. }
            | PolicySpec::Composite { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otelcol_core_telemetry::clock::FakeClock;

    fn view<'a>(spans: &'a [Span]) -> PolicyView<'a> {
        PolicyView {
            spans,
            span_count: spans.len(),
        }
    }

    #[test]
    fn always_sample_always_samples() {
        let p = AlwaysSample::new("always");
        assert_eq!(p.evaluate(view(&[])).unwrap(), PolicyDecision::Sampled);
    }

    #[test]
    fn numeric_attribute_matches_inclusive_range() {
        let p = NumericAttribute::new("num", "http.status_code", 500, 599);
        let hit = Span::new([1; 16], [1; 8], "s").with_attribute("http.status_code", 503i64);
        let miss = Span::new([1; 16], [1; 8], "s").with_attribute("http.status_code", 200i64);
        assert_eq!(p.evaluate(view(&[hit])).unwrap(), PolicyDecision::Sampled);
        assert_eq!(p.evaluate(view(&[miss])).unwrap(), PolicyDecision::NotSampled);
    }

    #[test]
    fn string_attribute_respects_invert() {
        let values: HashSet<String> = ["prod"].into_iter().map(String::from).collect();
        let p = StringAttribute::new("env", "env", values, true);
        let prod = Span::new([1; 16], [1; 8], "s").with_attribute("env", "prod");
        let dev = Span::new([1; 16], [1; 8], "s").with_attribute("env", "dev");
        assert_eq!(p.evaluate(view(&[prod])).unwrap(), PolicyDecision::NotSampled);
        assert_eq!(p.evaluate(view(&[dev])).unwrap(), PolicyDecision::Sampled);
    }

    #[test]
    fn probabilistic_is_stable_across_calls() {
        let p = Probabilistic::new("prob", 0.5, 42);
        let span = Span::new([7; 16], [1; 8], "s");
        let first = p.evaluate(view(&[span.clone()])).unwrap();
        let second = p.evaluate(view(&[span])).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn probabilistic_rate_one_always_samples() {
        let p = Probabilistic::new("prob", 1.0, 0);
        for id in 0u8..10 {
            let span = Span::new([id; 16], [1; 8], "s");
            assert_eq!(p.evaluate(view(&[span])).unwrap(), PolicyDecision::Sampled);
        }
    }

    // rate = 1.0 must sample unconditionally. A threshold comparison alone
    // (`hash < rate * u64::MAX`) can never be satisfied by a trace ID whose
    // hash happens to equal u64::MAX, so rate = 1.0 has to bypass the hash
    // comparison entirely rather than just push the threshold up to the max.
    #[test]
    fn probabilistic_rate_one_does_not_depend_on_the_hash_threshold() {
        for seed in 0u64..20 {
            let p = Probabilistic::new("prob", 1.0, seed);
            let span = Span::new([0xff; 16], [1; 8], "s");
            assert_eq!(p.evaluate(view(&[span])).unwrap(), PolicyDecision::Sampled);
        }
    }

    #[test]
    fn rate_limiting_admits_up_to_budget_then_denies() {
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
        let p = RateLimiting::new("rl", 10, Arc::clone(&clock));
        let view6 = PolicyView { spans: &[], span_count: 6 };
        let view5 = PolicyView { spans: &[], span_count: 5 };
        assert_eq!(p.evaluate(view6).unwrap(), PolicyDecision::Sampled);
        assert_eq!(p.evaluate(view5).unwrap(), PolicyDecision::NotSampled);
    }

    #[test]
    fn rate_limiting_resets_on_second_rollover() {
        let clock = Arc::new(FakeClock::new());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let p = RateLimiting::new("rl", 10, dyn_clock);
        let full = PolicyView { spans: &[], span_count: 10 };
        assert_eq!(p.evaluate(full).unwrap(), PolicyDecision::Sampled);
        clock.advance(std::time::Duration::from_secs(1));
        let again = PolicyView { spans: &[], span_count: 10 };
        assert_eq!(p.evaluate(again).unwrap(), PolicyDecision::Sampled);
    }

    #[test]
    fn and_requires_every_child() {
        let always = Arc::new(AlwaysSample::new("a")) as Arc<dyn Policy>;
        let never = Arc::new(NumericAttribute::new("b", "x", 0, 0)) as Arc<dyn Policy>;
        let p = And::new("and", vec![always, never]);
        assert_eq!(p.evaluate(view(&[])).unwrap(), PolicyDecision::NotSampled);
    }

    #[test]
    fn spec_builds_nested_and_policy() {
        let spec = PolicySpec::And {
            name: "and".into(),
            children: vec![
                PolicySpec::AlwaysSample { name: "a".into() },
                PolicySpec::Probabilistic {
                    name: "p".into(),
                    rate: 1.0,
                    seed: 0,
                },
            ],
        };
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
        let policy = spec.build(&clock);
        let span = Span::new([3; 16], [1; 8], "s");
        assert_eq!(policy.evaluate(view(&[span])).unwrap(), PolicyDecision::Sampled);
    }
}
