// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Spawns and wires together one instance of each data-plane subsystem.

use async_trait::async_trait;
use otelcol_core_batch::{BatchMetrics, BatchProcessorHandle, SignalData};
use otelcol_core_batch::ShutdownHandle as BatchShutdownHandle;
use otelcol_core_limiter::{ExtensionRegistry, PerSignalLimiters, WiredConsumer};
use otelcol_core_pdata::{ConsumeError, Consumer, LogsData, MetricsData, ProfilesData, TracesData};
use otelcol_core_sampling::{PolicySpec, SamplingMetrics};
use otelcol_core_sampling::ShutdownHandle as SamplingShutdownHandle;
use otelcol_core_telemetry::clock::Clock;
use std::sync::Arc;

/// Errors raised wiring a [`Pipeline`] together. Each variant converts the
/// corresponding sub-crate's own configuration error, so a caller only has
/// to handle one error type at the wiring boundary.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The batching processor's configuration was invalid.
    #[error("batching processor: {0}")]
    Batch(#[from] otelcol_core_batch::ConfigError),
    /// The tail-sampling engine's configuration was invalid.
    #[error("tail-sampling engine: {0}")]
    Sampling(#[from] otelcol_core_sampling::ConfigError),
}

/// Per-signal limiter wiring: the `request_count` / `request_items` /
/// `memory_size` chain resolved for each of the four signals. A signal with
/// no configured limiters passes straight through.
#[derive(Clone, Default)]
pub struct LimiterConfig {
    /// Limiters gating trace ingress.
    pub traces: PerSignalLimiters,
    /// Limiters gating metric ingress.
    pub metrics: PerSignalLimiters,
    /// Limiters gating log ingress.
    pub logs: PerSignalLimiters,
    /// Limiters gating profile ingress.
    pub profiles: PerSignalLimiters,
}

/// Everything needed to spawn one [`Pipeline`] instance.
pub struct PipelineConfig {
    /// Per-signal limiter wiring.
    pub limiters: LimiterConfig,
    /// Batching processor configuration, shared by all four signals.
    pub batch: otelcol_core_batch::Config,
    /// Tail-sampling engine configuration (traces only).
    pub sampling: otelcol_core_sampling::Config,
    /// Tail-sampling policy set, evaluated in declaration order.
    pub sampling_policies: Vec<PolicySpec>,
}

/// The terminal consumer each signal reaches once it has cleared every
/// stage of the pipeline (an exporter, in the usual case).
pub struct Downstream {
    /// Terminal consumer for traces, reached only after tail-sampling.
    pub traces: Arc<dyn Consumer<TracesData>>,
    /// Terminal consumer for metrics.
    pub metrics: Arc<dyn Consumer<MetricsData>>,
    /// Terminal consumer for logs.
    pub logs: Arc<dyn Consumer<LogsData>>,
    /// Terminal consumer for profiles.
    pub profiles: Arc<dyn Consumer<ProfilesData>>,
}

/// The embedding binary's interface back into the pipeline: resolving named
/// middleware extensions into limiters, and being told about errors severe
/// enough that the pipeline should not continue.
pub trait Host: Send + Sync {
    /// The registry limiters are resolved from when building
    /// [`LimiterConfig`].
    fn extensions(&self) -> &ExtensionRegistry;

    /// Reports an error severe enough that the host should consider halting
    /// the pipeline. The default implementation only logs it.
    fn report_fatal_error(&self, err: &(dyn std::error::Error + Send + Sync)) {
        tracing::error!(error = %err, "fatal pipeline error reported by host");
    }
}

/// Dispatches a flushed [`SignalData`] export to the per-signal terminal
/// consumer, so the signal-agnostic batching processor can sit in front of
/// four differently-typed downstreams.
struct PerSignalDownstream {
    traces: Arc<dyn Consumer<TracesData>>,
    metrics: Arc<dyn Consumer<MetricsData>>,
    logs: Arc<dyn Consumer<LogsData>>,
    profiles: Arc<dyn Consumer<ProfilesData>>,
}

#[async_trait]
impl Consumer<SignalData> for PerSignalDownstream {
    async fn consume(&self, data: SignalData) -> Result<(), ConsumeError> {
        match data {
            SignalData::Traces(d) => self.traces.consume(d).await,
            SignalData::Metrics(d) => self.metrics.consume(d).await,
            SignalData::Logs(d) => self.logs.consume(d).await,
            SignalData::Profiles(d) => self.profiles.consume(d).await,
        }
    }
}

/// A running pipeline: one limiter-gated ingress point per signal, backed by
/// a shared batching processor task and, for traces, a tail-sampling engine
/// task sitting between the batching processor and the terminal consumer.
pub struct Pipeline {
    traces: Arc<dyn Consumer<TracesData>>,
    metrics: Arc<dyn Consumer<MetricsData>>,
    logs: Arc<dyn Consumer<LogsData>>,
    profiles: Arc<dyn Consumer<ProfilesData>>,
    batch_shutdown: BatchShutdownHandle,
    sampling_shutdown: SamplingShutdownHandle,
}

impl Pipeline {
    /// Builds and spawns one pipeline instance: the tail-sampling engine
    /// first (so the batching processor has somewhere to flush trace
    /// exports), then the batching processor wrapping it, then the
    /// per-signal limiter wiring in front of the batching processor.
    pub fn spawn(config: PipelineConfig, downstream: Downstream, clock: Arc<dyn Clock>) -> Result<Self, CoreError> {
        let (sampling_handle, sampling_shutdown) = otelcol_core_sampling::spawn(
            config.sampling,
            &config.sampling_policies,
            downstream.traces,
            Arc::new(SamplingMetrics::default()),
            clock,
        )?;

        let batch_downstream: Arc<dyn Consumer<SignalData>> = Arc::new(PerSignalDownstream {
            traces: Arc::new(sampling_handle),
            metrics: downstream.metrics,
            logs: downstream.logs,
            profiles: downstream.profiles,
        });

        let (batch_handle, batch_shutdown) =
            otelcol_core_batch::spawn(config.batch, batch_downstream, Arc::new(BatchMetrics::default()))?;

        let traces = wire::<TracesData>(&batch_handle, config.limiters.traces);
        let metrics = wire::<MetricsData>(&batch_handle, config.limiters.metrics);
        let logs = wire::<LogsData>(&batch_handle, config.limiters.logs);
        let profiles = wire::<ProfilesData>(&batch_handle, config.limiters.profiles);

        Ok(Self {
            traces,
            metrics,
            logs,
            profiles,
            batch_shutdown,
            sampling_shutdown,
        })
    }

    /// Submits trace data to the pipeline's ingress for this signal.
    pub async fn consume_traces(&self, data: TracesData) -> Result<(), ConsumeError> {
        self.traces.consume(data).await
    }

    /// Submits metric data to the pipeline's ingress for this signal.
    pub async fn consume_metrics(&self, data: MetricsData) -> Result<(), ConsumeError> {
        self.metrics.consume(data).await
    }

    /// Submits log data to the pipeline's ingress for this signal.
    pub async fn consume_logs(&self, data: LogsData) -> Result<(), ConsumeError> {
        self.logs.consume(data).await
    }

    /// Submits profile data to the pipeline's ingress for this signal.
    pub async fn consume_profiles(&self, data: ProfilesData) -> Result<(), ConsumeError> {
        self.profiles.consume(data).await
    }

    /// Stops both background tasks in drain order: the batching processor
    /// first, so its shutdown-triggered flush still has a live tail-sampling
    /// engine to hand trace exports to, then the tail-sampling engine's
    /// decision-tick task. Any trace still awaiting its `decision_wait`
    /// window in the tail-sampling engine at this point is not flushed.
    /// Forcing an early verdict would violate every policy's view of how
    /// long it had to observe the trace.
    pub async fn shutdown(self) {
        self.batch_shutdown.shutdown().await;
        self.sampling_shutdown.shutdown().await;
    }
}

fn wire<D>(batch_handle: &BatchProcessorHandle, limiters: PerSignalLimiters) -> Arc<dyn Consumer<D>>
where
    D: otelcol_core_pdata::PipelineData + Send + 'static,
    BatchProcessorHandle: Consumer<D>,
{
    let inner: Arc<dyn Consumer<D>> = Arc::new(batch_handle.clone());
    Arc::new(WiredConsumer::new(inner, limiters))
}
