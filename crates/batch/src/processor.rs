// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The single-task batching processor.
//!
//! One Tokio task owns the accumulator and the idle timer for the lifetime
//! of the processor; the ingress `mpsc` channel is the only synchronization
//! point with callers, so no lock guards batch state (mirrors the teacher's
//! `local::Processor` single-task-per-instance model — see DESIGN.md for why
//! this core uses an ordinary `tokio::spawn`ed task rather than the
//! teacher's `!Send` + `LocalSet` executor).

use crate::config::Config;
use crate::metrics::BatchMetrics;
use crate::signal_data::SignalData;
use async_trait::async_trait;
use otelcol_core_pdata::{ConsumeError, Consumer, LogsData, MetricsData, ProfilesData, SignalType, TracesData};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

struct IngressItem {
    data: SignalData,
    waiter: Option<oneshot::Sender<Result<(), ConsumeError>>>,
}

/// A cloneable front end to a running batching processor: enqueues signal
/// data onto the processor's single task.
#[derive(Clone)]
pub struct BatchProcessorHandle {
    tx: mpsc::Sender<IngressItem>,
    back_pressure: bool,
    metrics: Arc<BatchMetrics>,
}

impl BatchProcessorHandle {
    /// Enqueues trace data for batching.
    pub async fn consume_traces(&self, data: TracesData) -> Result<(), ConsumeError> {
        self.consume(SignalData::Traces(data)).await
    }

    /// Enqueues metric data for batching.
    pub async fn consume_metrics(&self, data: MetricsData) -> Result<(), ConsumeError> {
        self.consume(SignalData::Metrics(data)).await
    }

    /// Enqueues log data for batching.
    pub async fn consume_logs(&self, data: LogsData) -> Result<(), ConsumeError> {
        self.consume(SignalData::Logs(data)).await
    }

    /// Enqueues profile data for batching.
    pub async fn consume_profiles(&self, data: ProfilesData) -> Result<(), ConsumeError> {
        self.consume(SignalData::Profiles(data)).await
    }

    async fn consume(&self, data: SignalData) -> Result<(), ConsumeError> {
        if data.item_count() == 0 {
            self.metrics.dropped_empty.inc();
            return Ok(());
        }

        let (waiter_tx, waiter_rx) = if self.back_pressure {
            let (tx, rx) = oneshot::channel();
            (Some(tx), Some(rx))
        } else {
            (None, None)
        };

        self.tx
            .send(IngressItem {
                data,
                waiter: waiter_tx,
            })
            .await
            .map_err(|_| ConsumeError::new("batching processor task has shut down"))?;

        if let Some(rx) = waiter_rx {
            rx.await
                .map_err(|_| ConsumeError::new("batching processor task dropped the waiter"))?
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Consumer<TracesData> for BatchProcessorHandle {
    async fn consume(&self, data: TracesData) -> Result<(), ConsumeError> {
        self.consume_traces(data).await
    }
}

#[async_trait]
impl Consumer<MetricsData> for BatchProcessorHandle {
    async fn consume(&self, data: MetricsData) -> Result<(), ConsumeError> {
        self.consume_metrics(data).await
    }
}

#[async_trait]
impl Consumer<LogsData> for BatchProcessorHandle {
    async fn consume(&self, data: LogsData) -> Result<(), ConsumeError> {
        self.consume_logs(data).await
    }
}

#[async_trait]
impl Consumer<ProfilesData> for BatchProcessorHandle {
    async fn consume(&self, data: ProfilesData) -> Result<(), ConsumeError> {
        self.consume_profiles(data).await
    }
}

/// Handle used to request an orderly shutdown of a running processor task.
pub struct ShutdownHandle {
    tx: oneshot::Sender<oneshot::Sender<()>>,
}

impl ShutdownHandle {
    /// Requests shutdown and waits for the task to drain and exit. All
    /// waiters attached to in-flight data are settled before this returns.
    pub async fn shutdown(self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(ack_tx).is_ok() {
            let _ = ack_rx.await;
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FlushReason {
    Size,
    Timer,
    Shutdown,
}

struct Accumulator {
    data: SignalData,
    /// Waiters for every ingress item merged into `data` that hasn't yet
    /// been settled. Only cleared once a flush empties `data` completely —
    /// if a split leaves a remainder, these stay pending rather than being
    /// settled against data that hasn't actually been exported yet.
    waiters: Vec<oneshot::Sender<Result<(), ConsumeError>>>,
}

impl Accumulator {
    fn empty(kind: SignalType) -> Self {
        Self {
            data: SignalData::empty(kind),
            waiters: Vec::new(),
        }
    }
}

struct Task {
    config: Config,
    lower_limit: NonZeroUsize,
    downstream: Arc<dyn Consumer<SignalData>>,
    metrics: Arc<BatchMetrics>,
    traces: Accumulator,
    metrics_buf: Accumulator,
    logs: Accumulator,
    profiles: Accumulator,
    rx: mpsc::Receiver<IngressItem>,
    shutdown_rx: oneshot::Receiver<oneshot::Sender<()>>,
}

/// Spawns the batching processor's task, returning a cloneable handle for
/// callers and a one-shot shutdown handle.
#[must_use]
pub fn spawn(
    config: Config,
    downstream: Arc<dyn Consumer<SignalData>>,
    metrics: Arc<BatchMetrics>,
) -> Result<(BatchProcessorHandle, ShutdownHandle), crate::error::ConfigError> {
    let lower_limit = config.validate()?;
    let (tx, rx) = mpsc::channel(1024);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let task = Task {
        traces: Accumulator::empty(SignalType::Traces),
        metrics_buf: Accumulator::empty(SignalType::Metrics),
        logs: Accumulator::empty(SignalType::Logs),
        profiles: Accumulator::empty(SignalType::Profiles),
        config,
        lower_limit,
        downstream,
        metrics: metrics.clone(),
        rx,
        shutdown_rx,
    };

    let back_pressure = task.config.back_pressure;
    let _ = tokio::spawn(task.run());

    Ok((
        BatchProcessorHandle { tx, back_pressure, metrics },
        ShutdownHandle { tx: shutdown_tx },
    ))
}

impl Task {
    async fn run(mut self) {
        let timeout = self.config.timeout;
        let mut deadline = timeout.map(|d| Instant::now() + d);

        loop {
            let sleep = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                biased;

                ack_tx = &mut self.shutdown_rx => {
                    self.drain_and_shutdown(ack_tx.ok()).await;
                    return;
                }

                item = self.rx.recv() => {
                    match item {
                        Some(item) => {
                            self.accept(item).await;
                            if timeout.is_some() {
                                deadline = timeout.map(|d| Instant::now() + d);
                            }
                        }
                        None => {
                            // All handles dropped; flush what remains and exit.
                            self.flush_fully(FlushReason::Shutdown).await;
                            return;
                        }
                    }
                }

                () = sleep, if timeout.is_some() => {
                    self.flush_all(FlushReason::Timer).await;
                    deadline = timeout.map(|d| Instant::now() + d);
                }
            }
        }
    }

    async fn accept(&mut self, item: IngressItem) {
        let kind = item.data.kind();
        let items = item.data.item_count();

        match kind {
            SignalType::Traces => self.metrics.consumed_items_traces.add(items as u64),
            SignalType::Metrics => self.metrics.consumed_items_metrics.add(items as u64),
            SignalType::Logs => self.metrics.consumed_items_logs.add(items as u64),
            SignalType::Profiles => self.metrics.consumed_items_profiles.add(items as u64),
        }

        let acc = self.accumulator_for(kind);
        acc.data.move_and_append_from(item.data);
        if let Some(waiter) = item.waiter {
            acc.waiters.push(waiter);
        }

        while self.accumulator_for(kind).data.item_count() >= self.lower_limit.get() {
            let before = self.accumulator_for(kind).data.item_count();
            self.flush_signal(kind, FlushReason::Size).await;
            if self.accumulator_for(kind).data.item_count() >= before {
                // Export produced no progress (shouldn't happen; guards against
                // an infinite loop if it ever does).
                break;
            }
        }
    }

    fn accumulator_for(&mut self, kind: SignalType) -> &mut Accumulator {
        match kind {
            SignalType::Traces => &mut self.traces,
            SignalType::Metrics => &mut self.metrics_buf,
            SignalType::Logs => &mut self.logs,
            SignalType::Profiles => &mut self.profiles,
        }
    }

    async fn flush_all(&mut self, reason: FlushReason) {
        for kind in [
            SignalType::Traces,
            SignalType::Metrics,
            SignalType::Logs,
            SignalType::Profiles,
        ] {
            self.flush_signal(kind, reason).await;
        }
    }

    /// Like [`Task::flush_all`], but loops each signal until its accumulator
    /// is completely empty (rather than a single capped export), so every
    /// waiter attached so far is settled. Used on shutdown paths only.
    async fn flush_fully(&mut self, reason: FlushReason) {
        for kind in [
            SignalType::Traces,
            SignalType::Metrics,
            SignalType::Logs,
            SignalType::Profiles,
        ] {
            while !self.accumulator_for(kind).data.is_empty() {
                self.flush_signal(kind, reason).await;
            }
        }
    }

    async fn flush_signal(&mut self, kind: SignalType, reason: FlushReason) {
        if self.accumulator_for(kind).data.is_empty() {
            return;
        }

        match reason {
            FlushReason::Size => self.metrics.flushes_size.inc(),
            FlushReason::Timer => self.metrics.flushes_timer.inc(),
            FlushReason::Shutdown => self.metrics.flushes_shutdown.inc(),
        }

        let export = if let Some(max) = self.config.send_batch_max_size {
            let total = self.accumulator_for(kind).data.item_count();
            if total > max.get() {
                self.metrics.split_requests.inc();
                self.accumulator_for(kind).data.split_off(max.get())
            } else {
                std::mem::replace(&mut self.accumulator_for(kind).data, SignalData::empty(kind))
            }
        } else {
            std::mem::replace(&mut self.accumulator_for(kind).data, SignalData::empty(kind))
        };

        let remainder_empty = self.accumulator_for(kind).data.is_empty();
        let result = self.downstream.consume(export).await;
        if let Err(ref err) = result {
            tracing::warn!(signal = %kind, error = %err, "batching processor: downstream export failed");
        }

        // Only settle waiters once nothing of theirs is left unflushed: a
        // split leaves a remainder whose waiters must wait for a later
        // flush that actually exports it.
        if remainder_empty {
            for waiter in std::mem::take(&mut self.accumulator_for(kind).waiters) {
                let _ = waiter.send(result.clone());
            }
        }
    }

    async fn drain_and_shutdown(&mut self, ack_tx: Option<oneshot::Sender<()>>) {
        loop {
            match self.rx.try_recv() {
                Ok(item) => self.accept(item).await,
                Err(_) => break,
            }
        }

        self.flush_fully(FlushReason::Shutdown).await;

        if let Some(ack_tx) = ack_tx {
            let _ = ack_tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use otelcol_core_pdata::traces::{one_span_trace, Span};
    use std::num::NonZeroUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingConsumer {
        exports: Mutex<Vec<SignalData>>,
    }

    impl RecordingConsumer {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                exports: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Consumer<SignalData> for RecordingConsumer {
        async fn consume(&self, data: SignalData) -> Result<(), ConsumeError> {
            self.exports.lock().unwrap().push(data);
            Ok(())
        }
    }

    fn one_span(n: u8) -> otelcol_core_pdata::TracesData {
        one_span_trace([n; 16], Span::new([n; 16], [n; 8], "span"))
    }

    // S1: crossing send_batch_size flushes exactly once the threshold is met.
    #[tokio::test]
    async fn size_trigger_flushes_at_threshold() {
        let downstream = RecordingConsumer::new();
        let config = Config {
            send_batch_size: NonZeroUsize::new(2),
            send_batch_max_size: None,
            timeout: None,
            back_pressure: false,
        };
        let (handle, shutdown) = spawn(config, downstream.clone(), Arc::new(BatchMetrics::default())).unwrap();

        handle.consume_traces(one_span(1)).await.unwrap();
        assert!(downstream.exports.lock().unwrap().is_empty());
        handle.consume_traces(one_span(2)).await.unwrap();

        // Give the task a chance to process the second item and flush.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(downstream.exports.lock().unwrap().len(), 1);
        assert_eq!(downstream.exports.lock().unwrap()[0].item_count(), 2);

        shutdown.shutdown().await;
    }

    // S2: a single consume call that jumps straight past the threshold is
    // split at send_batch_max_size, leaving the remainder in the accumulator
    // for a later flush. `send_batch_size == send_batch_max_size` here
    // (validate() requires max >= size); the split comes from all 3 items
    // arriving in one accept() call rather than from max being below size.
    #[tokio::test]
    async fn split_caps_export_at_max_size() {
        let downstream = RecordingConsumer::new();
        let config = Config {
            send_batch_size: NonZeroUsize::new(2),
            send_batch_max_size: NonZeroUsize::new(2),
            timeout: None,
            back_pressure: false,
        };
        let (handle, shutdown) = spawn(config, downstream.clone(), Arc::new(BatchMetrics::default())).unwrap();

        let mut data = one_span(1);
        data.groups[0].items.push(Span::new([1; 16], [2; 8], "b"));
        data.groups[0].items.push(Span::new([1; 16], [3; 8], "c"));
        // 3 items in a single resource group; max_size caps each export at 2.
        handle.consume_traces(data).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        {
            let exports = downstream.exports.lock().unwrap();
            assert_eq!(exports.len(), 1);
            assert_eq!(exports[0].item_count(), 2);
        }

        // Shutdown flushes the one-item remainder left behind by the split.
        shutdown.shutdown().await;
        let exports = downstream.exports.lock().unwrap();
        assert_eq!(exports.len(), 2);
        assert_eq!(exports[1].item_count(), 1);
    }

    // S3: with back-pressure on and no size trigger, the caller's waiter
    // only resolves once the idle timeout flushes the batch.
    #[tokio::test]
    async fn timeout_flush_resolves_back_pressured_waiter() {
        let downstream = RecordingConsumer::new();
        let config = Config {
            send_batch_size: NonZeroUsize::new(100),
            send_batch_max_size: None,
            timeout: Some(Duration::from_millis(30)),
            back_pressure: true,
        };
        let (handle, shutdown) = spawn(config, downstream.clone(), Arc::new(BatchMetrics::default())).unwrap();

        let start = Instant::now();
        handle.consume_traces(one_span(1)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(25));
        assert_eq!(downstream.exports.lock().unwrap().len(), 1);

        shutdown.shutdown().await;
    }

    #[tokio::test]
    async fn zero_item_container_is_not_enqueued() {
        let downstream = RecordingConsumer::new();
        let config = Config {
            send_batch_size: NonZeroUsize::new(1),
            send_batch_max_size: None,
            timeout: None,
            back_pressure: false,
        };
        let metrics = Arc::new(BatchMetrics::default());
        let (handle, shutdown) = spawn(config, downstream.clone(), metrics.clone()).unwrap();

        handle
            .consume_traces(otelcol_core_pdata::TracesData::default())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(downstream.exports.lock().unwrap().is_empty());
        assert_eq!(metrics.dropped_empty.get(), 1);

        shutdown.shutdown().await;
    }
}
