//! Event delivery
//!
//! Every event goes to the run's unbounded event channel (consumed by the
//! caller's stream) and, when configured, to a telemetry sink through a
//! bounded buffer. A full buffer drops the event for telemetry only; the
//! orchestration never waits on a slow sink.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::agent::runtime::capability::TelemetrySink;
use crate::agent::types::events::Event;
use crate::agent::types::ids::RunId;

/// Non-blocking bridge to a [`TelemetrySink`]
#[derive(Clone)]
pub struct TelemetryDispatcher {
    tx: mpsc::Sender<Event>,
    dropped: Arc<AtomicU64>,
}

impl TelemetryDispatcher {
    /// Spawn the forwarding task. Must be called inside a tokio runtime.
    pub fn spawn(sink: Arc<dyn TelemetrySink>, run_id: RunId, buffer: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Event>(buffer.max(1));
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                sink.record(run_id, &event).await;
            }
            tracing::debug!("Telemetry forwarder for {} finished", run_id);
        });

        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    fn offer(&self, event: &Event) {
        match self.tx.try_send(event.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                if dropped == 1 || dropped % 100 == 0 {
                    tracing::warn!("Telemetry sink is lagging, {} event(s) dropped", dropped);
                }
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }

    /// Events discarded because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Where a run's events go
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Event>,
    telemetry: Option<TelemetryDispatcher>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
        Self { tx, telemetry: None }
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryDispatcher) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn telemetry(&self) -> Option<&TelemetryDispatcher> {
        self.telemetry.as_ref()
    }

    pub fn emit(&self, event: Event) {
        tracing::trace!(agent = event.agent_name(), kind = event.kind(), "event");
        if let Some(ref telemetry) = self.telemetry {
            telemetry.offer(&event);
        }
        // Receiver gone means nobody is listening anymore; the run is being torn down.
        let _ = self.tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::runtime::capability::Capability;
    use std::time::Duration;

    struct SlowSink {
        seen: Arc<AtomicU64>,
    }

    impl Capability for SlowSink {
        fn name(&self) -> &'static str {
            "slow-sink"
        }
    }

    #[async_trait::async_trait]
    impl TelemetrySink for SlowSink {
        async fn record(&self, _run_id: RunId, _event: &Event) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            self.seen.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn partial(text: &str) -> Event {
        Event::PartialOutput {
            agent_name: "a".to_string(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_slow_sink_never_blocks_emission() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let seen = Arc::new(AtomicU64::new(0));
        let dispatcher = TelemetryDispatcher::spawn(
            Arc::new(SlowSink { seen: seen.clone() }),
            RunId::generate(),
            2,
        );
        let sink = EventSink::new(tx).with_telemetry(dispatcher);

        for i in 0..50 {
            sink.emit(partial(&i.to_string()));
        }

        // Every event reached the caller even though telemetry is stuck
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 50);
        assert!(sink.telemetry().unwrap().dropped() > 0);
        assert_eq!(seen.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        EventSink::new(tx).emit(partial("ignored"));
    }
}
