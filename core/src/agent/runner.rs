//! Run entry point
//!
//! ```ignore
//! let runner = Runner::new(EngineConfig::load_or_default())
//!     .with_telemetry(Arc::new(ConsoleTelemetry::new()));
//! let mut handle = runner.run(root, initial_state, json!("Write a haiku"));
//!
//! while let Some(event) = handle.next().await {
//!     println!("{}", format_event(&event));
//! }
//! ```
//!
//! Nothing executes until the event stream is first polled. Dropping the
//! stream before it ends cancels the run.

use futures::stream::{BoxStream, Stream, StreamExt};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::agent::core::Agent;
use crate::agent::runtime::capability::TelemetrySink;
use crate::agent::runtime::context::OrchestrationContext;
use crate::agent::runtime::sink::{EventSink, TelemetryDispatcher};
use crate::agent::session::SessionState;
use crate::agent::types::events::{AgentOutcome, Event};
use crate::agent::types::ids::RunId;
use crate::config::EngineConfig;
use crate::error::AgentError;

/// Starts runs of agent graphs
#[derive(Default)]
pub struct Runner {
    config: EngineConfig,
    telemetry: Option<Arc<dyn TelemetrySink>>,
}

impl Runner {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            telemetry: None,
        }
    }

    /// Mirror every event of every run into `sink`
    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Prepare a run of `root`. Execution starts on first poll of the handle.
    pub fn run(
        &self,
        root: Arc<Agent>,
        initial_state: impl Into<SessionState>,
        input: Value,
    ) -> RunHandle {
        let run_id = RunId::generate();
        let state: SessionState = initial_state.into();
        let cancellation = CancellationToken::new();
        let outcome = Arc::new(Mutex::new(None));

        tracing::info!("Starting {} with root agent '{}'", run_id, root.name());

        let events = Self::event_stream(
            run_id,
            root,
            state.clone(),
            cancellation.clone(),
            input,
            self.config.clone(),
            self.telemetry.clone(),
            Arc::clone(&outcome),
        );

        RunHandle {
            run_id,
            state,
            cancellation,
            outcome,
            events,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn event_stream(
        run_id: RunId,
        root: Arc<Agent>,
        state: SessionState,
        cancellation: CancellationToken,
        input: Value,
        config: EngineConfig,
        telemetry: Option<Arc<dyn TelemetrySink>>,
        outcome_slot: Arc<Mutex<Option<AgentOutcome>>>,
    ) -> BoxStream<'static, Event> {
        async_stream::stream! {
            // Cancels the run if the consumer drops the stream early
            let guard = cancellation.clone().drop_guard();

            let (tx, rx) = mpsc::unbounded_channel();
            let mut sink = EventSink::new(tx);
            if let Some(telemetry) = telemetry {
                sink = sink.with_telemetry(TelemetryDispatcher::spawn(
                    telemetry,
                    run_id,
                    config.telemetry.buffer,
                ));
            }

            let root_name = root.name().to_string();
            let ctx = OrchestrationContext::root(
                run_id,
                state,
                cancellation,
                config.budget,
                input,
                sink,
            );
            let task = tokio::spawn(root.execute(ctx));

            // Closes once the root task and every context clone are gone
            let mut events = UnboundedReceiverStream::new(rx);
            while let Some(event) = events.next().await {
                yield event;
            }

            let outcome = match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Root agent task for {} ended abnormally: {}", run_id, e);
                    let outcome = AgentOutcome::Failed(AgentError::Panicked {
                        agent: root_name.clone(),
                    });
                    yield outcome.to_event(&root_name);
                    outcome
                }
            };
            tracing::info!("{} finished: {}", run_id, outcome_label(&outcome));
            *outcome_slot.lock() = Some(outcome);
            let _ = guard.disarm();
        }
        .boxed()
    }
}

fn outcome_label(outcome: &AgentOutcome) -> &'static str {
    match outcome {
        AgentOutcome::Completed(_) => "completed",
        AgentOutcome::Cancelled(_) => "cancelled",
        AgentOutcome::Failed(_) => "failed",
    }
}

/// Start a run with the default engine configuration
pub fn run(root: Arc<Agent>, initial_state: impl Into<SessionState>) -> RunHandle {
    Runner::default().run(root, initial_state, Value::Null)
}

/// Handle on one run: its event stream, shared state and cancellation
pub struct RunHandle {
    run_id: RunId,
    state: SessionState,
    cancellation: CancellationToken,
    outcome: Arc<Mutex<Option<AgentOutcome>>>,
    events: BoxStream<'static, Event>,
}

impl std::fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunHandle")
            .field("run_id", &self.run_id)
            .field("cancelled", &self.cancellation.is_cancelled())
            .field("finished", &self.outcome.lock().is_some())
            .finish()
    }
}

impl RunHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The run's SessionState; reads reflect writes made so far
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Request cooperative cancellation
    pub fn cancel(&self) {
        tracing::info!("Cancellation requested for {}", self.run_id);
        self.cancellation.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Root outcome, once the stream has ended
    pub fn outcome(&self) -> Option<AgentOutcome> {
        self.outcome.lock().clone()
    }

    /// The lazy event stream on its own
    pub fn events(self) -> BoxStream<'static, Event> {
        self.events
    }

    /// Drive the run to the end and gather everything it produced
    pub async fn collect(mut self) -> RunReport {
        let mut events = Vec::new();
        while let Some(event) = self.events.next().await {
            events.push(event);
        }

        let outcome = self
            .outcome
            .lock()
            .take()
            .unwrap_or(AgentOutcome::Cancelled(Value::Null));

        RunReport {
            run_id: self.run_id,
            events,
            final_state: self.state.snapshot(),
            outcome,
        }
    }
}

impl Stream for RunHandle {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.events.as_mut().poll_next(cx)
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub events: Vec<Event>,
    pub final_state: Map<String, Value>,
    pub outcome: AgentOutcome,
}

impl RunReport {
    /// Events emitted by one agent, in order
    pub fn events_for<'a>(&'a self, agent: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.agent_name() == agent)
    }

    /// Terminal events only
    pub fn terminal_events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|e| e.is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::runtime::impls::ScriptedReasoning;
    use crate::agent::types::conversation::ReasoningResponse;
    use serde_json::json;
    use std::time::Duration;

    fn leaf(name: &str, answer: &str) -> Arc<Agent> {
        let reasoning =
            ScriptedReasoning::new().script(name, [ReasoningResponse::answer(answer)]);
        Arc::new(
            Agent::reasoning(name)
                .with_reasoning(Arc::new(reasoning))
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_collect_reports_outcome_and_state() {
        let mut state = Map::new();
        state.insert("topic".to_string(), json!("rust"));

        let report = Runner::default()
            .run(leaf("writer", "done"), state, json!("go"))
            .collect()
            .await;

        assert_eq!(report.outcome, AgentOutcome::Completed(json!("done")));
        assert_eq!(report.final_state.get("topic"), Some(&json!("rust")));
        assert_eq!(report.terminal_events().count(), 1);
        assert!(report.events.last().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_nothing_runs_until_polled() {
        let reasoning = Arc::new(
            ScriptedReasoning::new().script("idle", [ReasoningResponse::answer("x")]),
        );
        let root = Arc::new(
            Agent::reasoning("idle")
                .with_reasoning(reasoning.clone())
                .build()
                .unwrap(),
        );

        let handle = run(root, SessionState::new());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(reasoning.calls("idle"), 0);
        assert!(handle.outcome().is_none());

        let report = handle.collect().await;
        assert_eq!(reasoning.calls("idle"), 1);
        assert!(report.outcome.is_completed());
    }

    #[tokio::test]
    async fn test_dropping_stream_cancels_run() {
        let handle = Runner::default().run(leaf("a", "ok"), SessionState::new(), Value::Null);
        let token = handle.cancellation_token();

        let mut events = handle.events();
        // Start execution, then walk away
        let _ = events.next().await;
        drop(events);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_finished_run_is_not_cancelled() {
        let handle = Runner::default().run(leaf("a", "ok"), SessionState::new(), Value::Null);
        let token = handle.cancellation_token();
        let report = handle.collect().await;
        assert!(report.outcome.is_completed());
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let handle = Runner::default().run(leaf("a", "ok"), SessionState::new(), Value::Null);
        handle.cancel();
        let report = handle.collect().await;
        assert_eq!(report.outcome, AgentOutcome::Cancelled(Value::Null));
    }
}
