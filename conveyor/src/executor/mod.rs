//! The pipeline executor: drives a validated graph to completion under a
//! concurrency budget.
//!
//! Stages are dispatched as soon as their dependencies have completed and a
//! concurrency slot is free. Each stage attempt is one collaborator call,
//! bounded by the stage's timeout and retried with backoff up to its
//! configured count. A gate decision is applied to every terminal result;
//! a block skips every transitive dependent. The run ends when nothing is
//! ready and nothing is in flight, or when the global deadline elapses.
//! The notifier is invoked exactly once, after the terminal state.

#[cfg(test)]
mod scenario_tests;

use crate::cancellation::CancelToken;
use crate::collaborators::{ActionContext, ArtifactBag};
use crate::core::StageResult;
use crate::events::{EventSink, NoOpEventSink, RunEvent};
use crate::gate::GateDecision;
use crate::notify::{LoggingNotifier, Notifier};
use crate::pipeline::{PipelineGraph, StageSpec};
use crate::run::{RunIdentity, RunReport, RunState};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinError;

/// Execution knobs for one executor.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// Maximum simultaneously running stages.
    pub max_concurrency: usize,
    /// Global run deadline.
    pub run_timeout: Duration,
    /// How long cancelled in-flight stages get to wind down before being
    /// force-marked timed out.
    pub cancel_grace: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            run_timeout: Duration::from_secs(3600),
            cancel_grace: Duration::from_secs(5),
        }
    }
}

/// Drives pipeline graphs to completion.
///
/// One `run` call owns one [`RunState`] exclusively; all result writes
/// happen on the executor's event loop, giving one logical writer no
/// matter how many stages run concurrently.
#[derive(Debug)]
pub struct Executor {
    config: ExecutorConfig,
    events: Arc<dyn EventSink>,
    notifier: Arc<dyn Notifier>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

impl Executor {
    /// Creates an executor with a no-op event sink and the logging
    /// notifier. A zero concurrency budget is clamped to one.
    #[must_use]
    pub fn new(mut config: ExecutorConfig) -> Self {
        config.max_concurrency = config.max_concurrency.max(1);
        Self {
            config,
            events: Arc::new(NoOpEventSink),
            notifier: Arc::new(LoggingNotifier),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sets the notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Runs the graph to its terminal state and returns the final report.
    ///
    /// Stage-local errors never escape: every stage ends up with exactly
    /// one recorded result and the report enumerates them all.
    pub async fn run(&self, graph: &PipelineGraph, identity: RunIdentity) -> RunReport {
        let run_started = Instant::now();
        let cancel = Arc::new(CancelToken::new());
        let ctx = ActionContext::new(identity.clone(), Arc::new(ArtifactBag::new()), cancel.clone());
        let mut state = RunState::new(graph.name(), identity);

        self.events.emit(&RunEvent::RunStarted {
            run_id: state.identity().run_id,
            pipeline: graph.name().to_string(),
        });

        let mut completed: HashSet<String> = HashSet::new();
        let mut started: HashSet<String> = HashSet::new();
        let mut in_flight = FuturesUnordered::new();
        let deadline = tokio::time::Instant::now() + self.config.run_timeout;

        loop {
            for id in graph.ready_stages(&completed, &started) {
                if in_flight.len() >= self.config.max_concurrency {
                    break;
                }
                started.insert(id.clone());
                if let Some(spec) = graph.stage(&id) {
                    in_flight.push(self.spawn_stage(spec.clone(), ctx.clone()));
                }
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                Some((id, joined)) = in_flight.next() => {
                    let result = finished_result(&id, joined);
                    self.events.emit(&RunEvent::StageFinished {
                        stage: id.clone(),
                        status: result.status,
                        attempts: result.attempts,
                    });

                    let decision = graph
                        .stage(&id)
                        .map_or(GateDecision::Proceed, |spec| spec.gate.decide(spec, &result));
                    state.record(result);

                    if decision.is_block() {
                        self.events.emit(&RunEvent::GateBlocked { stage: id.clone() });
                        for dependent in graph.transitive_dependents(&id) {
                            if started.insert(dependent.clone()) {
                                self.events.emit(&RunEvent::StageSkipped {
                                    stage: dependent.clone(),
                                    blocked_by: id.clone(),
                                });
                                state.record(StageResult::skipped(dependent, id.clone()));
                            }
                        }
                    } else {
                        completed.insert(id);
                    }
                }
                () = tokio::time::sleep_until(deadline) => {
                    cancel.cancel("run timeout elapsed");
                    self.events.emit(&RunEvent::RunCancelled {
                        reason: "run timeout elapsed".to_string(),
                    });
                    self.drain_cancelled(&mut in_flight, &mut state).await;
                    break;
                }
            }
        }

        // Anything started but unrecorded ignored its cancellation signal.
        for id in &started {
            if !state.is_recorded(id) {
                let result = StageResult::timed_out(id.clone(), "cancelled at run timeout");
                self.events.emit(&RunEvent::StageFinished {
                    stage: id.clone(),
                    status: result.status,
                    attempts: result.attempts,
                });
                state.record(result);
            }
        }
        // Anything never dispatched was starved by the deadline.
        for id in graph.stage_ids() {
            if !started.contains(id) {
                let result = StageResult::not_run(id.clone(), "run timeout elapsed");
                self.events.emit(&RunEvent::StageFinished {
                    stage: id.clone(),
                    status: result.status,
                    attempts: result.attempts,
                });
                state.record(result);
            }
        }

        let summary = state.summary();
        let notify_warning = match self.notifier.notify(&summary).await {
            Ok(()) => None,
            Err(err) => {
                self.events.emit(&RunEvent::NotifyFailed {
                    error: err.to_string(),
                });
                Some(err.to_string())
            }
        };

        let report = state.finalize(notify_warning);
        self.events.emit(&RunEvent::RunFinished {
            run_id: report.run.run_id,
            status: report.status,
            duration_ms: run_started.elapsed().as_millis() as u64,
        });
        report
    }

    fn spawn_stage(
        &self,
        spec: StageSpec,
        ctx: ActionContext,
    ) -> impl Future<Output = (String, Result<StageResult, JoinError>)> {
        let id = spec.id.clone();
        let handle = tokio::spawn(run_stage(spec, ctx, self.events.clone()));
        async move { (id, handle.await) }
    }

    /// Gives cancelled in-flight stages the grace period to report their
    /// own terminal results.
    async fn drain_cancelled<F>(&self, in_flight: &mut FuturesUnordered<F>, state: &mut RunState)
    where
        F: Future<Output = (String, Result<StageResult, JoinError>)>,
    {
        let grace = tokio::time::sleep(self.config.cancel_grace);
        tokio::pin!(grace);
        loop {
            tokio::select! {
                maybe = in_flight.next() => match maybe {
                    Some((id, joined)) => {
                        let result = finished_result(&id, joined);
                        self.events.emit(&RunEvent::StageFinished {
                            stage: id.clone(),
                            status: result.status,
                            attempts: result.attempts,
                        });
                        state.record(result);
                    }
                    None => break,
                },
                () = &mut grace => break,
            }
        }
    }
}

fn finished_result(id: &str, joined: Result<StageResult, JoinError>) -> StageResult {
    joined.unwrap_or_else(|err| {
        StageResult::failed(id.to_string(), format!("stage task panicked: {err}"))
    })
}

/// One stage's attempt loop: at most `retries + 1` collaborator calls with
/// backoff in between, each bounded by the stage timeout and racing the
/// run's cancellation token.
async fn run_stage(spec: StageSpec, ctx: ActionContext, events: Arc<dyn EventSink>) -> StageResult {
    let started_at = Utc::now();
    let mut attempt: u32 = 0;

    let result = loop {
        attempt += 1;
        events.emit(&RunEvent::StageDispatched {
            stage: spec.id.clone(),
            attempt,
        });

        let outcome = tokio::select! {
            out = tokio::time::timeout(spec.timeout, spec.action.run(&ctx)) => out,
            () = ctx.cancel.cancelled() => break cancelled_result(&spec, &ctx),
        };

        match outcome {
            Ok(Ok(out)) if out.passed => {
                let mut result = StageResult::succeeded(&spec.id);
                if let Some(detail) = out.detail {
                    result = result.with_detail(detail);
                }
                break result;
            }
            // The collaborator ran and reported a definitive failure;
            // retrying cannot change the verdict.
            Ok(Ok(out)) => {
                break StageResult::failed(
                    &spec.id,
                    out.detail
                        .unwrap_or_else(|| "collaborator reported failure".to_string()),
                );
            }
            Ok(Err(err)) => {
                if attempt <= spec.retries {
                    let delay = spec.retry.delay_for(attempt - 1);
                    events.emit(&RunEvent::StageRetrying {
                        stage: spec.id.clone(),
                        attempt,
                        delay_ms: delay.as_millis() as u64,
                        error: err.to_string(),
                    });
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        () = ctx.cancel.cancelled() => break cancelled_result(&spec, &ctx),
                    }
                } else {
                    break StageResult::failed(&spec.id, err.to_string());
                }
            }
            Err(_elapsed) => {
                break StageResult::timed_out(
                    &spec.id,
                    format!("attempt exceeded {}s deadline", spec.timeout.as_secs()),
                );
            }
        }
    };

    result.with_attempts(attempt).with_timing(started_at, Utc::now())
}

fn cancelled_result(spec: &StageSpec, ctx: &ActionContext) -> StageResult {
    StageResult::timed_out(
        &spec.id,
        ctx.cancel
            .reason()
            .unwrap_or_else(|| "cancelled".to_string()),
    )
}
