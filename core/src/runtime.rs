use futures::future::join_all;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::backend::{AssistantBackend, ToolExecutor};
use crate::error::RunError;
use crate::extract::extract_latest;
use crate::session::ConversationSession;
use crate::types::{RunSnapshot, RunState, ToolCallRequest, ToolCallResult};

/// How the wait between unsuccessful polls grows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Always wait the base interval
    Fixed,
    /// Multiply the interval by `factor` per consecutive wait, capped at `max`
    Exponential { factor: f64, max: Duration },
}

impl Backoff {
    pub fn exponential() -> Self {
        Self::Exponential {
            factor: 2.0,
            max: Duration::from_secs(10),
        }
    }

    /// Delay before the `attempt`-th consecutive re-poll (0-based).
    pub fn delay(&self, base: Duration, attempt: u32) -> Duration {
        match *self {
            Self::Fixed => base,
            Self::Exponential { factor, max } => {
                let scaled = base.as_nanos() as f64 * factor.max(1.0).powi(attempt as i32);
                let capped = scaled.min(max.as_nanos() as f64);
                Duration::from_nanos(capped as u64)
            }
        }
    }
}

/// Limits on how long a single run is driven.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Base wait between polls while the run is pending
    pub interval: Duration,
    pub backoff: Backoff,
    /// Status checks allowed after the run is created
    pub max_polls: u32,
    /// Wall-clock limit for the whole run, measured from its creation
    pub deadline: Option<Duration>,
    /// Retries for a retryable failure of a single status check
    pub transport_retries: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            backoff: Backoff::Fixed,
            max_polls: 120,
            deadline: Some(Duration::from_secs(300)),
            transport_retries: 3,
        }
    }
}

/// Drives one user query through a run: submit, poll, resolve tool calls,
/// extract the reply.
pub struct RunDriver<B, T> {
    backend: B,
    tools: T,
    policy: PollPolicy,
}

impl<B, T> RunDriver<B, T>
where
    B: AssistantBackend,
    T: ToolExecutor,
{
    pub fn new(backend: B, tools: T, policy: PollPolicy) -> Self {
        Self {
            backend,
            tools,
            policy,
        }
    }

    /// Posts `query` to the session's thread and returns the assistant's
    /// reply once the run completes.
    pub async fn run_query(
        &self,
        session: &ConversationSession,
        query: &str,
    ) -> Result<String, RunError> {
        let thread_id = session.thread_id.as_str();
        info!(thread_id, "User: {}", query);

        self.backend.create_message(thread_id, query).await?;
        let run = self
            .backend
            .create_run(thread_id, &session.assistant_id)
            .await?;
        info!(thread_id, run_id = %run.run_id, "Run submitted");

        let run_id = run.run_id.clone();
        if let Err(e) = self.drive(thread_id, run).await {
            // A run left active blocks new messages on its thread
            if matches!(e, RunError::Timeout { .. } | RunError::Backend(_)) {
                self.cancel(thread_id, &run_id).await;
            }
            return Err(e);
        }
        extract_latest(&self.backend, thread_id).await
    }

    /// Best effort: a failed cancel is logged and otherwise ignored.
    async fn cancel(&self, thread_id: &str, run_id: &str) {
        match self.backend.cancel_run(thread_id, run_id).await {
            Ok(()) => info!(thread_id, run_id, "Run cancelled"),
            Err(e) => warn!(thread_id, run_id, error = %e, "Failed to cancel run"),
        }
    }

    /// Polls `run` until it completes.
    async fn drive(&self, thread_id: &str, mut run: RunSnapshot) -> Result<(), RunError> {
        let started = Instant::now();
        let mut polls: u32 = 0;
        let mut consecutive_waits: u32 = 0;

        loop {
            debug!(run_id = %run.run_id, status = %run.state, "Run status");

            match run.state {
                RunState::Completed => {
                    info!(run_id = %run.run_id, polls, elapsed = ?started.elapsed(), "Run completed");
                    return Ok(());
                }
                RunState::RequiresAction => {
                    self.check_budget(polls, started, Duration::ZERO)?;
                    info!(
                        run_id = %run.run_id,
                        calls = run.pending_tool_calls.len(),
                        "Tool calls required. Executing..."
                    );
                    let outputs = self.dispatch(&run.pending_tool_calls).await;
                    run = self
                        .backend
                        .submit_tool_outputs(thread_id, &run.run_id, &outputs)
                        .await?;
                    polls += 1;
                    consecutive_waits = 0;
                }
                state if state.is_terminal_failure() => {
                    let reason = run
                        .last_error
                        .clone()
                        .unwrap_or_else(|| "no error reported".to_string());
                    warn!(run_id = %run.run_id, status = %state, %reason, "Run ended without completing");
                    return Err(RunError::RunEnded { state, reason });
                }
                _ => {
                    let delay = self
                        .policy
                        .backoff
                        .delay(self.policy.interval, consecutive_waits);
                    self.check_budget(polls, started, delay)?;
                    sleep(delay).await;
                    consecutive_waits += 1;
                    run = self
                        .retrieve_with_retry(thread_id, &run.run_id, polls, started)
                        .await?;
                    polls += 1;
                }
            }
        }
    }

    fn check_budget(&self, polls: u32, started: Instant, next_wait: Duration) -> Result<(), RunError> {
        let elapsed = started.elapsed();
        let past_deadline = self
            .policy
            .deadline
            .is_some_and(|deadline| elapsed + next_wait > deadline);

        if polls >= self.policy.max_polls || past_deadline {
            warn!(polls, ?elapsed, "Run exceeded its polling budget");
            return Err(RunError::Timeout { polls, elapsed });
        }
        Ok(())
    }

    /// Retries stay inside the run's deadline.
    async fn retrieve_with_retry(
        &self,
        thread_id: &str,
        run_id: &str,
        polls: u32,
        started: Instant,
    ) -> Result<RunSnapshot, RunError> {
        let mut attempt = 0;
        loop {
            match self.backend.retrieve_run(thread_id, run_id).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(e) if e.is_retryable() && attempt < self.policy.transport_retries => {
                    attempt += 1;
                    warn!(run_id, attempt, error = %e, "Status check failed, retrying");
                    self.check_budget(polls, started, self.policy.interval)?;
                    sleep(self.policy.interval).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Runs every pending call concurrently and joins them. Results come back
    /// in request order, one per call, carrying the original call id.
    async fn dispatch(&self, calls: &[ToolCallRequest]) -> Vec<ToolCallResult> {
        let pending = calls.iter().map(|call| async move {
            let outcome = self
                .tools
                .execute(&call.tool_name, call.arguments.clone())
                .await;
            ToolCallResult {
                call_id: call.call_id.clone(),
                output: outcome.render(),
            }
        });
        join_all(pending).await
    }
}
