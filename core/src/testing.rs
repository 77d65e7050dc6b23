//! Scripted in-memory implementations for testing
//!
//! `ScriptedBackend` replays queued run snapshots and records every call so
//! tests can assert on what was sent to the assistant service.

use crate::backend::{AssistantBackend, ToolExecutor};
use crate::error::BackendError;
use crate::registry::ToolDefinition;
use crate::types::{RunSnapshot, ThreadMessage, ToolCallResult, ToolOutcome};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Script {
    statuses: VecDeque<RunSnapshot>,
    repeat: Option<RunSnapshot>,
    retrieve_failures: VecDeque<BackendError>,
    setup_failure: Option<BackendError>,
    thread_delay: Option<Duration>,
    messages: Vec<ThreadMessage>,
}

#[derive(Default)]
struct Record {
    assistant: Option<(String, Vec<String>)>,
    thread_calls: usize,
    user_messages: Vec<String>,
    run_calls: usize,
    retrieve_calls: usize,
    retrieve_timestamps: Vec<Instant>,
    submissions: Vec<Vec<ToolCallResult>>,
    cancelled: Vec<String>,
    status_checks: usize,
    latest_message_calls: usize,
    total_calls: usize,
}

/// Assistant backend that replays a queue of run snapshots.
///
/// `create_run`, `retrieve_run` and `submit_tool_outputs` each consume the
/// next queued snapshot. `latest_message` returns the most recently pushed
/// message without consuming it.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
    record: Mutex<Record>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next observed run status
    pub fn push_status(&self, snapshot: RunSnapshot) {
        self.script.lock().unwrap().statuses.push_back(snapshot);
    }

    /// Return `snapshot` whenever the queue is empty
    pub fn repeat_status(&self, snapshot: RunSnapshot) {
        self.script.lock().unwrap().repeat = Some(snapshot);
    }

    /// Fail the next `retrieve_run` before consuming a status
    pub fn fail_next_retrieve(&self, error: BackendError) {
        self.script.lock().unwrap().retrieve_failures.push_back(error);
    }

    /// Fail assistant and thread creation
    pub fn fail_setup(&self, error: BackendError) {
        self.script.lock().unwrap().setup_failure = Some(error);
    }

    pub fn clear_setup_failure(&self) {
        self.script.lock().unwrap().setup_failure = None;
    }

    /// Make every `create_thread` take at least `delay`
    pub fn delay_threads(&self, delay: Duration) {
        self.script.lock().unwrap().thread_delay = Some(delay);
    }

    pub fn push_message(&self, message: ThreadMessage) {
        self.script.lock().unwrap().messages.push(message);
    }

    /// Name and tool names of the last created assistant
    pub fn created_assistant(&self) -> Option<(String, Vec<String>)> {
        self.record.lock().unwrap().assistant.clone()
    }

    pub fn thread_calls(&self) -> usize {
        self.record.lock().unwrap().thread_calls
    }

    pub fn user_messages(&self) -> Vec<String> {
        self.record.lock().unwrap().user_messages.clone()
    }

    pub fn run_calls(&self) -> usize {
        self.record.lock().unwrap().run_calls
    }

    pub fn retrieve_calls(&self) -> usize {
        self.record.lock().unwrap().retrieve_calls
    }

    pub fn retrieve_timestamps(&self) -> Vec<Instant> {
        self.record.lock().unwrap().retrieve_timestamps.clone()
    }

    /// Every batch passed to `submit_tool_outputs`
    pub fn submissions(&self) -> Vec<Vec<ToolCallResult>> {
        self.record.lock().unwrap().submissions.clone()
    }

    /// Run ids passed to `cancel_run`, in call order
    pub fn cancelled_runs(&self) -> Vec<String> {
        self.record.lock().unwrap().cancelled.clone()
    }

    /// Run snapshots handed out so far
    pub fn status_checks(&self) -> usize {
        self.record.lock().unwrap().status_checks
    }

    pub fn latest_message_calls(&self) -> usize {
        self.record.lock().unwrap().latest_message_calls
    }

    /// Calls of any kind made against this backend
    pub fn total_calls(&self) -> usize {
        self.record.lock().unwrap().total_calls
    }

    fn touch(&self) {
        self.record.lock().unwrap().total_calls += 1;
    }

    fn next_status(&self) -> Result<RunSnapshot, BackendError> {
        let mut script = self.script.lock().unwrap();
        let next = script.statuses.pop_front().or_else(|| script.repeat.clone());
        drop(script);

        let snapshot = next.ok_or_else(|| BackendError::unknown("no scripted run status"))?;
        self.record.lock().unwrap().status_checks += 1;
        Ok(snapshot)
    }

    fn setup_failure(&self) -> Option<BackendError> {
        self.script.lock().unwrap().setup_failure.clone()
    }
}

#[async_trait]
impl AssistantBackend for ScriptedBackend {
    async fn create_assistant(
        &self,
        name: &str,
        _instructions: &str,
        tools: &[ToolDefinition],
    ) -> Result<String, BackendError> {
        self.touch();
        if let Some(error) = self.setup_failure() {
            return Err(error);
        }
        let names = tools.iter().map(|t| t.name.clone()).collect();
        self.record.lock().unwrap().assistant = Some((name.to_string(), names));
        Ok("asst_1".to_string())
    }

    async fn create_thread(&self) -> Result<String, BackendError> {
        self.touch();
        let delay = self.script.lock().unwrap().thread_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.setup_failure() {
            return Err(error);
        }
        let mut record = self.record.lock().unwrap();
        record.thread_calls += 1;
        Ok(format!("thread_{}", record.thread_calls))
    }

    async fn create_message(&self, _thread_id: &str, content: &str) -> Result<(), BackendError> {
        self.touch();
        self.record
            .lock()
            .unwrap()
            .user_messages
            .push(content.to_string());
        Ok(())
    }

    async fn create_run(
        &self,
        _thread_id: &str,
        _assistant_id: &str,
    ) -> Result<RunSnapshot, BackendError> {
        self.touch();
        self.record.lock().unwrap().run_calls += 1;
        self.next_status()
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        _run_id: &str,
        outputs: &[ToolCallResult],
    ) -> Result<RunSnapshot, BackendError> {
        self.touch();
        self.record
            .lock()
            .unwrap()
            .submissions
            .push(outputs.to_vec());
        self.next_status()
    }

    async fn retrieve_run(
        &self,
        _thread_id: &str,
        _run_id: &str,
    ) -> Result<RunSnapshot, BackendError> {
        self.touch();
        {
            let mut record = self.record.lock().unwrap();
            record.retrieve_calls += 1;
            record.retrieve_timestamps.push(Instant::now());
        }
        if let Some(error) = self.script.lock().unwrap().retrieve_failures.pop_front() {
            return Err(error);
        }
        self.next_status()
    }

    async fn cancel_run(&self, _thread_id: &str, run_id: &str) -> Result<(), BackendError> {
        self.touch();
        self.record.lock().unwrap().cancelled.push(run_id.to_string());
        Ok(())
    }

    async fn latest_message(&self, _thread_id: &str) -> Result<Option<ThreadMessage>, BackendError> {
        self.touch();
        self.record.lock().unwrap().latest_message_calls += 1;
        Ok(self.script.lock().unwrap().messages.last().cloned())
    }
}

/// Tool executor that acknowledges every call and records it.
#[derive(Default)]
pub struct EchoTools {
    executions: Mutex<Vec<(String, Value)>>,
}

impl EchoTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executed(&self) -> Vec<(String, Value)> {
        self.executions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutor for EchoTools {
    async fn execute(&self, name: &str, arguments: Value) -> ToolOutcome {
        self.executions
            .lock()
            .unwrap()
            .push((name.to_string(), arguments.clone()));
        ToolOutcome::acknowledged(format!("{name} {arguments}"))
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }
}
