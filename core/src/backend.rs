//! Trait seams between the run driver and the outside world
//!
//! The driver only talks to the assistant service and to the tools through
//! these traits, so tests can swap in scripted implementations.

use crate::error::BackendError;
use crate::registry::ToolDefinition;
use crate::types::{RunSnapshot, ThreadMessage, ToolCallResult, ToolOutcome};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Calls the driver makes against the hosted assistant service.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    /// Create an assistant persona and return its id
    async fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        tools: &[ToolDefinition],
    ) -> Result<String, BackendError>;

    /// Open an empty thread and return its id
    async fn create_thread(&self) -> Result<String, BackendError>;

    /// Append a user message to a thread
    async fn create_message(&self, thread_id: &str, content: &str) -> Result<(), BackendError>;

    /// Start a run of `assistant_id` over the thread
    async fn create_run(&self, thread_id: &str, assistant_id: &str)
        -> Result<RunSnapshot, BackendError>;

    /// Resume a paused run with one output per pending call
    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolCallResult],
    ) -> Result<RunSnapshot, BackendError>;

    async fn retrieve_run(&self, thread_id: &str, run_id: &str)
        -> Result<RunSnapshot, BackendError>;

    /// Ask the service to stop a run that is still active
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), BackendError>;

    /// Newest message of the thread, if any
    async fn latest_message(&self, thread_id: &str) -> Result<Option<ThreadMessage>, BackendError>;
}

/// Executes tools requested by a run.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run one tool. Never fails: problems come back as `ToolOutcome::Failure`.
    async fn execute(&self, name: &str, arguments: Value) -> ToolOutcome;

    /// Definitions advertised to the assistant
    fn definitions(&self) -> Vec<ToolDefinition>;
}

#[async_trait]
impl<T: AssistantBackend + ?Sized> AssistantBackend for Arc<T> {
    async fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        tools: &[ToolDefinition],
    ) -> Result<String, BackendError> {
        (**self).create_assistant(name, instructions, tools).await
    }

    async fn create_thread(&self) -> Result<String, BackendError> {
        (**self).create_thread().await
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> Result<(), BackendError> {
        (**self).create_message(thread_id, content).await
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunSnapshot, BackendError> {
        (**self).create_run(thread_id, assistant_id).await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolCallResult],
    ) -> Result<RunSnapshot, BackendError> {
        (**self).submit_tool_outputs(thread_id, run_id, outputs).await
    }

    async fn retrieve_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunSnapshot, BackendError> {
        (**self).retrieve_run(thread_id, run_id).await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), BackendError> {
        (**self).cancel_run(thread_id, run_id).await
    }

    async fn latest_message(&self, thread_id: &str) -> Result<Option<ThreadMessage>, BackendError> {
        (**self).latest_message(thread_id).await
    }
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(&self, name: &str, arguments: Value) -> ToolOutcome {
        (**self).execute(name, arguments).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        (**self).definitions()
    }
}
