use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        AssistantTools, AssistantToolsFunction, CreateAssistantRequestArgs,
        CreateMessageRequestArgs, CreateRunRequestArgs, CreateThreadRequestArgs,
        FunctionObjectArgs, MessageContent, MessageObject, MessageRole, RunObject, RunStatus,
        SubmitToolOutputsRunRequest, ToolsOutputs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::info;

use crate::backend::AssistantBackend;
use crate::config::NavigatorConfig;
use crate::error::BackendError;
use crate::registry::ToolDefinition;
use crate::types::{
    MessagePart, RunSnapshot, RunState, ThreadMessage, ToolCallRequest, ToolCallResult,
};

/// Assistant backend on top of the OpenAI Assistants API.
pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiBackend {
    pub fn new(config: &NavigatorConfig) -> Self {
        let mut openai = OpenAIConfig::new().with_api_key(config.api_key.clone());
        if let Some(base) = &config.base_url {
            openai = openai.with_api_base(base.clone());
        }
        let client = Client::with_config(openai);

        info!(model = %config.model, "Assistant backend configured");
        Self {
            client,
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl AssistantBackend for OpenAiBackend {
    async fn create_assistant(
        &self,
        name: &str,
        instructions: &str,
        tools: &[ToolDefinition],
    ) -> Result<String, BackendError> {
        // Registry definitions -> function tools
        let functions = tools
            .iter()
            .map(|t| {
                FunctionObjectArgs::default()
                    .name(&t.name)
                    .description(&t.description)
                    .parameters(t.parameters.clone())
                    .build()
                    .map(|function| AssistantTools::Function(AssistantToolsFunction { function }))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(classify)?;

        let request = CreateAssistantRequestArgs::default()
            .name(name)
            .instructions(instructions)
            .model(&self.model)
            .tools(functions)
            .build()
            .map_err(classify)?;

        let assistant = self.client.assistants().create(request).await.map_err(classify)?;
        Ok(assistant.id)
    }

    async fn create_thread(&self) -> Result<String, BackendError> {
        let request = CreateThreadRequestArgs::default().build().map_err(classify)?;
        let thread = self.client.threads().create(request).await.map_err(classify)?;
        Ok(thread.id)
    }

    async fn create_message(&self, thread_id: &str, content: &str) -> Result<(), BackendError> {
        let request = CreateMessageRequestArgs::default()
            .role(MessageRole::User)
            .content(content)
            .build()
            .map_err(classify)?;

        self.client
            .threads()
            .messages(thread_id)
            .create(request)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<RunSnapshot, BackendError> {
        let request = CreateRunRequestArgs::default()
            .assistant_id(assistant_id)
            .build()
            .map_err(classify)?;

        let run = self
            .client
            .threads()
            .runs(thread_id)
            .create(request)
            .await
            .map_err(classify)?;
        Ok(snapshot(run))
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolCallResult],
    ) -> Result<RunSnapshot, BackendError> {
        let request = SubmitToolOutputsRunRequest {
            tool_outputs: outputs
                .iter()
                .map(|o| ToolsOutputs {
                    tool_call_id: Some(o.call_id.clone()),
                    output: Some(o.output.clone()),
                })
                .collect(),
            ..Default::default()
        };

        let run = self
            .client
            .threads()
            .runs(thread_id)
            .submit_tool_outputs(run_id, request)
            .await
            .map_err(classify)?;
        Ok(snapshot(run))
    }

    async fn retrieve_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> Result<RunSnapshot, BackendError> {
        let run = self
            .client
            .threads()
            .runs(thread_id)
            .retrieve(run_id)
            .await
            .map_err(classify)?;
        Ok(snapshot(run))
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<(), BackendError> {
        self.client
            .threads()
            .runs(thread_id)
            .cancel(run_id)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn latest_message(&self, thread_id: &str) -> Result<Option<ThreadMessage>, BackendError> {
        // Newest first
        let page = self
            .client
            .threads()
            .messages(thread_id)
            .list(&[("limit", "1"), ("order", "desc")])
            .await
            .map_err(classify)?;

        Ok(page.data.into_iter().next().map(thread_message))
    }
}

fn snapshot(run: RunObject) -> RunSnapshot {
    let state = match run.status {
        RunStatus::Queued => RunState::Queued,
        RunStatus::InProgress => RunState::InProgress,
        RunStatus::RequiresAction => RunState::RequiresAction,
        RunStatus::Cancelling => RunState::Cancelling,
        RunStatus::Cancelled => RunState::Cancelled,
        RunStatus::Failed => RunState::Failed,
        RunStatus::Completed => RunState::Completed,
        RunStatus::Incomplete => RunState::Incomplete,
        RunStatus::Expired => RunState::Expired,
    };

    let pending_tool_calls = run
        .required_action
        .map(|action| {
            action
                .submit_tool_outputs
                .tool_calls
                .into_iter()
                .map(|call| {
                    ToolCallRequest::from_raw_arguments(
                        call.id,
                        call.function.name,
                        &call.function.arguments,
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    RunSnapshot {
        run_id: run.id,
        state,
        pending_tool_calls,
        last_error: run.last_error.map(|e| e.message),
    }
}

fn thread_message(message: MessageObject) -> ThreadMessage {
    let parts = message
        .content
        .into_iter()
        .map(|part| match part {
            MessageContent::Text(text) => MessagePart::Text(text.text.value),
            MessageContent::ImageFile(_) => MessagePart::NonText("image_file".to_string()),
            MessageContent::ImageUrl(_) => MessagePart::NonText("image_url".to_string()),
            #[allow(unreachable_patterns)]
            _ => MessagePart::NonText("other".to_string()),
        })
        .collect();

    let role = match message.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "assistant",
    };

    ThreadMessage {
        id: message.id,
        role: role.to_string(),
        parts,
    }
}

/// Maps SDK errors onto retry classes.
fn classify(err: OpenAIError) -> BackendError {
    match err {
        OpenAIError::Reqwest(e) => BackendError::network(e.to_string()),
        OpenAIError::ApiError(api) => {
            let kind = api.r#type.as_deref().unwrap_or_default();
            let code = api.code.as_deref().unwrap_or_default();
            match (kind, code) {
                (_, "rate_limit_exceeded") => BackendError::rate_limit(api.message),
                (_, "invalid_api_key") | ("authentication_error", _) => {
                    BackendError::auth(api.message)
                }
                ("server_error", _) => BackendError::server(api.message),
                ("invalid_request_error", _) => BackendError::invalid_request(api.message),
                _ => BackendError::unknown(api.message),
            }
        }
        OpenAIError::JSONDeserialize(e) => BackendError::decode(e.to_string()),
        OpenAIError::InvalidArgument(message) => BackendError::invalid_request(message),
        other => BackendError::unknown(other.to_string()),
    }
}
