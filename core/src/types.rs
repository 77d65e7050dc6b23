use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// A tool invocation requested by a paused run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
}

impl ToolCallRequest {
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// Builds a request from the raw argument text the service sends.
    /// Text that is not valid JSON is kept as a JSON string so the
    /// dispatcher can reject it for this call alone.
    pub fn from_raw_arguments(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        raw: &str,
    ) -> Self {
        let arguments =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        Self::new(call_id, tool_name, arguments)
    }
}

/// Output for one tool call, correlated by `call_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub call_id: String,
    pub output: String,
}

/// What a tool produced. Failures are data so one bad call never aborts
/// the rest of its batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(Value),
    Failure { message: String },
}

impl ToolOutcome {
    pub fn success(payload: impl Into<Value>) -> Self {
        Self::Success(payload.into())
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
        }
    }

    /// Acknowledgment object in the `{success, message}` shape.
    pub fn acknowledged(message: impl Into<String>) -> Self {
        Self::Success(json!({ "success": true, "message": message.into() }))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Renders the payload as the string submitted back to the run.
    /// Bare strings are passed through unquoted.
    pub fn render(&self) -> String {
        match self {
            Self::Success(Value::String(text)) => text.clone(),
            Self::Success(value) => value.to_string(),
            Self::Failure { message } => {
                json!({ "success": false, "message": message }).to_string()
            }
        }
    }
}

/// Run status as reported by the assistant service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Incomplete,
}

impl RunState {
    /// Still working on the service side; poll again later.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Queued | Self::InProgress | Self::Cancelling)
    }

    /// Ended without completing.
    pub fn is_terminal_failure(self) -> bool {
        matches!(
            self,
            Self::Failed | Self::Cancelled | Self::Expired | Self::Incomplete
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
            Self::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observation of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSnapshot {
    pub run_id: String,
    pub state: RunState,
    /// Populated only while `state` is `RequiresAction`.
    pub pending_tool_calls: Vec<ToolCallRequest>,
    pub last_error: Option<String>,
}

impl RunSnapshot {
    pub fn new(run_id: impl Into<String>, state: RunState) -> Self {
        Self {
            run_id: run_id.into(),
            state,
            pending_tool_calls: Vec::new(),
            last_error: None,
        }
    }

    pub fn with_tool_calls(mut self, calls: Vec<ToolCallRequest>) -> Self {
        self.pending_tool_calls = calls;
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.last_error = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessagePart {
    Text(String),
    /// Images, refusals, anything without a text body.
    NonText(String),
}

/// A message in a conversation thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadMessage {
    pub id: String,
    pub role: String,
    pub parts: Vec<MessagePart>,
}

impl ThreadMessage {
    pub fn first_text(&self) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            MessagePart::Text(text) => Some(text.as_str()),
            MessagePart::NonText(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_raw_arguments_survive_as_string() {
        let call = ToolCallRequest::from_raw_arguments("call_1", "navigateTo", "{route: /x");
        assert_eq!(call.arguments, Value::String("{route: /x".to_string()));

        let call = ToolCallRequest::from_raw_arguments("call_2", "navigateTo", r#"{"route":"/x"}"#);
        assert_eq!(call.arguments["route"], "/x");
    }

    #[test]
    fn render_passes_plain_strings_through() {
        assert_eq!(
            ToolOutcome::success("Navigated to /overview").render(),
            "Navigated to /overview"
        );
    }

    #[test]
    fn render_failure_uses_success_false_shape() {
        let rendered: Value = serde_json::from_str(&ToolOutcome::failure("Unknown tool").render()).unwrap();
        assert_eq!(rendered, json!({ "success": false, "message": "Unknown tool" }));
    }

    #[test]
    fn state_classification() {
        assert!(RunState::Queued.is_pending());
        assert!(RunState::Cancelling.is_pending());
        assert!(!RunState::RequiresAction.is_pending());
        assert!(RunState::Expired.is_terminal_failure());
        assert!(!RunState::Completed.is_terminal_failure());
    }

    #[test]
    fn first_text_skips_non_text_parts() {
        let message = ThreadMessage {
            id: "msg_1".into(),
            role: "assistant".into(),
            parts: vec![
                MessagePart::NonText("image_file".into()),
                MessagePart::Text("hello".into()),
            ],
        };
        assert_eq!(message.first_text(), Some("hello"));
    }
}
