//! Navigator core: drives assistant runs on a hosted assistant service and
//! resolves the tool calls those runs request.

pub mod backend;
pub mod config;
pub mod error;
pub mod extract;
pub mod llm;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use backend::{AssistantBackend, ToolExecutor};
pub use config::{NavigatorConfig, PersonaConfig};
pub use error::{BackendError, BackendErrorKind, RegistryError, RunError, SessionError};
pub use extract::extract_latest;
pub use llm::OpenAiBackend;
pub use registry::{Registry, ToolDefinition};
pub use runtime::{Backoff, PollPolicy, RunDriver};
pub use session::{ConversationSession, SessionHandle, SessionPool, DEFAULT_CONVERSATION};
pub use types::{
    MessagePart, RunSnapshot, RunState, ThreadMessage, ToolCallRequest, ToolCallResult,
    ToolOutcome,
};
