use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{info, warn};

use crate::backend::AssistantBackend;
use crate::error::SessionError;
use crate::registry::ToolDefinition;

/// Key of the conversation opened at start-up.
pub const DEFAULT_CONVERSATION: &str = "default";

/// An assistant persona paired with an open thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSession {
    pub assistant_id: String,
    pub thread_id: String,
}

impl ConversationSession {
    /// Creates the assistant and its first thread. Any failure here is
    /// meant to abort start-up; nothing is retried.
    pub async fn initialize<B>(
        backend: &B,
        persona_name: &str,
        persona_instructions: &str,
        tools: &[ToolDefinition],
    ) -> Result<Self, SessionError>
    where
        B: AssistantBackend + ?Sized,
    {
        let assistant_id = backend
            .create_assistant(persona_name, persona_instructions, tools)
            .await
            .map_err(|source| SessionError::Assistant {
                name: persona_name.to_string(),
                source,
            })?;
        let thread_id = backend.create_thread().await.map_err(SessionError::Thread)?;

        info!(%assistant_id, %thread_id, tools = tools.len(), "Assistant initialized");
        Ok(Self {
            assistant_id,
            thread_id,
        })
    }
}

/// Exclusive access to one conversation. Holding the lock serializes runs
/// on that thread.
pub type SessionHandle = Arc<Mutex<ConversationSession>>;

// Filled once the conversation's thread exists
type Slot = Arc<OnceCell<SessionHandle>>;

/// Conversations keyed by caller-chosen names, all sharing one assistant.
/// Threads for new keys are opened on first use, up to `max_conversations`
/// (the default conversation included).
pub struct SessionPool<B> {
    backend: B,
    assistant_id: String,
    max_conversations: usize,
    sessions: Mutex<HashMap<String, Slot>>,
}

impl<B: AssistantBackend> SessionPool<B> {
    pub fn new(backend: B, default_session: ConversationSession, max_conversations: usize) -> Self {
        let assistant_id = default_session.assistant_id.clone();
        let default_handle: SessionHandle = Arc::new(Mutex::new(default_session));
        let mut sessions = HashMap::new();
        sessions.insert(
            DEFAULT_CONVERSATION.to_string(),
            Arc::new(OnceCell::new_with(Some(default_handle))),
        );
        Self {
            backend,
            assistant_id,
            max_conversations: max_conversations.max(1),
            sessions: Mutex::new(sessions),
        }
    }

    /// Returns the session for `key`, or the default one when `key` is `None`.
    ///
    /// The pool lock is only held to find or reserve the key's slot. Opening
    /// the thread happens outside it, so a slow open never stalls other keys.
    pub async fn session(&self, key: Option<&str>) -> Result<SessionHandle, SessionError> {
        let key = key.unwrap_or(DEFAULT_CONVERSATION);
        let slot = self.slot(key).await?;

        let opened = slot
            .get_or_try_init(|| async {
                let thread_id = self
                    .backend
                    .create_thread()
                    .await
                    .map_err(SessionError::Thread)?;
                info!(conversation = key, %thread_id, "Opened conversation thread");

                Ok::<_, SessionError>(Arc::new(Mutex::new(ConversationSession {
                    assistant_id: self.assistant_id.clone(),
                    thread_id,
                })))
            })
            .await;

        match opened {
            Ok(handle) => Ok(handle.clone()),
            Err(e) => {
                // Free the reserved slot so the key can be retried and does
                // not count against the cap
                let mut sessions = self.sessions.lock().await;
                if sessions
                    .get(key)
                    .is_some_and(|current| Arc::ptr_eq(current, &slot) && current.get().is_none())
                {
                    sessions.remove(key);
                }
                Err(e)
            }
        }
    }

    async fn slot(&self, key: &str) -> Result<Slot, SessionError> {
        let mut sessions = self.sessions.lock().await;
        if let Some(slot) = sessions.get(key) {
            return Ok(slot.clone());
        }
        if sessions.len() >= self.max_conversations {
            warn!(conversation = key, limit = self.max_conversations, "Conversation limit reached");
            return Err(SessionError::PoolFull {
                limit: self.max_conversations,
            });
        }
        let slot: Slot = Arc::new(OnceCell::new());
        sessions.insert(key.to_string(), slot.clone());
        Ok(slot)
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
