use tracing::info;

use crate::backend::AssistantBackend;
use crate::error::RunError;

/// Returns the text of the newest message in the thread.
pub async fn extract_latest<B>(backend: &B, thread_id: &str) -> Result<String, RunError>
where
    B: AssistantBackend + ?Sized,
{
    let message = backend
        .latest_message(thread_id)
        .await?
        .ok_or(RunError::EmptyThread)?;

    let text = message
        .first_text()
        .ok_or_else(|| RunError::NoTextContent {
            message_id: message.id.clone(),
        })?
        .to_string();

    info!(thread_id, message_id = %message.id, role = %message.role, "Assistant: {}", text);
    Ok(text)
}
