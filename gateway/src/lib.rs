//! HTTP front door for the navigator assistant.

pub mod api;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use navigator_core::{
    AssistantBackend, ConversationSession, PollPolicy, RunDriver, SessionPool, ToolExecutor,
};
use std::sync::Arc;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::api::{ApiError, QueryRequest};

pub type Backend = Arc<dyn AssistantBackend>;
pub type Tools = Arc<dyn ToolExecutor>;

// Shared by every request: the driver (backend + tools) and the conversations
#[derive(Clone)]
pub struct AppState {
    driver: Arc<RunDriver<Backend, Tools>>,
    sessions: Arc<SessionPool<Backend>>,
}

impl AppState {
    pub fn new(
        backend: Backend,
        tools: Tools,
        default_session: ConversationSession,
        policy: PollPolicy,
        max_conversations: usize,
    ) -> Self {
        let sessions = SessionPool::new(backend.clone(), default_session, max_conversations);
        Self {
            driver: Arc::new(RunDriver::new(backend, tools, policy)),
            sessions: Arc::new(sessions),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api", get(greeting))
        .route("/api/ai", post(submit_query))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// --- HANDLERS ---

async fn health_check() -> &'static str {
    "Navigator Gateway: Operational"
}

async fn greeting() -> &'static str {
    "Hello from the navigator!"
}

// Runs one query to completion and returns the reply as a bare JSON string
async fn submit_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<String>, ApiError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            info!(reason = %rejection.body_text(), "Rejected query body");
            return Err(ApiError::MissingQuery);
        }
    };

    let query = match request.query.as_deref() {
        Some(query) if !query.is_empty() => query,
        _ => return Err(ApiError::MissingQuery),
    };

    let handle = state.sessions.session(request.conversation.as_deref()).await?;
    // One run at a time per conversation
    let session = handle.lock().await;
    let reply = state.driver.run_query(&session, query).await?;

    Ok(Json(reply))
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
