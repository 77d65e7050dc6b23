use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use navigator_core::{RunError, SessionError};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

// Input: what the web app sends us
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: Option<String>,
    // Optional key isolating this caller's thread from the shared default
    pub conversation: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Failures of the query endpoint, mapped to HTTP statuses.
#[derive(Debug)]
pub enum ApiError {
    MissingQuery,
    Run(RunError),
    Session(SessionError),
}

impl From<RunError> for ApiError {
    fn from(e: RunError) -> Self {
        Self::Run(e)
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        Self::Session(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingQuery => (StatusCode::BAD_REQUEST, "query is required".to_string()),
            ApiError::Run(e @ RunError::Timeout { .. }) => {
                warn!(error = %e, "Query timed out");
                (StatusCode::GATEWAY_TIMEOUT, e.to_string())
            }
            ApiError::Run(e) => {
                error!(error = %e, "Query failed");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            ApiError::Session(e @ SessionError::PoolFull { .. }) => {
                warn!(error = %e, "Refused new conversation");
                (StatusCode::TOO_MANY_REQUESTS, e.to_string())
            }
            ApiError::Session(e) => {
                error!(error = %e, "Could not open conversation");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
        };
        (status, Json(ErrorResponse { message })).into_response()
    }
}
