use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt::Display;

use crate::domain::DomainError;

/// Handler error: a `DomainError` rendered as `{ success: false, error }`.
///
/// `context` names the failing action and its target; it is logged with
/// every 5xx and never sent to the client.
#[derive(Debug)]
pub struct ApiError {
    pub error: DomainError,
    pub context: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        DomainError::Validation(message.into()).into()
    }

    pub fn status(&self) -> StatusCode {
        match &self.error {
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::Validation(_) | DomainError::Precondition(_) => StatusCode::BAD_REQUEST,
            DomainError::Conflict(_) => StatusCode::CONFLICT,
            DomainError::Upstream(_) | DomainError::Database(_) | DomainError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Line written to the log for a server-side failure
    pub fn log_line(&self) -> String {
        match &self.context {
            Some(context) => format!("{} failed: {}", context, self.error),
            None => self.error.to_string(),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        ApiError {
            error,
            context: None,
        }
    }
}

/// Attach the action and its target (reference or id) to a failing call
pub trait ErrorContext<T> {
    fn context(self, action: &str, target: impl Display) -> Result<T, ApiError>;
}

impl<T, E: Into<DomainError>> ErrorContext<T> for Result<T, E> {
    fn context(self, action: &str, target: impl Display) -> Result<T, ApiError> {
        self.map_err(|e| ApiError {
            error: e.into(),
            context: Some(format!("{} {}", action, target)),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.error.is_server_side() {
            tracing::error!("{}", self.log_line());
        }

        (
            status,
            Json(json!({
                "success": false,
                "error": self.error.to_string()
            })),
        )
            .into_response()
    }
}
