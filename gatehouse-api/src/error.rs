/// Error handling for the API server
///
/// Transport-level failures (no session, wrong account, unparseable body,
/// internal faults) become `{"status": "error", "message": ...}` with a
/// matching HTTP status. Business-rule failures are not errors; they travel
/// as `fail` envelopes (see [`crate::envelope`]).
///
/// # Example
///
/// ```
/// use gatehouse_api::error::{ApiError, ApiResult};
///
/// fn find(id: &str) -> ApiResult<()> {
///     Err(ApiError::NotFound(format!("No such thing: {}", id)))
/// }
/// ```

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gatehouse_shared::{
    auth::authorization::AuthzError,
    lifecycle::LifecycleError,
    store::StoreError,
};
use serde::{Deserialize, Serialize};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized (401): no session, or the session needs re-authentication
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Method not allowed (405); also used for bodies that aren't the expected JSON
    #[error("Wrong data")]
    WrongData,

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `"error"`
    pub status: String,

    /// Human-readable error message
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::WrongData => (StatusCode::METHOD_NOT_ALLOWED, "Wrong data.".to_string()),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            status: "error".to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected request body");
        ApiError::WrongData
    }
}

/// Convert authorization errors to API errors
impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotAuthenticated | AuthzError::ReauthRequired => {
                ApiError::Unauthorized(err.to_string())
            }
            AuthzError::AlreadyAuthenticated | AuthzError::NotOwner => {
                ApiError::Forbidden(err.to_string())
            }
            AuthzError::InsufficientRole { .. } => {
                ApiError::Forbidden("Insufficient permissions".to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::InternalError(format!("Store error: {}", err))
    }
}

/// Convert lifecycle errors to API errors
impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Authz(e) => e.into(),
            LifecycleError::Store(e) => e.into(),
            LifecycleError::Credential(e) => {
                ApiError::InternalError(format!("Credential operation failed: {}", e))
            }
        }
    }
}
