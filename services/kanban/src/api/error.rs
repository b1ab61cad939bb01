//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error response construction and maps pipeline and
//! authorization errors onto statuses with stable codes.
//!
//! # Key invariants and assumptions
//! - Error responses include a stable `code` and human-readable `message`.
//! - Access denials never reveal whether the target exists.
//!
//! # Security considerations
//! - Internal errors log details server-side but return generic messages.
use crate::api::types::ErrorResponse;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use kanban_authz::AuthzError;
use kanban_entity::EntityError;

/// Structured API error returned by handlers.
///
/// # Example
/// ```rust
/// use axum::http::StatusCode;
/// use kanban::api::error::api_not_found;
///
/// let err = api_not_found("board not found");
/// assert_eq!(err.status, StatusCode::NOT_FOUND);
/// assert_eq!(err.body.code, "ENTITY_NOT_FOUND");
/// ```
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            field: None,
            request_id: None,
        },
    }
}

pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "ENTITY_NOT_FOUND", message)
}

pub fn api_forbidden(message: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, "ACCESS_DENIED", message)
}

pub fn api_conflict(code: &str, message: &str) -> ApiError {
    api_error(StatusCode::CONFLICT, code, message)
}

/// 422 when the failure names a field, 400 otherwise.
pub fn api_validation_error(field: Option<&str>, message: &str) -> ApiError {
    let status = if field.is_some() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::BAD_REQUEST
    };
    let mut err = api_error(status, "VALIDATION_ERROR", message);
    err.body.field = field.map(str::to_string);
    err
}

/// Build a 500 error, logging the cause server-side only.
pub fn api_internal(code: &str, message: &str, err: &impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %err, code, "{message}");
    api_error(StatusCode::INTERNAL_SERVER_ERROR, code, message)
}

impl From<EntityError> for ApiError {
    fn from(err: EntityError) -> Self {
        match &err {
            EntityError::AccessDenied(action) => api_forbidden(&format!("access denied: {action}")),
            EntityError::Validation { field, message } => {
                api_validation_error(field.as_deref(), message)
            }
            EntityError::NotFound { entity, .. } => api_not_found(&format!("{entity} not found")),
            EntityError::Resolution(_) => {
                api_internal(err.code(), "failed to resolve references", &err)
            }
            EntityError::Schema { .. } => api_internal(err.code(), "entity schema error", &err),
            EntityError::Storage(_) => api_internal(err.code(), "storage unavailable", &err),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match &err {
            AuthzError::RoleNotFound(_) => api_not_found("role not found"),
            AuthzError::Conflict(_) => api_conflict("CONFLICT", &err.to_string()),
            AuthzError::InvalidPermission(_) => {
                api_validation_error(Some("permission"), &err.to_string())
            }
            AuthzError::Store(_) => api_internal("STORAGE_ERROR", "role store unavailable", &err),
        }
    }
}
