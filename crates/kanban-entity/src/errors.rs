use kanban_authz::AuthzError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EntityError {
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("validation failed: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },
    #[error("resolution failed: {0}")]
    Resolution(String),
    #[error("invalid schema for {entity}: {message}")]
    Schema { entity: String, message: String },
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type EntityResult<T> = Result<T, EntityError>;

impl EntityError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        EntityError::Validation {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        EntityError::Validation {
            field: None,
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        EntityError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            EntityError::AccessDenied(_) => "ACCESS_DENIED",
            EntityError::Validation { .. } => "VALIDATION_ERROR",
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::Resolution(_) => "RESOLUTION_FAILURE",
            EntityError::Schema { .. } => "SCHEMA_ERROR",
            EntityError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Errors caused by the caller's input or permissions.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            EntityError::AccessDenied(_)
                | EntityError::Validation { .. }
                | EntityError::NotFound { .. }
        )
    }
}

impl From<AuthzError> for EntityError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::InvalidPermission(permission) => {
                EntityError::validation("permission", format!("invalid permission `{permission}`"))
            }
            other => {
                tracing::error!(error = %other, "permission resolution failed");
                EntityError::Resolution(other.to_string())
            }
        }
    }
}
