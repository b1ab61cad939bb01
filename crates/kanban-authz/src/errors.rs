use crate::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("role not found: {0}")]
    RoleNotFound(String),
    #[error("role conflict: {0}")]
    Conflict(String),
    #[error("invalid permission: {0}")]
    InvalidPermission(String),
    #[error("role store failure: {0}")]
    Store(#[source] StoreError),
}

pub type AuthzResult<T> = Result<T, AuthzError>;

impl From<StoreError> for AuthzError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AuthzError::RoleNotFound(what),
            StoreError::Conflict(what) => AuthzError::Conflict(what),
            other => AuthzError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_variants() {
        let errors = vec![
            AuthzError::RoleNotFound("r1".to_string()),
            AuthzError::Conflict("boards-admin".to_string()),
            AuthzError::InvalidPermission("boards..create".to_string()),
            AuthzError::Store(StoreError::Unexpected(anyhow::anyhow!("boom"))),
        ];

        for error in errors {
            let rendered = error.to_string();
            assert!(!rendered.is_empty());
        }
    }

    #[test]
    fn store_errors_map_to_authz_variants() {
        let err: AuthzError = StoreError::NotFound("r1".into()).into();
        assert!(matches!(err, AuthzError::RoleNotFound(id) if id == "r1"));

        let err: AuthzError = StoreError::Conflict("dup".into()).into();
        assert!(matches!(err, AuthzError::Conflict(_)));

        let err: AuthzError = StoreError::Unexpected(anyhow::anyhow!("io")).into();
        assert!(matches!(err, AuthzError::Store(_)));
    }
}
