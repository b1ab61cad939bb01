//! Board service HTTP API module.
//!
//! # Purpose
//! Exposes route handler modules and the shared helpers that turn request
//! headers into a caller context and gate handlers on access items.
//!
//! # Security considerations
//! Caller identity arrives in `x-user-id` and `x-roles` set by the upstream
//! authenticator; the service never authenticates callers itself. Roles are
//! only honored together with a user id.
pub mod accounts;
pub mod boards;
pub mod error;
pub mod openapi;
pub mod rbac;
pub mod system;
pub mod types;

use crate::api::error::{ApiError, api_forbidden, api_validation_error};
use crate::app::AppState;
use axum::http::HeaderMap;
use kanban_entity::RequestContext;
use serde_json::{Map, Value};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const ROLES_HEADER: &str = "x-roles";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Build the caller context from upstream identity headers.
pub fn caller_context(headers: &HeaderMap) -> RequestContext {
    let Some(user_id) = header_value(headers, USER_ID_HEADER) else {
        return RequestContext::anonymous();
    };
    let roles: Vec<&str> = header_value(headers, ROLES_HEADER)
        .map(|roles| {
            roles
                .split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .collect()
        })
        .unwrap_or_default();
    RequestContext::authenticated(user_id, roles)
}

pub(crate) fn object_body(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(api_validation_error(None, "request body must be a JSON object")),
    }
}

/// Reject the request unless the caller passes one of `items`.
pub(crate) async fn require_access(
    state: &AppState,
    ctx: &RequestContext,
    items: &[&str],
) -> Result<(), ApiError> {
    if state.resolver.has_access(&ctx.roles, items).await? {
        return Ok(());
    }
    tracing::debug!(user_id = ?ctx.user_id, ?items, "access denied");
    Err(api_forbidden(&format!("access denied: {}", items.join(", "))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use kanban_entity::{AUTHENTICATED_ROLE, EVERYONE_ROLE};

    #[test]
    fn missing_user_is_anonymous() {
        let mut headers = HeaderMap::new();
        headers.insert(ROLES_HEADER, HeaderValue::from_static("administrator"));
        let ctx = caller_context(&headers);
        assert!(!ctx.is_authenticated());
        assert_eq!(ctx.roles, vec![EVERYONE_ROLE.to_string()]);
    }

    #[test]
    fn roles_are_split_and_trimmed() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("u1"));
        headers.insert(ROLES_HEADER, HeaderValue::from_static(" boards-admin, ,manager "));
        let ctx = caller_context(&headers);
        assert_eq!(ctx.user_id.as_deref(), Some("u1"));
        assert_eq!(
            ctx.roles,
            vec![
                EVERYONE_ROLE.to_string(),
                AUTHENTICATED_ROLE.to_string(),
                "boards-admin".to_string(),
                "manager".to_string(),
            ]
        );
    }
}
