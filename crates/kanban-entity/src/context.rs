//! Per-request caller context.
//!
//! Produced by the upstream authenticator and read-only to the pipeline.
use serde_json::{Map, Value};

/// Pseudo-role held by every caller.
pub const EVERYONE_ROLE: &str = "$everyone";
/// Pseudo-role held by every caller with a user id.
pub const AUTHENTICATED_ROLE: &str = "$authenticated";

#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub roles: Vec<String>,
    pub user_id: Option<String>,
    /// Free-form values for hooks, e.g. the tenant of the request.
    pub locals: Map<String, Value>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self {
            roles: vec![EVERYONE_ROLE.to_string()],
            ..Self::default()
        }
    }

    /// Caller with a user id. Pseudo-roles come first; duplicates are dropped.
    pub fn authenticated<I, S>(user_id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all = vec![EVERYONE_ROLE.to_string(), AUTHENTICATED_ROLE.to_string()];
        for role in roles {
            let role = role.into();
            if !all.contains(&role) {
                all.push(role);
            }
        }
        Self {
            roles: all,
            user_id: Some(user_id.into()),
            locals: Map::new(),
        }
    }

    pub fn with_local(mut self, key: impl Into<String>, value: Value) -> Self {
        self.locals.insert(key.into(), value);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_has_everyone_only() {
        let ctx = RequestContext::anonymous();
        assert_eq!(ctx.roles, vec![EVERYONE_ROLE.to_string()]);
        assert!(!ctx.is_authenticated());
    }

    #[test]
    fn authenticated_prepends_pseudo_roles_once() {
        let ctx = RequestContext::authenticated("u1", ["manager", "$everyone", "manager"]);
        assert_eq!(ctx.roles, vec!["$everyone", "$authenticated", "manager"]);
        assert_eq!(ctx.user_id.as_deref(), Some("u1"));
    }
}
