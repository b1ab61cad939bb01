//! Role records and permission-string validation.
//!
//! # Purpose
//! Defines the persisted role shape: a uniquely named bundle of permission
//! patterns plus the names of roles it inherits from.
//!
//! # Key invariants
//! - `name` is unique across the store and is the join key for inheritance
//!   and for caller role lists.
//! - `permissions` never holds duplicates; mutations keep it that way.
//! - `inherits` is expected to be acyclic but is not required to be; the
//!   resolver tolerates cycles.
use crate::matcher::{DEEP_WILDCARD, SEGMENT_SEPARATOR};
use crate::{AuthzError, AuthzResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoleStatus {
    #[default]
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub inherits: Vec<String>,
    #[serde(default)]
    pub status: RoleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Build an active role with a fresh id and no permissions.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            name: name.into(),
            description: None,
            permissions: Vec::new(),
            inherits: Vec::new(),
            status: RoleStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replace_permissions(permissions.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_inherits<I, S>(mut self, inherits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inherits = dedup(inherits.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == RoleStatus::Active
    }

    /// Add a permission if absent. Returns whether the set changed.
    pub fn grant(&mut self, permission: &str) -> bool {
        if self.permissions.iter().any(|owned| owned == permission) {
            return false;
        }
        self.permissions.push(permission.to_string());
        true
    }

    /// Remove a permission if present. Returns whether the set changed.
    pub fn revoke(&mut self, permission: &str) -> bool {
        let before = self.permissions.len();
        self.permissions.retain(|owned| owned != permission);
        before != self.permissions.len()
    }

    /// Replace the permission set, dropping duplicates but keeping order.
    pub fn replace_permissions(&mut self, permissions: Vec<String>) {
        self.permissions = dedup(permissions);
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Reject permission strings that could never match anything sensible.
///
/// Accepted: non-empty, no whitespace, no empty segments, and `**` only as
/// the final segment.
pub fn validate_permission(permission: &str) -> AuthzResult<()> {
    let invalid = || AuthzError::InvalidPermission(permission.to_string());
    if permission.is_empty() || permission.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let segments: Vec<&str> = permission.split(SEGMENT_SEPARATOR).collect();
    let last = segments.len() - 1;
    for (idx, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            return Err(invalid());
        }
        if *segment == DEEP_WILDCARD && idx != last {
            return Err(invalid());
        }
        if segment.contains('*') && *segment != "*" && *segment != DEEP_WILDCARD {
            return Err(invalid());
        }
    }
    Ok(())
}

pub(crate) fn dedup(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(values.len());
    values
        .into_iter()
        .filter(|value| seen.insert(value.clone()))
        .collect()
}
