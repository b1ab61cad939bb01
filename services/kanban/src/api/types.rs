//! HTTP API request/response types.
//!
//! # Purpose
//! Defines shared payload shapes for the board service REST API and OpenAPI
//! schema generation. Board documents are schema-driven maps and are
//! described as free-form objects.
use kanban_authz::{Role, RoleStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
    pub api_version: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    /// Offending field for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CanRequest {
    pub roles: Vec<String>,
    pub permission: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HasAccessRequest {
    pub roles: Vec<String>,
    /// Permissions (containing `.`) or role names; any one passing grants access.
    pub items: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct AccessResponse {
    pub allowed: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AssignPermissionRequest {
    pub permission: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SyncPermissionsRequest {
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoleView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub permissions: Vec<String>,
    pub inherits: Vec<String>,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Role> for RoleView {
    fn from(role: Role) -> Self {
        Self {
            active: role.status == RoleStatus::Active,
            id: role.id,
            name: role.name,
            description: role.description,
            permissions: role.permissions,
            inherits: role.inherits,
            created_at: role.created_at.to_rfc3339(),
            updated_at: role.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RoleListResponse {
    pub items: Vec<RoleView>,
}

/// OpenAPI shape of a board list page.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardListResponse {
    #[schema(value_type = Vec<Object>)]
    pub rows: Vec<Value>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}
