//! Role-based access control API handlers.
//!
//! # Purpose
//! Exposes the permission checks other services call before acting, and the
//! role permission mutations used by administrators.
//!
//! # Key invariants and assumptions
//! - `can` and `has-access` answer for the roles in the body, not the caller.
//! - Mutations require the caller to pass `roles.update`; listing requires
//!   `roles.list`. Both honor the administrator bypass.
//! - Every successful mutation invalidates the permission cache before the
//!   response is sent.
use crate::api::error::ApiError;
use crate::api::types::{
    AccessResponse, AssignPermissionRequest, CanRequest, HasAccessRequest, RoleListResponse,
    RoleView, SyncPermissionsRequest,
};
use crate::api::{caller_context, require_access};
use crate::app::AppState;
use crate::model::{ROLES_LIST, ROLES_UPDATE};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;

#[utoipa::path(
    post,
    path = "/v1/rbac/can",
    tag = "rbac",
    request_body = CanRequest,
    responses(
        (status = 200, description = "Whether the roles grant the permission", body = AccessResponse)
    )
)]
pub(crate) async fn can(
    State(state): State<AppState>,
    Json(body): Json<CanRequest>,
) -> Result<Json<AccessResponse>, ApiError> {
    let allowed = state.resolver.can(&body.roles, &body.permission).await?;
    Ok(Json(AccessResponse { allowed }))
}

#[utoipa::path(
    post,
    path = "/v1/rbac/has-access",
    tag = "rbac",
    request_body = HasAccessRequest,
    responses(
        (status = 200, description = "Whether any item passes for the roles", body = AccessResponse)
    )
)]
pub(crate) async fn has_access(
    State(state): State<AppState>,
    Json(body): Json<HasAccessRequest>,
) -> Result<Json<AccessResponse>, ApiError> {
    let allowed = state
        .resolver
        .has_access(&body.roles, body.items.as_slice())
        .await?;
    Ok(Json(AccessResponse { allowed }))
}

#[utoipa::path(
    get,
    path = "/v1/rbac/roles",
    tag = "rbac",
    responses(
        (status = 200, description = "All roles", body = RoleListResponse),
        (status = 403, description = "Caller may not list roles", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_roles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RoleListResponse>, ApiError> {
    let ctx = caller_context(&headers);
    require_access(&state, &ctx, &[ROLES_LIST, ROLES_UPDATE]).await?;
    let items = state
        .resolver
        .list_roles()
        .await?
        .into_iter()
        .map(RoleView::from)
        .collect();
    Ok(Json(RoleListResponse { items }))
}

#[utoipa::path(
    post,
    path = "/v1/rbac/roles/{role_id}/permissions",
    tag = "rbac",
    params(
        ("role_id" = String, Path, description = "Role identifier")
    ),
    request_body = AssignPermissionRequest,
    responses(
        (status = 200, description = "Role after the grant", body = RoleView),
        (status = 403, description = "Caller may not update roles", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Malformed permission", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn assign_permission(
    Path(role_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AssignPermissionRequest>,
) -> Result<Json<RoleView>, ApiError> {
    let ctx = caller_context(&headers);
    require_access(&state, &ctx, &[ROLES_UPDATE]).await?;
    let role = state
        .resolver
        .assign_permission(&role_id, &body.permission)
        .await?;
    Ok(Json(role.into()))
}

#[utoipa::path(
    delete,
    path = "/v1/rbac/roles/{role_id}/permissions/{permission}",
    tag = "rbac",
    params(
        ("role_id" = String, Path, description = "Role identifier"),
        ("permission" = String, Path, description = "Permission to revoke")
    ),
    responses(
        (status = 200, description = "Role after the revoke", body = RoleView),
        (status = 403, description = "Caller may not update roles", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn revoke_permission(
    Path((role_id, permission)): Path<(String, String)>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RoleView>, ApiError> {
    let ctx = caller_context(&headers);
    require_access(&state, &ctx, &[ROLES_UPDATE]).await?;
    let role = state.resolver.revoke_permission(&role_id, &permission).await?;
    Ok(Json(role.into()))
}

#[utoipa::path(
    put,
    path = "/v1/rbac/roles/{role_id}/permissions",
    tag = "rbac",
    params(
        ("role_id" = String, Path, description = "Role identifier")
    ),
    request_body = SyncPermissionsRequest,
    responses(
        (status = 200, description = "Role with the replaced permission set", body = RoleView),
        (status = 403, description = "Caller may not update roles", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Role not found", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Malformed permission", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn sync_permissions(
    Path(role_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SyncPermissionsRequest>,
) -> Result<Json<RoleView>, ApiError> {
    let ctx = caller_context(&headers);
    require_access(&state, &ctx, &[ROLES_UPDATE]).await?;
    let role = state
        .resolver
        .sync_permissions(&role_id, body.permissions)
        .await?;
    Ok(Json(role.into()))
}
