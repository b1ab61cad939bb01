//! OpenAPI schema aggregation for the board service API.
use crate::api::{
    accounts, boards, rbac, system,
    types::{
        AccessResponse, AssignPermissionRequest, BoardListResponse, CanRequest, ErrorResponse,
        HasAccessRequest, HealthStatus, RoleListResponse, RoleView, SyncPermissionsRequest,
    },
};
use axum::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "kanban",
        version = "v1",
        description = "Board service HTTP API with role-based access checks"
    ),
    paths(
        system::system_health,
        rbac::can,
        rbac::has_access,
        rbac::list_roles,
        rbac::assign_permission,
        rbac::revoke_permission,
        rbac::sync_permissions,
        boards::list_boards,
        boards::create_board,
        boards::get_board,
        boards::patch_board,
        boards::delete_board,
        accounts::create_account
    ),
    components(schemas(
        HealthStatus,
        ErrorResponse,
        CanRequest,
        HasAccessRequest,
        AccessResponse,
        AssignPermissionRequest,
        SyncPermissionsRequest,
        RoleView,
        RoleListResponse,
        BoardListResponse
    )),
    tags(
        (name = "system", description = "Service health"),
        (name = "rbac", description = "Permission checks and role administration"),
        (name = "boards", description = "Board CRUD"),
        (name = "accounts", description = "Accounts referenced by boards")
    )
)]
pub struct ApiDoc;

pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
