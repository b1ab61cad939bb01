//! Board API handlers.
//!
//! # Purpose
//! Thin HTTP wrappers over the board `EntityService`: query strings become
//! raw queries, headers become the caller context, and the service does
//! access checks, validation, population and field filtering.
use crate::api::{caller_context, object_body};
use crate::api::error::{ApiError, api_validation_error};
use crate::api::types::BoardListResponse;
use crate::app::AppState;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use kanban_entity::{ListResult, RawQuery};
use serde_json::Value;

fn raw_query(pairs: Vec<(String, String)>) -> Result<RawQuery, ApiError> {
    RawQuery::from_pairs(pairs).map_err(|message| api_validation_error(None, &message))
}

#[utoipa::path(
    get,
    path = "/v1/boards",
    tag = "boards",
    params(
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("pageSize" = Option<u64>, Query, description = "Rows per page"),
        ("sort" = Option<String>, Query, description = "Comma-separated fields; prefix `-` for descending"),
        ("fields" = Option<String>, Query, description = "Comma-separated fields to return"),
        ("populate" = Option<String>, Query, description = "Comma-separated reference fields to expand"),
        ("search" = Option<String>, Query, description = "Case-insensitive substring search")
    ),
    responses(
        (status = 200, description = "One page of boards", body = BoardListResponse),
        (status = 403, description = "Caller may not list boards", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Filter or sort on a field the caller cannot read", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn list_boards(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<ListResult>, ApiError> {
    let ctx = caller_context(&headers);
    let raw = raw_query(pairs)?;
    Ok(Json(state.boards.list(&ctx, &raw).await?))
}

#[utoipa::path(
    post,
    path = "/v1/boards",
    tag = "boards",
    responses(
        (status = 201, description = "Board created"),
        (status = 403, description = "Caller may not create boards", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Field validation failed", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_board(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = caller_context(&headers);
    let params = object_body(body)?;
    let board = state.boards.create(&ctx, &params).await?;
    Ok((StatusCode::CREATED, Json(board)))
}

#[utoipa::path(
    get,
    path = "/v1/boards/{board_id}",
    tag = "boards",
    params(
        ("board_id" = String, Path, description = "Public board identifier"),
        ("fields" = Option<String>, Query, description = "Comma-separated fields to return"),
        ("populate" = Option<String>, Query, description = "Comma-separated reference fields to expand")
    ),
    responses(
        (status = 200, description = "Board"),
        (status = 403, description = "Caller may not read boards", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Board not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn get_board(
    Path(board_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Value>, ApiError> {
    let ctx = caller_context(&headers);
    let raw = raw_query(pairs)?;
    Ok(Json(state.boards.get(&ctx, &board_id, &raw).await?))
}

#[utoipa::path(
    patch,
    path = "/v1/boards/{board_id}",
    tag = "boards",
    params(
        ("board_id" = String, Path, description = "Public board identifier")
    ),
    responses(
        (status = 200, description = "Board after the update"),
        (status = 403, description = "Caller may not update boards", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Board not found", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Field validation failed", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn patch_board(
    Path(board_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let ctx = caller_context(&headers);
    let changes = object_body(body)?;
    Ok(Json(state.boards.update(&ctx, &board_id, &changes).await?))
}

#[utoipa::path(
    delete,
    path = "/v1/boards/{board_id}",
    tag = "boards",
    params(
        ("board_id" = String, Path, description = "Public board identifier")
    ),
    responses(
        (status = 200, description = "Board as it was before removal"),
        (status = 403, description = "Caller may not remove boards", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Board not found", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn delete_board(
    Path(board_id): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let ctx = caller_context(&headers);
    Ok(Json(state.boards.remove(&ctx, &board_id).await?))
}
