//! Account API handlers. Accounts are created here and read only through
//! board population.
use crate::api::error::ApiError;
use crate::api::{caller_context, object_body};
use crate::app::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde_json::Value;

#[utoipa::path(
    post,
    path = "/v1/accounts",
    tag = "accounts",
    responses(
        (status = 201, description = "Account created"),
        (status = 403, description = "Caller may not create accounts", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Field validation failed", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn create_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, ApiError> {
    let ctx = caller_context(&headers);
    let params = object_body(body)?;
    let account = state.accounts.create(&ctx, &params).await?;
    Ok((StatusCode::CREATED, Json(account)))
}
