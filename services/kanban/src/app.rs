//! Application state and router wiring.
//!
//! # Purpose
//! Builds the shared resolver and entity services from configuration, seeds
//! the built-in roles, and composes the HTTP router.
//!
//! # Notes
//! This module centralizes route composition to keep `main` small and testable.
use crate::api;
use crate::config::KanbanConfig;
use crate::model::{RESOLVE_ACTION, account_schema, board_schema, seed_roles};
use crate::references::LocalReferences;
use anyhow::Context;
use axum::Router;
use kanban_authz::{InMemoryRoleStore, PermissionResolver, ResolverConfig};
use kanban_entity::{Base64IdCodec, EntityPipeline, EntityService, MemoryAdapter};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub api_version: String,
    pub resolver: Arc<PermissionResolver>,
    pub boards: Arc<EntityService>,
    pub accounts: Arc<EntityService>,
}

impl AppState {
    /// Wire in-memory stores, seed roles and register reference resolvers.
    pub async fn from_config(config: &KanbanConfig) -> anyhow::Result<Self> {
        let resolver = Arc::new(PermissionResolver::new(
            Arc::new(InMemoryRoleStore::new()),
            ResolverConfig {
                admin_role: config.admin_role.clone(),
                cache_ttl: config.permission_cache_ttl,
            },
        ));
        for role in seed_roles(config.admin_role.as_deref()) {
            let name = role.name.clone();
            resolver
                .create_role(role)
                .await
                .with_context(|| format!("seed role {name}"))?;
        }

        let references = Arc::new(LocalReferences::new());
        let accounts = Arc::new(
            EntityService::new(
                EntityPipeline::new(account_schema()?, resolver.clone()),
                Arc::new(MemoryAdapter::new("_id")),
            )
            .with_pagination(config.pagination),
        );
        references.register(RESOLVE_ACTION, accounts.clone());

        let mut board_pipeline =
            EntityPipeline::new(board_schema(config.secure_ids)?, resolver.clone())
                .with_references(references);
        if config.secure_ids {
            board_pipeline = board_pipeline.with_codec(Arc::new(Base64IdCodec));
        }
        let boards = Arc::new(
            EntityService::new(board_pipeline, Arc::new(MemoryAdapter::new("_id")))
                .with_pagination(config.pagination),
        );

        let roles = resolver.list_roles().await?.len();
        tracing::info!(
            roles,
            secure_ids = config.secure_ids,
            "application state ready"
        );
        Ok(Self {
            api_version: "v1".to_string(),
            resolver,
            boards,
            accounts,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            )
        });

    Router::new()
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route(
            "/v1/openapi.json",
            axum::routing::get(api::openapi::openapi_json),
        )
        .route("/v1/rbac/can", axum::routing::post(api::rbac::can))
        .route(
            "/v1/rbac/has-access",
            axum::routing::post(api::rbac::has_access),
        )
        .route("/v1/rbac/roles", axum::routing::get(api::rbac::list_roles))
        .route(
            "/v1/rbac/roles/:role_id/permissions",
            axum::routing::post(api::rbac::assign_permission).put(api::rbac::sync_permissions),
        )
        .route(
            "/v1/rbac/roles/:role_id/permissions/:permission",
            axum::routing::delete(api::rbac::revoke_permission),
        )
        .route(
            "/v1/boards",
            axum::routing::get(api::boards::list_boards).post(api::boards::create_board),
        )
        .route(
            "/v1/boards/:board_id",
            axum::routing::get(api::boards::get_board)
                .patch(api::boards::patch_board)
                .delete(api::boards::delete_board),
        )
        .route(
            "/v1/accounts",
            axum::routing::post(api::accounts::create_account),
        )
        .layer(trace_layer)
        .with_state(state)
}
