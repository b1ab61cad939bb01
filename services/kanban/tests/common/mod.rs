use kanban::app::AppState;
use kanban::config::KanbanConfig;
use kanban_entity::PaginationConfig;
use std::time::Duration;

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

pub fn test_config() -> KanbanConfig {
    KanbanConfig {
        bind_addr: "127.0.0.1:0".parse().expect("bind"),
        metrics_bind: "127.0.0.1:0".parse().expect("metrics"),
        admin_role: Some("administrator".to_string()),
        permission_cache_ttl: Duration::from_secs(60),
        pagination: PaginationConfig::default(),
        secure_ids: true,
    }
}

pub async fn test_state() -> AppState {
    AppState::from_config(&test_config()).await.expect("state")
}
