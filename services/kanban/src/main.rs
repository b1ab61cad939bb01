//! Board service entry point.
//!
//! # Purpose
//! Wires configuration, observability and application state, then serves the
//! HTTP API until ctrl-c.
use kanban::app::{AppState, build_router};
use kanban::config::KanbanConfig;
use kanban::observability;
use std::future::Future;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = KanbanConfig::from_env_or_yaml()?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: KanbanConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("kanban");
    let state = AppState::from_config(&config).await?;
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, "kanban listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {
            tracing::info!("shutdown requested");
        }
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanban_entity::PaginationConfig;
    use std::time::Duration;

    fn local_config() -> KanbanConfig {
        KanbanConfig {
            bind_addr: "127.0.0.1:0".parse().expect("bind"),
            metrics_bind: "127.0.0.1:0".parse().expect("metrics"),
            admin_role: Some("administrator".to_string()),
            permission_cache_ttl: Duration::from_secs(60),
            pagination: PaginationConfig::default(),
            secure_ids: true,
        }
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let result = run_with_shutdown(local_config(), async {}).await;
        assert!(result.is_ok());
    }
}
