//! In-process reference registry used for population.
//!
//! Maps a resolve action such as `accounts.resolve` to the entity service
//! that answers it, so one service can populate references to another
//! without knowing its type.
use async_trait::async_trait;
use kanban_entity::{EntityError, EntityResult, EntityService, ReferenceResolver, RequestContext};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
pub struct LocalReferences {
    services: RwLock<HashMap<String, Arc<EntityService>>>,
}

impl LocalReferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, action: impl Into<String>, service: Arc<EntityService>) {
        if let Ok(mut services) = self.services.write() {
            services.insert(action.into(), service);
        }
    }

    fn lookup(&self, action: &str) -> Option<Arc<EntityService>> {
        self.services
            .read()
            .ok()
            .and_then(|services| services.get(action).cloned())
    }
}

#[async_trait]
impl ReferenceResolver for LocalReferences {
    async fn resolve_by_ids(
        &self,
        action: &str,
        ids: &[String],
        params: &Map<String, Value>,
        ctx: &RequestContext,
    ) -> EntityResult<HashMap<String, Value>> {
        let service = self
            .lookup(action)
            .ok_or_else(|| EntityError::Resolution(format!("no service registered for `{action}`")))?;
        tracing::debug!(action, ids = ids.len(), "resolving references");
        service.resolve_by_ids(ctx, ids, params).await
    }
}
