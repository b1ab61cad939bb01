//! In-memory implementation of the role store.
//!
//! # Purpose
//! Keeps role records in a `HashMap` guarded by `tokio::sync::RwLock`. Used by
//! tests, local development, and deployments that seed roles at startup.
//!
//! # Durability and consistency
//! - **Not durable**: roles are lost on restart.
//! - Writes take the write lock for the whole check-then-write sequence, so
//!   name uniqueness and read-modify-write updates are atomic within a process.
use super::{RoleMutation, RoleStore, StoreError, StoreResult};
use crate::Role;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryRoleStore {
    /// Role records keyed by `id`.
    roles: Arc<RwLock<HashMap<String, Role>>>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with `roles`. Later duplicates by name win.
    pub fn with_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        let mut by_name: HashMap<String, Role> = HashMap::new();
        for role in roles {
            by_name.insert(role.name.clone(), role);
        }
        let roles = by_name
            .into_values()
            .map(|role| (role.id.clone(), role))
            .collect::<HashMap<_, _>>();
        metrics::gauge!("kanban_roles_total").set(roles.len() as f64);
        Self {
            roles: Arc::new(RwLock::new(roles)),
        }
    }
}

#[async_trait]
impl RoleStore for InMemoryRoleStore {
    async fn find_by_names(&self, names: &[String]) -> StoreResult<Vec<Role>> {
        let roles = self.roles.read().await;
        // Keep the caller's order so resolution output is deterministic.
        let mut found = Vec::with_capacity(names.len());
        for name in names {
            if found.iter().any(|role: &Role| &role.name == name) {
                continue;
            }
            if let Some(role) = roles.values().find(|role| &role.name == name) {
                found.push(role.clone());
            }
        }
        Ok(found)
    }

    async fn get_role(&self, role_id: &str) -> StoreResult<Role> {
        self.roles
            .read()
            .await
            .get(role_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(role_id.to_string()))
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let mut roles: Vec<Role> = self.roles.read().await.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn insert_role(&self, role: Role) -> StoreResult<Role> {
        let mut roles = self.roles.write().await;
        if roles.contains_key(&role.id) || roles.values().any(|r| r.name == role.name) {
            return Err(StoreError::Conflict(role.name));
        }
        roles.insert(role.id.clone(), role.clone());
        metrics::gauge!("kanban_roles_total").set(roles.len() as f64);
        Ok(role)
    }

    async fn modify_role(
        &self,
        role_id: &str,
        mutation: RoleMutation,
    ) -> StoreResult<(Role, bool)> {
        let mut roles = self.roles.write().await;
        let role = roles
            .get_mut(role_id)
            .ok_or_else(|| StoreError::NotFound(role_id.to_string()))?;
        let changed = mutation(role);
        Ok((role.clone(), changed))
    }

    async fn remove_role(&self, role_id: &str) -> StoreResult<()> {
        let mut roles = self.roles.write().await;
        if roles.remove(role_id).is_none() {
            return Err(StoreError::NotFound(role_id.to_string()));
        }
        metrics::gauge!("kanban_roles_total").set(roles.len() as f64);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
