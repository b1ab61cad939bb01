//! Role persistence contract.
//!
//! # Purpose
//! Abstracts where role records live so the resolver can run against the
//! in-memory backend in tests and a durable adapter in deployments.
use crate::Role;
use async_trait::async_trait;
use thiserror::Error;

pub mod memory;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// In-place edit applied by [`RoleStore::modify_role`]. Returns whether the
/// role changed. Must not rename the role.
pub type RoleMutation = Box<dyn FnOnce(&mut Role) -> bool + Send>;

#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Fetch the roles whose `name` is in `names`. Unknown names are skipped.
    async fn find_by_names(&self, names: &[String]) -> StoreResult<Vec<Role>>;
    async fn get_role(&self, role_id: &str) -> StoreResult<Role>;
    async fn list_roles(&self) -> StoreResult<Vec<Role>>;
    /// Insert a new role. Fails with `Conflict` when the name is taken.
    async fn insert_role(&self, role: Role) -> StoreResult<Role>;
    /// Read, edit and write back one role with no other write in between.
    /// Returns the stored role and whether `mutation` changed it.
    async fn modify_role(
        &self,
        role_id: &str,
        mutation: RoleMutation,
    ) -> StoreResult<(Role, bool)>;
    async fn remove_role(&self, role_id: &str) -> StoreResult<()>;
    fn backend_name(&self) -> &'static str;
}
