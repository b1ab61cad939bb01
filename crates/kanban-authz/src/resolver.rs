//! Permission resolution over the role inheritance graph.
//!
//! # Purpose
//! Turns a caller's role names into a flattened permission set, answers
//! membership and permission checks, and owns every role mutation so cache
//! invalidation cannot be bypassed.
//!
//! # Key invariants
//! - Roles the store does not know, and inactive roles, contribute nothing.
//!   Unknown names are not errors.
//! - The graph is loaded breadth-first, one store call per inheritance
//!   depth, into an arena keyed by role name. Flattening walks the arena with
//!   a visited set, so cyclic `inherits` terminate.
//! - Every mutation that changes a stored role invalidates the cache and
//!   broadcasts a [`RoleChange`]. Edits go through `RoleStore::modify_role`,
//!   so concurrent mutations of one role never overwrite each other.
//! - Membership follows `inherits` edges of active roles. A parent name needs
//!   no stored record of its own.
//! - The administrator bypass in [`PermissionResolver::has_access`] grants
//!   permission items only. Named-role items still require real membership.
use crate::cache::PermissionCache;
use crate::matcher::{PermissionMatcher, SEGMENT_SEPARATOR};
use crate::role::{Role, RoleStatus, dedup, validate_permission};
use crate::store::RoleStore;
use crate::AuthzResult;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Role whose holders pass every permission check in `has_access`.
    /// `None` disables the bypass.
    pub admin_role: Option<String>,
    pub cache_ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            admin_role: Some("administrator".to_string()),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChangeKind {
    Created,
    PermissionsChanged,
    InheritsChanged,
    StatusChanged,
    Removed,
}

/// Broadcast after a role mutation has been persisted.
#[derive(Debug, Clone)]
pub struct RoleChange {
    pub role_id: String,
    pub role_name: String,
    pub kind: RoleChangeKind,
}

/// Active roles reachable from a set of root names, keyed by name, plus the
/// names of reachable roles that are stored but inactive.
#[derive(Default)]
struct RoleGraph {
    roles: HashMap<String, Role>,
    inactive: HashSet<String>,
}

impl RoleGraph {
    fn flatten(&self, roots: &[String]) -> Vec<String> {
        let mut permissions = Vec::new();
        let mut done = HashSet::new();
        let mut path = Vec::new();
        for root in roots {
            self.visit(root, &mut path, &mut done, &mut permissions);
        }
        dedup(permissions)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
        permissions: &mut Vec<String>,
    ) {
        if done.contains(name) {
            return;
        }
        if path.contains(&name) {
            tracing::warn!(role = name, path = ?path, "role inheritance cycle, skipping revisit");
            return;
        }
        let Some(role) = self.roles.get(name) else {
            return;
        };
        path.push(name);
        permissions.extend(role.permissions.iter().cloned());
        for parent in &role.inherits {
            self.visit(parent, path, done, permissions);
        }
        path.pop();
        done.insert(name);
    }

    /// True if some active role lists `target` as a parent. The target needs
    /// no stored record, but a stored inactive one is not held.
    fn inherits(&self, target: &str) -> bool {
        !self.inactive.contains(target)
            && self
                .roles
                .values()
                .any(|role| role.inherits.iter().any(|parent| parent == target))
    }
}

pub struct PermissionResolver {
    store: Arc<dyn RoleStore>,
    cache: PermissionCache,
    admin_role: Option<String>,
    changes: broadcast::Sender<RoleChange>,
}

impl PermissionResolver {
    pub fn new(store: Arc<dyn RoleStore>, config: ResolverConfig) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            store,
            cache: PermissionCache::new(config.cache_ttl),
            admin_role: config.admin_role,
            changes,
        }
    }

    pub fn store(&self) -> &Arc<dyn RoleStore> {
        &self.store
    }

    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }

    pub fn admin_role(&self) -> Option<&str> {
        self.admin_role.as_deref()
    }

    /// Receive a [`RoleChange`] for every persisted role mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<RoleChange> {
        self.changes.subscribe()
    }

    async fn load_graph(&self, role_names: &[String]) -> AuthzResult<RoleGraph> {
        let mut graph = RoleGraph::default();
        let mut requested: HashSet<String> = HashSet::new();
        let mut frontier = dedup(role_names.to_vec());
        while !frontier.is_empty() {
            requested.extend(frontier.iter().cloned());
            let found = self.store.find_by_names(&frontier).await?;
            let mut next = Vec::new();
            for role in found {
                if !role.is_active() {
                    tracing::debug!(role = %role.name, "skipping inactive role");
                    graph.inactive.insert(role.name);
                    continue;
                }
                for parent in &role.inherits {
                    if !requested.contains(parent) && !next.contains(parent) {
                        next.push(parent.clone());
                    }
                }
                graph.roles.insert(role.name.clone(), role);
            }
            frontier = next;
        }
        Ok(graph)
    }

    /// Flattened, deduplicated permission patterns granted to `role_names`,
    /// own permissions before inherited ones.
    pub async fn get_permissions(&self, role_names: &[String]) -> AuthzResult<Vec<String>> {
        if role_names.is_empty() {
            return Ok(Vec::new());
        }
        let key = PermissionCache::cache_key(role_names);
        if let Some(permissions) = self.cache.get(&key) {
            return Ok(permissions);
        }
        let generation = self.cache.generation();
        let graph = self.load_graph(role_names).await?;
        let permissions = graph.flatten(&dedup(role_names.to_vec()));
        self.cache.insert(key, permissions.clone(), generation);
        Ok(permissions)
    }

    /// True if `target` is held directly or through inheritance.
    pub async fn has_role(&self, role_names: &[String], target: &str) -> AuthzResult<bool> {
        if role_names.iter().any(|name| name == target) {
            return Ok(true);
        }
        let graph = self.load_graph(role_names).await?;
        Ok(graph.inherits(target))
    }

    pub async fn can(&self, role_names: &[String], permission: &str) -> AuthzResult<bool> {
        let permissions = self.get_permissions(role_names).await?;
        Ok(PermissionMatcher::new(permissions).allows(permission))
    }

    /// True if at least one of `permissions` is granted.
    pub async fn can_at_least<S: AsRef<str> + Sync>(
        &self,
        role_names: &[String],
        permissions: &[S],
    ) -> AuthzResult<bool> {
        if permissions.is_empty() {
            return Ok(false);
        }
        let owned = self.get_permissions(role_names).await?;
        Ok(PermissionMatcher::new(owned).allows_any(permissions))
    }

    pub fn is_admin(&self, role_names: &[String]) -> bool {
        self.admin_role
            .as_deref()
            .is_some_and(|admin| role_names.iter().any(|name| name == admin))
    }

    /// True if any item passes. Items containing `.` are permissions, the
    /// rest are role names. An empty item list grants nothing.
    pub async fn has_access<S: AsRef<str> + Sync>(
        &self,
        role_names: &[String],
        items: &[S],
    ) -> AuthzResult<bool> {
        let (permissions, roles): (Vec<&str>, Vec<&str>) = items
            .iter()
            .map(AsRef::as_ref)
            .partition(|item| item.contains(SEGMENT_SEPARATOR));

        if !permissions.is_empty() {
            if self.is_admin(role_names) {
                return Ok(true);
            }
            if self.can_at_least(role_names, permissions.as_slice()).await? {
                return Ok(true);
            }
        }
        if roles.is_empty() {
            return Ok(false);
        }
        if roles
            .iter()
            .any(|role| role_names.iter().any(|name| name == role))
        {
            return Ok(true);
        }
        let graph = self.load_graph(role_names).await?;
        Ok(roles.iter().any(|role| graph.inherits(role)))
    }

    /// Apply `change` atomically in the store, touching and publishing only
    /// when it changed the role.
    async fn mutate<F>(
        &self,
        role_id: &str,
        kind: RoleChangeKind,
        change: F,
    ) -> AuthzResult<Role>
    where
        F: FnOnce(&mut Role) -> bool + Send + 'static,
    {
        let (role, changed) = self
            .store
            .modify_role(
                role_id,
                Box::new(move |role| {
                    let changed = change(role);
                    if changed {
                        role.touch();
                    }
                    changed
                }),
            )
            .await?;
        if changed {
            self.publish(&role, kind);
        }
        Ok(role)
    }

    fn publish(&self, role: &Role, kind: RoleChangeKind) {
        self.cache.invalidate_all();
        tracing::info!(role_id = %role.id, role = %role.name, ?kind, "role changed");
        // No subscribers is fine.
        let _ = self.changes.send(RoleChange {
            role_id: role.id.clone(),
            role_name: role.name.clone(),
            kind,
        });
    }

    /// Add `permission` to the role if absent. A repeat call returns the
    /// role unchanged without writing.
    pub async fn assign_permission(&self, role_id: &str, permission: &str) -> AuthzResult<Role> {
        validate_permission(permission)?;
        let permission = permission.to_string();
        self.mutate(role_id, RoleChangeKind::PermissionsChanged, move |role| {
            role.grant(&permission)
        })
        .await
    }

    /// Remove `permission` if present; otherwise return the role unchanged.
    pub async fn revoke_permission(&self, role_id: &str, permission: &str) -> AuthzResult<Role> {
        let permission = permission.to_string();
        self.mutate(role_id, RoleChangeKind::PermissionsChanged, move |role| {
            role.revoke(&permission)
        })
        .await
    }

    /// Replace the role's permission set.
    pub async fn sync_permissions(
        &self,
        role_id: &str,
        permissions: Vec<String>,
    ) -> AuthzResult<Role> {
        for permission in &permissions {
            validate_permission(permission)?;
        }
        self.mutate(role_id, RoleChangeKind::PermissionsChanged, move |role| {
            role.replace_permissions(permissions);
            true
        })
        .await
    }

    pub async fn create_role(&self, role: Role) -> AuthzResult<Role> {
        for permission in &role.permissions {
            validate_permission(permission)?;
        }
        let role = self.store.insert_role(role).await?;
        self.publish(&role, RoleChangeKind::Created);
        Ok(role)
    }

    pub async fn get_role(&self, role_id: &str) -> AuthzResult<Role> {
        Ok(self.store.get_role(role_id).await?)
    }

    /// Look a role up by its unique name.
    pub async fn find_role(&self, name: &str) -> AuthzResult<Option<Role>> {
        let found = self.store.find_by_names(&[name.to_string()]).await?;
        Ok(found.into_iter().next())
    }

    pub async fn list_roles(&self) -> AuthzResult<Vec<Role>> {
        Ok(self.store.list_roles().await?)
    }

    pub async fn set_inherits(&self, role_id: &str, inherits: Vec<String>) -> AuthzResult<Role> {
        self.mutate(role_id, RoleChangeKind::InheritsChanged, move |role| {
            role.inherits = dedup(inherits);
            true
        })
        .await
    }

    pub async fn set_status(&self, role_id: &str, status: RoleStatus) -> AuthzResult<Role> {
        self.mutate(role_id, RoleChangeKind::StatusChanged, move |role| {
            if role.status == status {
                return false;
            }
            role.status = status;
            true
        })
        .await
    }

    /// Delete a role and return its last stored state.
    pub async fn remove_role(&self, role_id: &str) -> AuthzResult<Role> {
        let role = self.store.get_role(role_id).await?;
        self.store.remove_role(role_id).await?;
        self.publish(&role, RoleChangeKind::Removed);
        Ok(role)
    }
}
