//! Role-based access control primitives for the kanban services.
//!
//! # Purpose
//! Resolves caller role names into permission patterns through role
//! inheritance, matches dot-segmented permission strings with `*`/`**`
//! wildcards, and owns role mutations together with cache invalidation.
//!
//! # How it fits
//! `kanban-entity` consults [`PermissionResolver::has_access`] for action
//! checks and field authorization. The board service seeds roles into a
//! [`RoleStore`] at startup and exposes the resolver over HTTP.
//!
//! # Key invariants
//! - Role `name` is the join key for inheritance and caller role lists.
//! - Unknown or inactive roles resolve to nothing; they are not errors.
//! - Cyclic inheritance terminates and is logged.
//! - Only store failures surface as errors from read operations.
//!
//! # Important configuration
//! - [`ResolverConfig::admin_role`] names the role that bypasses permission
//!   items in `has_access`.
//! - [`ResolverConfig::cache_ttl`] bounds how long a resolved set is reused;
//!   zero disables the cache.
//!
//! # Examples
//! ```rust
//! use kanban_authz::{PermissionMatcher, permission_match};
//!
//! assert!(permission_match("boards.create", "boards.*"));
//! let matcher = PermissionMatcher::new(vec!["boards.**".to_string()]);
//! assert!(matcher.allows("boards.lists.create"));
//! ```
//!
//! # Common pitfalls
//! - Writing roles straight through a [`RoleStore`] skips cache invalidation;
//!   go through the resolver's mutation methods instead.

mod cache;
mod errors;
mod matcher;
mod resolver;
mod role;
pub mod store;

pub use cache::PermissionCache;
pub use errors::{AuthzError, AuthzResult};
pub use matcher::{
    DEEP_WILDCARD, PermissionMatcher, SEGMENT_SEPARATOR, SINGLE_WILDCARD, permission_match,
};
pub use resolver::{PermissionResolver, ResolverConfig, RoleChange, RoleChangeKind};
pub use role::{Role, RoleStatus, validate_permission};
pub use store::memory::InMemoryRoleStore;
pub use store::{RoleMutation, RoleStore, StoreError, StoreResult};
