//! Field-authorized entity pipeline shared by kanban services.
//!
//! # Purpose
//! Turns declarative field schemas into safe request handling: which fields a
//! caller may read or write, how stored documents become public ones
//! (population, getters, id encoding), how writes become validated
//! change-sets, and how loose query parameters become storage queries.
//!
//! # How it fits
//! A service builds one [`EntitySchema`] per entity at startup, wraps it in an
//! [`EntityPipeline`] bound to the shared [`kanban_authz::PermissionResolver`],
//! and serves it through an [`EntityService`] over a [`StorageAdapter`].
//! Cross-service references go through a [`ReferenceResolver`].
//!
//! # Key invariants
//! - Per-field authorization, population, getters and set hooks fan out
//!   concurrently; the first failure aborts the call.
//! - Output documents follow schema declaration order.
//! - Validation never returns a partial change-set.
//!
//! # Examples
//! ```rust
//! use kanban_entity::{PaginationConfig, RawQuery, normalize};
//!
//! let raw = RawQuery::from_pairs([("page", "2"), ("pageSize", "10")]).unwrap();
//! let params = normalize(&raw, &PaginationConfig::default(), true);
//! assert_eq!((params.limit, params.offset), (Some(10), Some(10)));
//! ```

mod adapter;
mod authorize;
mod codec;
mod context;
mod errors;
mod field;
mod path;
mod populate;
mod query;
mod service;
mod transform;
mod validate;

pub use adapter::{MemoryAdapter, StorageAdapter};
pub use authorize::authorize_fields;
pub use codec::{Base64IdCodec, IdCodec, PlainIdCodec};
pub use context::{AUTHENTICATED_ROLE, EVERYONE_ROLE, RequestContext};
pub use errors::{EntityError, EntityResult};
pub use field::{
    EntitySchema, FieldHook, FieldKind, FieldSchema, HookFn, HookFuture, HookInput, PopulateFn,
    PopulateFuture, PopulateRule, Trim, ValidateFn,
};
pub use path::{get_path, set_path};
pub use populate::{ReferenceResolver, populate_documents};
pub use query::{FindParams, PaginationConfig, RawQuery, normalize};
pub use service::{EntityService, ListResult};
pub use transform::EntityPipeline;
