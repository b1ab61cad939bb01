//! Generic CRUD service over one entity schema.
//!
//! # Purpose
//! Composes action-level access checks, query normalization, the storage
//! adapter, validation and the transform pipeline into the actions every
//! entity exposes: find, count, list, get, create, update, remove and
//! resolve-by-ids.
//!
//! # Key invariants
//! - Every action checks `has_access(ctx.roles, action_permissions(action))`
//!   before touching storage. An empty item list skips the check.
//! - Incoming ids are decoded when the primary key is `secure`.
//! - Filters, sort keys and search fields only reach storage for fields the
//!   caller can read.
//! - Change-sets are re-keyed from public field paths to storage paths
//!   before they reach the adapter.
use crate::adapter::StorageAdapter;
use crate::authorize::authorize_fields;
use crate::context::RequestContext;
use crate::errors::{EntityError, EntityResult};
use crate::field::{FieldKind, FieldSchema};
use crate::path::{get_path, set_path};
use crate::query::{FindParams, PaginationConfig, RawQuery, normalize};
use crate::transform::{EntityPipeline, entity_to_object};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// One page of a `list` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    pub rows: Vec<Value>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

/// Storage path for a public key that names a readable field, or a dot path
/// below one.
fn readable_path(readable: &[&FieldSchema], key: &str) -> Option<String> {
    readable.iter().find_map(|field| {
        if key == field.name {
            Some(field.storage_path().to_string())
        } else {
            key.strip_prefix(field.name.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .map(|rest| format!("{}.{rest}", field.storage_path()))
        }
    })
}

#[derive(Clone)]
pub struct EntityService {
    pipeline: EntityPipeline,
    adapter: Arc<dyn StorageAdapter>,
    pagination: PaginationConfig,
}

impl EntityService {
    pub fn new(pipeline: EntityPipeline, adapter: Arc<dyn StorageAdapter>) -> Self {
        Self {
            pipeline,
            adapter,
            pagination: PaginationConfig::default(),
        }
    }

    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn name(&self) -> &str {
        self.pipeline.schema().name()
    }

    pub fn pipeline(&self) -> &EntityPipeline {
        &self.pipeline
    }

    pub fn adapter(&self) -> &Arc<dyn StorageAdapter> {
        &self.adapter
    }

    pub async fn check_access(&self, ctx: &RequestContext, action: &str) -> EntityResult<()> {
        let items = self.pipeline.schema().action_permissions(action);
        if items.is_empty() {
            return Ok(());
        }
        if self
            .pipeline
            .resolver()
            .has_access(&ctx.roles, items.as_slice())
            .await?
        {
            Ok(())
        } else {
            tracing::debug!(entity = self.name(), action, roles = ?ctx.roles, "action denied");
            Err(EntityError::AccessDenied(format!("{}.{}", self.name(), action)))
        }
    }

    fn storage_changes(&self, change_set: Map<String, Value>, nested: bool) -> Map<String, Value> {
        let mut stored = Map::new();
        for (name, value) in change_set {
            let path = self.storage_path(&name).to_string();
            if nested {
                set_path(&mut stored, &path, value);
            } else {
                stored.insert(path, value);
            }
        }
        stored
    }

    fn storage_path<'a>(&'a self, name: &'a str) -> &'a str {
        self.pipeline
            .schema()
            .field(name)
            .map_or(name, |field| field.storage_path())
    }

    /// Re-key filters, sort keys and search fields to storage paths. Every
    /// key must name a field the caller can read; hidden fields never match.
    /// Without `searchFields` the search covers the readable string fields.
    async fn storage_params(
        &self,
        ctx: &RequestContext,
        params: &FindParams,
    ) -> EntityResult<FindParams> {
        let schema = self.pipeline.schema();
        let readable: Vec<&FieldSchema> =
            authorize_fields(self.pipeline.resolver(), ctx, schema.fields(), true)
                .await?
                .into_iter()
                .filter(|field| !field.hidden)
                .collect();
        let path_of = |key: &str| {
            readable_path(&readable, key).ok_or_else(|| {
                EntityError::validation(key, format!("cannot query on `{key}`"))
            })
        };

        let mut stored = params.clone();
        stored.query = Map::new();
        for (name, value) in &params.query {
            stored.query.insert(path_of(name.as_str())?, value.clone());
        }
        stored.sort = params
            .sort
            .iter()
            .map(|key| match key.strip_prefix('-') {
                Some(name) => path_of(name).map(|path| format!("-{path}")),
                None => path_of(key.as_str()),
            })
            .collect::<EntityResult<_>>()?;
        stored.search_fields = if params.search_fields.is_empty() {
            let mut defaults: Vec<String> = readable
                .iter()
                .filter(|field| field.kind == FieldKind::String)
                .map(|field| field.storage_path().to_string())
                .collect();
            if defaults.is_empty() {
                defaults.push(schema.primary_key().storage_path().to_string());
            }
            defaults
        } else {
            params
                .search_fields
                .iter()
                .map(|name| path_of(name.as_str()))
                .collect::<EntityResult<_>>()?
        };
        Ok(stored)
    }

    async fn load(&self, id: &str) -> EntityResult<(String, Map<String, Value>)> {
        let stored_id = self.pipeline.decode_id(id)?;
        let doc = self
            .adapter
            .find_by_id(&stored_id)
            .await?
            .ok_or_else(|| EntityError::not_found(self.name(), id))?;
        Ok((stored_id, entity_to_object(doc)?))
    }

    pub async fn find(&self, ctx: &RequestContext, raw: &RawQuery) -> EntityResult<Vec<Value>> {
        self.check_access(ctx, "find").await?;
        let params = normalize(raw, &self.pagination, false);
        self.find_with(ctx, &params).await
    }

    async fn find_with(&self, ctx: &RequestContext, params: &FindParams) -> EntityResult<Vec<Value>> {
        let docs = self
            .adapter
            .find(&self.storage_params(ctx, params).await?)
            .await?
            .into_iter()
            .map(entity_to_object)
            .collect::<EntityResult<Vec<_>>>()?;
        self.pipeline.transform_documents(ctx, params, docs).await
    }

    pub async fn count(&self, ctx: &RequestContext, raw: &RawQuery) -> EntityResult<u64> {
        self.check_access(ctx, "count").await?;
        let params = normalize(raw, &self.pagination, false).without_window();
        let stored = self.storage_params(ctx, &params).await?;
        self.adapter.count(&stored).await
    }

    pub async fn list(&self, ctx: &RequestContext, raw: &RawQuery) -> EntityResult<ListResult> {
        self.check_access(ctx, "list").await?;
        let params = normalize(raw, &self.pagination, true);
        let count_params = self.storage_params(ctx, &params.without_window()).await?;
        let (rows, total) = futures::try_join!(
            self.find_with(ctx, &params),
            self.adapter.count(&count_params)
        )?;
        let page_size = params.page_size.unwrap_or(self.pagination.default_page_size);
        Ok(ListResult {
            rows,
            total,
            page: params.page.unwrap_or(1),
            page_size,
            total_pages: if page_size == 0 {
                0
            } else {
                total.div_ceil(page_size)
            },
        })
    }

    pub async fn get(&self, ctx: &RequestContext, id: &str, raw: &RawQuery) -> EntityResult<Value> {
        self.check_access(ctx, "get").await?;
        let params = normalize(raw, &self.pagination, false);
        let (_, doc) = self.load(id).await?;
        self.pipeline
            .transform(ctx, &params, Value::Object(doc))
            .await
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        params: &Map<String, Value>,
    ) -> EntityResult<Value> {
        self.check_access(ctx, "create").await?;
        let change_set = self.pipeline.validate_entity(ctx, None, params).await?;
        let created = self
            .adapter
            .insert(self.storage_changes(change_set, true))
            .await?;
        tracing::debug!(entity = self.name(), "entity created");
        self.pipeline
            .transform(ctx, &FindParams::default(), created)
            .await
    }

    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: &str,
        params: &Map<String, Value>,
    ) -> EntityResult<Value> {
        self.check_access(ctx, "update").await?;
        let (stored_id, existing) = self.load(id).await?;
        let change_set = self
            .pipeline
            .validate_entity(ctx, Some(&existing), params)
            .await?;
        let updated = if change_set.is_empty() {
            Value::Object(existing)
        } else {
            self.adapter
                .update_by_id(&stored_id, self.storage_changes(change_set, false))
                .await?
                .ok_or_else(|| EntityError::not_found(self.name(), id))?
        };
        self.pipeline
            .transform(ctx, &FindParams::default(), updated)
            .await
    }

    /// Remove and return the entity as it was before removal.
    pub async fn remove(&self, ctx: &RequestContext, id: &str) -> EntityResult<Value> {
        self.check_access(ctx, "remove").await?;
        let (stored_id, existing) = self.load(id).await?;
        if self.adapter.remove_by_id(&stored_id).await? == 0 {
            return Err(EntityError::not_found(self.name(), id));
        }
        tracing::debug!(entity = self.name(), "entity removed");
        self.pipeline
            .transform(ctx, &FindParams::default(), Value::Object(existing))
            .await
    }

    /// Stored id -> public document, for other services' population.
    pub async fn resolve_by_ids(
        &self,
        ctx: &RequestContext,
        ids: &[String],
        params: &Map<String, Value>,
    ) -> EntityResult<HashMap<String, Value>> {
        self.check_access(ctx, "resolve").await?;
        let raw = RawQuery::from_params(params).map_err(EntityError::invalid)?;
        let find = normalize(&raw, &self.pagination, false);
        let docs = self
            .adapter
            .find_by_ids(ids)
            .await?
            .into_iter()
            .map(entity_to_object)
            .collect::<EntityResult<Vec<_>>>()?;

        let key_path = self.pipeline.schema().primary_key().storage_path();
        let keys: Vec<Option<String>> = docs
            .iter()
            .map(|doc| match get_path(doc, key_path) {
                Some(Value::String(id)) => Some(id.clone()),
                Some(Value::Number(id)) => Some(id.to_string()),
                _ => None,
            })
            .collect();
        let public = self.pipeline.transform_documents(ctx, &find, docs).await?;
        Ok(keys
            .into_iter()
            .zip(public)
            .filter_map(|(key, doc)| Some((key?, doc)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readable_path_maps_names_and_nested_keys() {
        let id = FieldSchema::string("id").column("_id").primary_key();
        let profile = FieldSchema::new("profile", FieldKind::Object).column("meta.profile");
        let readable = vec![&id, &profile];

        assert_eq!(readable_path(&readable, "id").as_deref(), Some("_id"));
        assert_eq!(
            readable_path(&readable, "profile.city").as_deref(),
            Some("meta.profile.city")
        );
        assert_eq!(readable_path(&readable, "profiles"), None);
        assert_eq!(readable_path(&readable, "notes"), None);
    }
}
