//! Stored-to-public document transformation.
//!
//! # Purpose
//! Builds the documents a caller is allowed to see: populate requested
//! references, authorize fields for reading, then reform each document from
//! the authorized fields and their getters.
//!
//! # Key invariants
//! - Output field order follows schema declaration order.
//! - Fields whose value resolves to undefined are omitted, not set to null.
//! - `hidden` fields are never emitted; a non-empty `fields` selection
//!   restricts output further but always keeps the primary key.
//! - A `secure` primary key is encoded with the pipeline's [`IdCodec`].
//! - Objects transform to objects, arrays to arrays; anything else (counts)
//!   passes through unchanged.
use crate::authorize::authorize_fields;
use crate::codec::{IdCodec, PlainIdCodec};
use crate::context::RequestContext;
use crate::errors::{EntityError, EntityResult};
use crate::field::{EntitySchema, FieldSchema, HookInput};
use crate::path::{get_path, set_path};
use crate::populate::{ReferenceResolver, populate_documents};
use crate::query::FindParams;
use futures::future::try_join_all;
use kanban_authz::PermissionResolver;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct EntityPipeline {
    pub(crate) schema: Arc<EntitySchema>,
    pub(crate) resolver: Arc<PermissionResolver>,
    references: Option<Arc<dyn ReferenceResolver>>,
    codec: Arc<dyn IdCodec>,
}

pub(crate) fn entity_to_object(value: Value) -> EntityResult<Map<String, Value>> {
    match value {
        Value::Object(doc) => Ok(doc),
        other => Err(EntityError::Storage(anyhow::anyhow!(
            "stored document is not an object: {other}"
        ))),
    }
}

impl EntityPipeline {
    pub fn new(schema: EntitySchema, resolver: Arc<PermissionResolver>) -> Self {
        Self {
            schema: Arc::new(schema),
            resolver,
            references: None,
            codec: Arc::new(PlainIdCodec),
        }
    }

    pub fn with_references(mut self, references: Arc<dyn ReferenceResolver>) -> Self {
        self.references = Some(references);
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn IdCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn resolver(&self) -> &Arc<PermissionResolver> {
        &self.resolver
    }

    fn encode_id(&self, value: Value) -> Value {
        if !self.schema.primary_key().secure {
            return value;
        }
        match value {
            Value::String(id) => Value::String(self.codec.encode(&id)),
            Value::Number(id) => Value::String(self.codec.encode(&id.to_string())),
            other => other,
        }
    }

    /// Public id back to the stored id.
    pub fn decode_id(&self, id: &str) -> EntityResult<String> {
        if self.schema.primary_key().secure {
            self.codec.decode(id)
        } else {
            Ok(id.to_string())
        }
    }

    /// Transform whatever storage returned: one document, a list, or a
    /// scalar such as a count.
    pub async fn transform(
        &self,
        ctx: &RequestContext,
        params: &FindParams,
        raw: Value,
    ) -> EntityResult<Value> {
        match raw {
            Value::Object(doc) => {
                let mut docs = self.transform_documents(ctx, params, vec![doc]).await?;
                Ok(docs.pop().unwrap_or(Value::Null))
            }
            Value::Array(items) => {
                let docs = items
                    .into_iter()
                    .map(entity_to_object)
                    .collect::<EntityResult<Vec<_>>>()?;
                Ok(Value::Array(
                    self.transform_documents(ctx, params, docs).await?,
                ))
            }
            other => Ok(other),
        }
    }

    pub async fn transform_documents(
        &self,
        ctx: &RequestContext,
        params: &FindParams,
        mut docs: Vec<Map<String, Value>>,
    ) -> EntityResult<Vec<Value>> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }
        populate_documents(
            &mut docs,
            self.schema.fields(),
            &params.populate,
            self.references.as_deref(),
            ctx,
        )
        .await?;

        let authorized = authorize_fields(&self.resolver, ctx, self.schema.fields(), true).await?;
        let selected: Vec<&FieldSchema> = authorized
            .into_iter()
            .filter(|field| !field.hidden)
            .filter(|field| {
                params.fields.is_empty()
                    || field.primary_key
                    || params.fields.iter().any(|name| name == &field.name)
            })
            .collect();

        let reformed = try_join_all(docs.iter().map(|doc| self.reform(ctx, &selected, doc))).await?;
        Ok(reformed.into_iter().map(Value::Object).collect())
    }

    async fn reform(
        &self,
        ctx: &RequestContext,
        fields: &[&FieldSchema],
        doc: &Map<String, Value>,
    ) -> EntityResult<Map<String, Value>> {
        let values = try_join_all(fields.iter().map(|field| async move {
            let value = get_path(doc, field.storage_path()).cloned();
            let value = match &field.get {
                Some(hook) => {
                    hook.resolve(HookInput {
                        value,
                        entity: doc.clone(),
                        ctx: ctx.clone(),
                    })
                    .await?
                }
                None => value,
            };
            Ok::<_, EntityError>(if field.primary_key {
                value.map(|id| self.encode_id(id))
            } else {
                value
            })
        }))
        .await?;

        let mut public = Map::new();
        for (field, value) in fields.iter().zip(values) {
            if let Some(value) = value {
                set_path(&mut public, &field.name, value);
            }
        }
        Ok(public)
    }
}
