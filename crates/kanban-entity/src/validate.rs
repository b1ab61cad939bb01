//! Write-side validation producing a change-set.
//!
//! Runs over the fields the caller may write. Set hooks run first and
//! concurrently; the remaining rules apply field by field in declaration
//! order: protected-field skips, keep-previous on update, defaults,
//! trimming, required, kind and custom validators. Any failure aborts the
//! whole call so no partial change-set is ever returned.
use crate::authorize::authorize_fields;
use crate::context::RequestContext;
use crate::errors::{EntityError, EntityResult};
use crate::field::HookInput;
use crate::path::{get_path, set_path};
use crate::transform::EntityPipeline;
use futures::future::try_join_all;
use serde_json::{Map, Value};

impl EntityPipeline {
    /// Validate `changes` against `existing` (`None` for a new entity).
    ///
    /// Returns accepted values keyed by public field path. Set hooks see the
    /// stored entity overlaid with the incoming values of writable fields.
    pub async fn validate_entity(
        &self,
        ctx: &RequestContext,
        existing: Option<&Map<String, Value>>,
        changes: &Map<String, Value>,
    ) -> EntityResult<Map<String, Value>> {
        let is_new = existing.is_none();
        let fields = authorize_fields(&self.resolver, ctx, self.schema.fields(), false).await?;

        let mut working = existing.cloned().unwrap_or_default();
        let mut snapshot = working.clone();
        for field in fields.iter().filter(|field| field.writable(is_new)) {
            if let Some(value) = get_path(changes, &field.name) {
                set_path(&mut snapshot, field.storage_path(), value.clone());
            }
        }

        let hooked = try_join_all(fields.iter().map(|field| {
            let snapshot = &snapshot;
            async move {
                match field.set_hook(is_new) {
                    Some(hook) => hook
                        .resolve(HookInput {
                            value: get_path(changes, &field.name).cloned(),
                            entity: snapshot.clone(),
                            ctx: ctx.clone(),
                        })
                        .await
                        .map(Some),
                    None => Ok(None),
                }
            }
        }))
        .await?;

        let mut change_set = Map::new();
        for (field, hooked) in fields.iter().zip(hooked) {
            let mut value = match hooked {
                Some(result) => result,
                None => {
                    let incoming = get_path(changes, &field.name).cloned();
                    if incoming.is_some() && !field.writable(is_new) {
                        tracing::debug!(
                            entity = self.schema.name(),
                            field = %field.name,
                            "ignoring write to protected field"
                        );
                        continue;
                    }
                    incoming
                }
            };

            if value.is_none() && !is_new && get_path(&working, field.storage_path()).is_some() {
                continue;
            }
            if value.is_none()
                && let Some(default) = &field.default
            {
                value = default
                    .resolve(HookInput {
                        value: None,
                        entity: working.clone(),
                        ctx: ctx.clone(),
                    })
                    .await?;
            }
            if let (Some(trim), Some(Value::String(text))) = (field.trim, value.as_mut()) {
                *text = trim.apply(text);
            }

            let Some(value) = value else {
                if field.required && is_new {
                    return Err(EntityError::validation(
                        &field.name,
                        format!("`{}` is required", field.name),
                    ));
                }
                continue;
            };
            if !field.kind.accepts(&value) {
                return Err(EntityError::validation(
                    &field.name,
                    format!("`{}` must be of type {}", field.name, field.kind.as_str()),
                ));
            }
            if let Some(check) = &field.validate {
                check(&value).map_err(|message| EntityError::validation(&field.name, message))?;
            }

            set_path(&mut working, field.storage_path(), value.clone());
            change_set.insert(field.name.clone(), value);
        }
        Ok(change_set)
    }
}
