//! Batched resolution of stored references.
//!
//! # Purpose
//! Replaces reference ids in raw documents with the referenced objects,
//! issuing one lookup per populated field no matter how many documents or
//! duplicate ids are involved.
//!
//! # Key invariants
//! - Ids are collected across all documents, flattened and deduplicated in
//!   first-seen order before the lookup.
//! - Lookups for different fields run concurrently; the first failure aborts
//!   the whole population.
//! - Arrays of ids become arrays of resolved objects with unresolved ids
//!   dropped. A scalar id becomes its object, or `null` when unresolved.
use crate::context::RequestContext;
use crate::errors::{EntityError, EntityResult};
use crate::field::{FieldSchema, PopulateRule};
use crate::path::{get_path, set_path};
use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Cross-service lookup used by [`PopulateRule::Action`].
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    async fn resolve_by_ids(
        &self,
        action: &str,
        ids: &[String],
        params: &Map<String, Value>,
        ctx: &RequestContext,
    ) -> EntityResult<HashMap<String, Value>>;
}

/// String form of a reference used as the lookup key.
fn reference_key(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn collect_ids(docs: &[Map<String, Value>], path: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    let mut push = |value: &Value| {
        if let Some(id) = reference_key(value)
            && seen.insert(id.clone())
        {
            ids.push(id);
        }
    };
    for doc in docs {
        match get_path(doc, path) {
            Some(Value::Array(items)) => items.iter().for_each(&mut push),
            Some(value) => push(value),
            None => {}
        }
    }
    ids
}

fn splice(doc: &mut Map<String, Value>, path: &str, resolved: &HashMap<String, Value>) {
    let replacement = match get_path(doc, path) {
        Some(Value::Array(items)) => Value::Array(
            items
                .iter()
                .filter_map(|item| reference_key(item).and_then(|id| resolved.get(&id).cloned()))
                .collect(),
        ),
        Some(value) => reference_key(value)
            .and_then(|id| resolved.get(&id).cloned())
            .unwrap_or(Value::Null),
        None => return,
    };
    set_path(doc, path, replacement);
}

async fn resolve_field(
    field: &FieldSchema,
    rule: &PopulateRule,
    ids: Vec<String>,
    references: Option<&dyn ReferenceResolver>,
    ctx: &RequestContext,
) -> EntityResult<HashMap<String, Value>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    metrics::counter!("kanban_populate_batches_total").increment(1);
    tracing::debug!(field = %field.name, ids = ids.len(), "populating references");
    let result = match rule {
        PopulateRule::Handler(handler) => handler(ids, ctx.clone()).await,
        PopulateRule::Action { action, params } => match references {
            Some(references) => references.resolve_by_ids(action, &ids, params, ctx).await,
            None => Err(EntityError::Resolution(format!(
                "no reference resolver for action `{action}`"
            ))),
        },
    };
    result.map_err(|err| {
        if err.is_client_error() {
            return err;
        }
        tracing::error!(field = %field.name, error = %err, "reference resolution failed");
        match err {
            EntityError::Resolution(_) => err,
            other => EntityError::Resolution(format!("field `{}`: {other}", field.name)),
        }
    })
}

/// Populate every field named in `requested` that declares a rule.
pub async fn populate_documents(
    docs: &mut [Map<String, Value>],
    fields: &[FieldSchema],
    requested: &[String],
    references: Option<&dyn ReferenceResolver>,
    ctx: &RequestContext,
) -> EntityResult<()> {
    if requested.is_empty() || docs.is_empty() {
        return Ok(());
    }
    let targets: Vec<(&FieldSchema, &PopulateRule, Vec<String>)> = fields
        .iter()
        .filter(|field| requested.iter().any(|name| name == &field.name))
        .filter_map(|field| {
            let rule = field.populate.as_ref()?;
            Some((field, rule, collect_ids(docs, field.storage_path())))
        })
        .collect();
    if targets.is_empty() {
        return Ok(());
    }

    let lookups = targets
        .into_iter()
        .map(|(field, rule, ids)| async move {
            let resolved = resolve_field(field, rule, ids, references, ctx).await?;
            Ok::<_, EntityError>((field, resolved))
        });
    let resolved = try_join_all(lookups).await?;

    for (field, resolved) in &resolved {
        for doc in docs.iter_mut() {
            splice(doc, field.storage_path(), resolved);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingResolver {
        calls: AtomicUsize,
        last_ids: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ReferenceResolver for RecordingResolver {
        async fn resolve_by_ids(
            &self,
            action: &str,
            ids: &[String],
            _params: &Map<String, Value>,
            _ctx: &RequestContext,
        ) -> EntityResult<HashMap<String, Value>> {
            assert_eq!(action, "accounts.resolve");
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut last) = self.last_ids.lock() {
                *last = ids.to_vec();
            }
            Ok(ids
                .iter()
                .filter(|id| id.as_str() != "missing")
                .map(|id| (id.clone(), json!({"id": id, "name": format!("user {id}")})))
                .collect())
        }
    }

    fn doc(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn owner_field() -> Vec<FieldSchema> {
        vec![
            FieldSchema::string("id").primary_key(),
            FieldSchema::string("owner").populate(PopulateRule::action("accounts.resolve")),
            FieldSchema::new("members", crate::FieldKind::Array)
                .populate(PopulateRule::action("accounts.resolve")),
        ]
    }

    #[tokio::test]
    async fn duplicate_ids_resolve_in_one_batch() {
        let resolver = RecordingResolver::default();
        let mut docs = vec![
            doc(json!({"id": "1", "owner": "a"})),
            doc(json!({"id": "2", "owner": "b"})),
            doc(json!({"id": "3", "owner": "a"})),
        ];
        populate_documents(
            &mut docs,
            &owner_field(),
            &["owner".to_string()],
            Some(&resolver),
            &RequestContext::anonymous(),
        )
        .await
        .expect("populate");

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *resolver.last_ids.lock().expect("lock"),
            vec!["a".to_string(), "b".to_string()]
        );
        assert_eq!(docs[0]["owner"]["name"], "user a");
        assert_eq!(docs[1]["owner"]["name"], "user b");
        assert_eq!(docs[2]["owner"]["name"], "user a");
    }

    #[tokio::test]
    async fn arrays_drop_unresolved_and_scalars_become_null() {
        let resolver = RecordingResolver::default();
        let mut docs = vec![doc(json!({
            "id": "1",
            "owner": "missing",
            "members": ["a", "missing", "b"],
        }))];
        populate_documents(
            &mut docs,
            &owner_field(),
            &["owner".to_string(), "members".to_string()],
            Some(&resolver),
            &RequestContext::anonymous(),
        )
        .await
        .expect("populate");

        assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);
        assert_eq!(docs[0]["owner"], Value::Null);
        let members = docs[0]["members"].as_array().expect("array");
        assert_eq!(members.len(), 2);
        assert_eq!(members[1]["id"], "b");
    }

    #[tokio::test]
    async fn handler_rules_and_unrequested_fields() {
        let fields = vec![
            FieldSchema::string("id").primary_key(),
            FieldSchema::string("status").populate(PopulateRule::handler(
                |ids: Vec<String>, _ctx| async move {
                    Ok::<_, EntityError>(
                        ids.into_iter()
                            .map(|id| (id.clone(), json!({"label": id.to_uppercase()})))
                            .collect::<HashMap<_, _>>(),
                    )
                },
            )),
            FieldSchema::string("owner").populate(PopulateRule::action("accounts.resolve")),
        ];
        let mut docs = vec![doc(json!({"id": "1", "status": "open", "owner": "a"}))];
        populate_documents(
            &mut docs,
            &fields,
            &["status".to_string()],
            None,
            &RequestContext::anonymous(),
        )
        .await
        .expect("populate");
        assert_eq!(docs[0]["status"]["label"], "OPEN");
        assert_eq!(docs[0]["owner"], "a");
    }

    #[tokio::test]
    async fn missing_resolver_is_resolution_failure() {
        let mut docs = vec![doc(json!({"id": "1", "owner": "a"}))];
        let err = populate_documents(
            &mut docs,
            &owner_field(),
            &["owner".to_string()],
            None,
            &RequestContext::anonymous(),
        )
        .await
        .expect_err("no resolver");
        assert_eq!(err.code(), "RESOLUTION_FAILURE");
    }
}
