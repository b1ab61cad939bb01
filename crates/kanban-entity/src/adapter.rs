//! Storage adapter contract and the in-memory adapter.
//!
//! # Purpose
//! The pipeline never talks to a database directly; it hands normalized
//! [`FindParams`] and change-sets keyed by storage path to an adapter.
//!
//! # Durability and consistency
//! [`MemoryAdapter`] is not durable. Each write holds the write lock for the
//! whole read-modify-write, so single-document updates are atomic.
use crate::errors::{EntityError, EntityResult};
use crate::path::{get_path, set_path};
use crate::query::FindParams;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::RwLock;

#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn find(&self, params: &FindParams) -> EntityResult<Vec<Value>>;
    async fn find_by_id(&self, id: &str) -> EntityResult<Option<Value>>;
    async fn find_by_ids(&self, ids: &[String]) -> EntityResult<Vec<Value>>;
    async fn count(&self, params: &FindParams) -> EntityResult<u64>;
    async fn insert(&self, doc: Map<String, Value>) -> EntityResult<Value>;
    async fn insert_many(&self, docs: Vec<Map<String, Value>>) -> EntityResult<Vec<Value>>;
    /// Apply `changes` (storage dot path -> value) to one document.
    async fn update_by_id(
        &self,
        id: &str,
        changes: Map<String, Value>,
    ) -> EntityResult<Option<Value>>;
    /// Number of removed documents.
    async fn remove_by_id(&self, id: &str) -> EntityResult<u64>;
    fn id_column(&self) -> &str;
    fn backend_name(&self) -> &'static str;
}

#[derive(Clone)]
pub struct MemoryAdapter {
    id_column: String,
    docs: Arc<RwLock<Vec<Map<String, Value>>>>,
}

impl MemoryAdapter {
    pub fn new(id_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            docs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn doc_id(&self, doc: &Map<String, Value>) -> Option<String> {
        match get_path(doc, &self.id_column)? {
            Value::String(id) => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        }
    }

    fn prepare(
        &self,
        mut doc: Map<String, Value>,
        existing: &[Map<String, Value>],
    ) -> EntityResult<Map<String, Value>> {
        let id = match self.doc_id(&doc) {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().simple().to_string();
                set_path(&mut doc, &self.id_column, Value::String(id.clone()));
                id
            }
        };
        if existing
            .iter()
            .any(|other| self.doc_id(other).as_deref() == Some(id.as_str()))
        {
            return Err(EntityError::validation(
                self.id_column.clone(),
                format!("duplicate id `{id}`"),
            ));
        }
        Ok(doc)
    }
}

/// Equality with string filters matching numbers and booleans by text, as
/// URL query values always arrive as strings.
fn loosely_equal(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected) {
        (None, Value::Null) => true,
        (None, _) => false,
        (Some(actual), Value::String(text)) if !actual.is_string() => match actual {
            Value::Number(number) => number.to_string() == *text,
            Value::Bool(flag) => flag.to_string() == *text,
            _ => false,
        },
        (Some(actual), expected) => actual == expected,
    }
}

fn matches_search(doc: &Map<String, Value>, term: &str, fields: &[String]) -> bool {
    let term = term.to_lowercase();
    let contains = |value: Option<&Value>| {
        value
            .and_then(Value::as_str)
            .is_some_and(|text| text.to_lowercase().contains(&term))
    };
    if fields.is_empty() {
        doc.values().any(|value| contains(Some(value)))
    } else {
        fields.iter().any(|field| contains(get_path(doc, field)))
    }
}

fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

fn filter_docs<'a>(
    docs: &'a [Map<String, Value>],
    params: &'a FindParams,
) -> impl Iterator<Item = &'a Map<String, Value>> + 'a {
    docs.iter().filter(move |doc| {
        params
            .query
            .iter()
            .all(|(path, expected)| loosely_equal(get_path(doc, path), expected))
            && params
                .search
                .as_deref()
                .is_none_or(|term| matches_search(doc, term, &params.search_fields))
    })
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    async fn find(&self, params: &FindParams) -> EntityResult<Vec<Value>> {
        let docs = self.docs.read().await;
        let mut found: Vec<&Map<String, Value>> = filter_docs(&docs, params).collect();
        if !params.sort.is_empty() {
            found.sort_by(|a, b| {
                for key in &params.sort {
                    let (path, descending) = match key.strip_prefix('-') {
                        Some(path) => (path, true),
                        None => (key.as_str(), false),
                    };
                    let ordering = compare_values(get_path(a, path), get_path(b, path));
                    let ordering = if descending { ordering.reverse() } else { ordering };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }
        let offset = params.offset.unwrap_or(0) as usize;
        let limit = params.limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(found
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|doc| Value::Object(doc.clone()))
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> EntityResult<Option<Value>> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .find(|doc| self.doc_id(doc).as_deref() == Some(id))
            .map(|doc| Value::Object(doc.clone())))
    }

    async fn find_by_ids(&self, ids: &[String]) -> EntityResult<Vec<Value>> {
        let docs = self.docs.read().await;
        Ok(docs
            .iter()
            .filter(|doc| self.doc_id(doc).is_some_and(|id| ids.contains(&id)))
            .map(|doc| Value::Object(doc.clone()))
            .collect())
    }

    async fn count(&self, params: &FindParams) -> EntityResult<u64> {
        let docs = self.docs.read().await;
        Ok(filter_docs(&docs, params).count() as u64)
    }

    async fn insert(&self, doc: Map<String, Value>) -> EntityResult<Value> {
        let mut docs = self.docs.write().await;
        let doc = self.prepare(doc, &docs)?;
        docs.push(doc.clone());
        Ok(Value::Object(doc))
    }

    async fn insert_many(&self, batch: Vec<Map<String, Value>>) -> EntityResult<Vec<Value>> {
        let mut docs = self.docs.write().await;
        let mut prepared: Vec<Map<String, Value>> = Vec::with_capacity(batch.len());
        for doc in batch {
            let doc = self.prepare(doc, &docs)?;
            let doc = self.prepare(doc, &prepared)?;
            prepared.push(doc);
        }
        docs.extend(prepared.iter().cloned());
        Ok(prepared.into_iter().map(Value::Object).collect())
    }

    async fn update_by_id(
        &self,
        id: &str,
        changes: Map<String, Value>,
    ) -> EntityResult<Option<Value>> {
        let mut docs = self.docs.write().await;
        let Some(doc) = docs
            .iter_mut()
            .find(|doc| self.doc_id(doc).as_deref() == Some(id))
        else {
            return Ok(None);
        };
        for (path, value) in changes {
            set_path(doc, &path, value);
        }
        Ok(Some(Value::Object(doc.clone())))
    }

    async fn remove_by_id(&self, id: &str) -> EntityResult<u64> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|doc| self.doc_id(doc).as_deref() != Some(id));
        Ok((before - docs.len()) as u64)
    }

    fn id_column(&self) -> &str {
        &self.id_column
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
