//! Declarative field and entity schemas.
//!
//! # Purpose
//! Describes each entity attribute once at service start: type, visibility,
//! authorization items, write rules and per-field hooks. Schemas are
//! immutable while requests are handled.
//!
//! # Key invariants
//! - `name` is the public dot path; `column` is the storage dot path and
//!   defaults to `name`.
//! - Hooks are either a constant or a callable, resolved uniformly through
//!   [`FieldHook::resolve`]. A hook result of `None` means "undefined".
//! - Populate rules are normalized at construction into an action call or a
//!   handler function.
//! - An [`EntitySchema`] has exactly one primary key and unique field names.
use crate::context::RequestContext;
use crate::errors::{EntityError, EntityResult};
use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Arguments handed to a hook: the incoming or stored value, a snapshot of
/// the entity being processed, and the caller.
#[derive(Debug, Clone)]
pub struct HookInput {
    pub value: Option<Value>,
    pub entity: Map<String, Value>,
    pub ctx: RequestContext,
}

pub type HookFuture = BoxFuture<'static, EntityResult<Option<Value>>>;
pub type HookFn = Arc<dyn Fn(HookInput) -> HookFuture + Send + Sync>;

#[derive(Clone)]
pub enum FieldHook {
    Value(Value),
    Compute(HookFn),
}

impl FieldHook {
    pub fn value(value: impl Into<Value>) -> Self {
        FieldHook::Value(value.into())
    }

    pub fn sync<F>(hook: F) -> Self
    where
        F: Fn(HookInput) -> EntityResult<Option<Value>> + Send + Sync + 'static,
    {
        FieldHook::Compute(Arc::new(move |input| {
            let output = hook(input);
            Box::pin(async move { output })
        }))
    }

    pub fn from_async<F, Fut>(hook: F) -> Self
    where
        F: Fn(HookInput) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = EntityResult<Option<Value>>> + Send + 'static,
    {
        FieldHook::Compute(Arc::new(move |input| Box::pin(hook(input))))
    }

    pub async fn resolve(&self, input: HookInput) -> EntityResult<Option<Value>> {
        match self {
            FieldHook::Value(value) => Ok(Some(value.clone())),
            FieldHook::Compute(hook) => hook(input).await,
        }
    }
}

impl fmt::Debug for FieldHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldHook::Value(value) => f.debug_tuple("Value").field(value).finish(),
            FieldHook::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

pub type PopulateFuture = BoxFuture<'static, EntityResult<HashMap<String, Value>>>;
pub type PopulateFn = Arc<dyn Fn(Vec<String>, RequestContext) -> PopulateFuture + Send + Sync>;

/// How a stored reference is turned into the referenced object.
#[derive(Clone)]
pub enum PopulateRule {
    /// Batched `resolve_by_ids` call against another service's action.
    Action {
        action: String,
        params: Map<String, Value>,
    },
    /// Custom batched lookup returning id -> object.
    Handler(PopulateFn),
}

impl PopulateRule {
    pub fn action(action: impl Into<String>) -> Self {
        PopulateRule::Action {
            action: action.into(),
            params: Map::new(),
        }
    }

    pub fn action_with_params(action: impl Into<String>, params: Map<String, Value>) -> Self {
        PopulateRule::Action {
            action: action.into(),
            params,
        }
    }

    pub fn handler<F, Fut>(handler: F) -> Self
    where
        F: Fn(Vec<String>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = EntityResult<HashMap<String, Value>>> + Send + 'static,
    {
        PopulateRule::Handler(Arc::new(move |ids, ctx| Box::pin(handler(ids, ctx))))
    }
}

impl fmt::Debug for PopulateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopulateRule::Action { action, params } => f
                .debug_struct("Action")
                .field("action", action)
                .field("params", params)
                .finish(),
            PopulateRule::Handler(_) => f.write_str("Handler(..)"),
        }
    }
}

pub type ValidateFn = Arc<dyn Fn(&Value) -> Result<(), String> + Send + Sync>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldKind {
    #[default]
    Any,
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl FieldKind {
    /// Whether `value` may be written to a field of this kind. `null` is
    /// always accepted.
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (FieldKind::Any, _) => true,
            (FieldKind::String, Value::String(_))
            | (FieldKind::Number, Value::Number(_))
            | (FieldKind::Boolean, Value::Bool(_))
            | (FieldKind::Object, Value::Object(_))
            | (FieldKind::Array, Value::Array(_)) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Any => "any",
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::Object => "object",
            FieldKind::Array => "array",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trim {
    Both,
    Left,
    Right,
}

impl Trim {
    pub fn apply(self, value: &str) -> String {
        match self {
            Trim::Both => value.trim(),
            Trim::Left => value.trim_start(),
            Trim::Right => value.trim_end(),
        }
        .to_string()
    }
}

#[derive(Clone)]
pub struct FieldSchema {
    pub name: String,
    pub column: Option<String>,
    pub kind: FieldKind,
    pub primary_key: bool,
    pub secure: bool,
    pub hidden: bool,
    pub readonly: bool,
    pub required: bool,
    pub updateable: bool,
    pub trim: Option<Trim>,
    /// Items checked for writes, and for reads when `read_permissions` is unset.
    pub permissions: Option<Vec<String>>,
    pub read_permissions: Option<Vec<String>>,
    pub default: Option<FieldHook>,
    pub set: Option<FieldHook>,
    pub set_on_create: Option<FieldHook>,
    pub set_on_update: Option<FieldHook>,
    pub get: Option<FieldHook>,
    pub populate: Option<PopulateRule>,
    pub validate: Option<ValidateFn>,
}

fn owned_items<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            column: None,
            kind,
            primary_key: false,
            secure: false,
            hidden: false,
            readonly: false,
            required: false,
            updateable: true,
            trim: None,
            permissions: None,
            read_permissions: None,
            default: None,
            set: None,
            set_on_create: None,
            set_on_update: None,
            get: None,
            populate: None,
            validate: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    /// Storage path, falling back to the public name.
    pub fn storage_path(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn not_updateable(mut self) -> Self {
        self.updateable = false;
        self
    }

    pub fn trim(mut self, trim: Trim) -> Self {
        self.trim = Some(trim);
        self
    }

    pub fn permissions<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = Some(owned_items(items));
        self
    }

    pub fn read_permissions<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read_permissions = Some(owned_items(items));
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldHook::value(value));
        self
    }

    pub fn default_with(mut self, hook: FieldHook) -> Self {
        self.default = Some(hook);
        self
    }

    pub fn on_set(mut self, hook: FieldHook) -> Self {
        self.set = Some(hook);
        self
    }

    pub fn on_create(mut self, hook: FieldHook) -> Self {
        self.set_on_create = Some(hook);
        self
    }

    pub fn on_update(mut self, hook: FieldHook) -> Self {
        self.set_on_update = Some(hook);
        self
    }

    pub fn getter(mut self, hook: FieldHook) -> Self {
        self.get = Some(hook);
        self
    }

    pub fn populate(mut self, rule: PopulateRule) -> Self {
        self.populate = Some(rule);
        self
    }

    pub fn validator<F>(mut self, check: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(check));
        self
    }

    /// Whether a caller-supplied value may be written.
    pub(crate) fn writable(&self, is_new: bool) -> bool {
        !self.readonly && (is_new || self.updateable)
    }

    /// Set hook that applies to this write, by priority.
    pub(crate) fn set_hook(&self, is_new: bool) -> Option<&FieldHook> {
        let specific = if is_new {
            self.set_on_create.as_ref()
        } else {
            self.set_on_update.as_ref()
        };
        specific.or(self.set.as_ref())
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("kind", &self.kind)
            .field("primary_key", &self.primary_key)
            .field("permissions", &self.permissions)
            .field("read_permissions", &self.read_permissions)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct EntitySchema {
    name: String,
    fields: Vec<FieldSchema>,
    primary_key: usize,
    action_permissions: HashMap<String, Vec<String>>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> EntityResult<Self> {
        let name = name.into();
        let schema_error = |message: String| EntityError::Schema {
            entity: name.clone(),
            message,
        };

        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(schema_error("field with empty name".to_string()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(schema_error(format!("duplicate field `{}`", field.name)));
            }
        }
        let keys: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, field)| field.primary_key)
            .map(|(idx, _)| idx)
            .collect();
        let [primary_key] = keys.as_slice() else {
            return Err(schema_error(format!(
                "expected exactly one primary key, found {}",
                keys.len()
            )));
        };
        let primary_key = *primary_key;

        Ok(Self {
            name,
            fields,
            primary_key,
            action_permissions: HashMap::new(),
        })
    }

    /// Override the access items for one action.
    pub fn with_action_permissions<I, S>(mut self, action: &str, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.action_permissions
            .insert(action.to_string(), owned_items(items));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn primary_key(&self) -> &FieldSchema {
        &self.fields[self.primary_key]
    }

    /// Items a caller must pass for `action`; `"{entity}.{action}"` unless
    /// overridden. An empty list means the action is unrestricted.
    pub fn action_permissions(&self, action: &str) -> Vec<String> {
        self.action_permissions
            .get(action)
            .cloned()
            .unwrap_or_else(|| vec![format!("{}.{}", self.name, action)])
    }
}
