//! Find/list parameter normalization.
//!
//! # Purpose
//! Accepts loosely typed query parameters (comma-joined strings or lists,
//! numbers as strings) and produces [`FindParams`] ready for a storage
//! adapter, including page-based pagination.
//!
//! # Key invariants
//! - Normalization reads the caller's [`RawQuery`] and builds a new value;
//!   the input is never modified.
//! - `page` defaults to 1 and `pageSize` to the configured default; both
//!   `pageSize` and `limit` are clamped to their configured maxima.
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    pub default_page_size: u64,
    /// Zero disables the clamp.
    pub max_page_size: u64,
    /// Upper bound for `limit` on non-paginated finds. Zero means unlimited.
    pub max_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
            max_limit: 0,
        }
    }
}

/// Parameters as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuery {
    #[serde(default, deserialize_with = "string_or_list")]
    pub sort: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub fields: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub populate: Vec<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub search_fields: Vec<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub page_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub limit: Option<u64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub offset: Option<u64>,
    /// Equality filter keyed by dot path.
    #[serde(default)]
    pub query: Map<String, Value>,
}

/// Normalized parameters handed to storage and the transform pipeline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindParams {
    pub query: Map<String, Value>,
    pub sort: Vec<String>,
    pub fields: Vec<String>,
    pub populate: Vec<String>,
    pub search: Option<String>,
    pub search_fields: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl FindParams {
    /// Same filter without the window, for counting.
    pub fn without_window(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrList>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(StringOrList::One(value)) => split_list(&value).collect(),
        Some(StringOrList::Many(values)) => values.iter().flat_map(|v| split_list(v)).collect(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(u64),
    Text(String),
}

fn parse_number(value: &str) -> Result<Option<u64>, String> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| format!("expected a non-negative integer, got `{value}`"))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(value)) => Ok(Some(value)),
        Some(NumberOrText::Text(value)) => parse_number(&value).map_err(D::Error::custom),
    }
}

impl RawQuery {
    /// Build from URL query pairs. Unknown keys become equality filters.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut raw = RawQuery::default();
        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "sort" => raw.sort.extend(split_list(value)),
                "fields" => raw.fields.extend(split_list(value)),
                "populate" => raw.populate.extend(split_list(value)),
                "searchFields" => raw.search_fields.extend(split_list(value)),
                "search" => raw.search = Some(value.to_string()),
                "page" => raw.page = parse_number(value)?,
                "pageSize" => raw.page_size = parse_number(value)?,
                "limit" => raw.limit = parse_number(value)?,
                "offset" => raw.offset = parse_number(value)?,
                other => {
                    raw.query
                        .insert(other.to_string(), Value::String(value.to_string()));
                }
            }
        }
        Ok(raw)
    }

    /// Parse a populate rule's params object.
    pub fn from_params(params: &Map<String, Value>) -> Result<Self, String> {
        serde_json::from_value(Value::Object(params.clone())).map_err(|err| err.to_string())
    }
}

/// Normalize `raw`. With `paginate`, `page`/`pageSize` drive `limit`/`offset`.
pub fn normalize(raw: &RawQuery, config: &PaginationConfig, paginate: bool) -> FindParams {
    let mut params = FindParams {
        query: raw.query.clone(),
        sort: raw.sort.clone(),
        fields: raw.fields.clone(),
        populate: raw.populate.clone(),
        search: raw.search.clone().filter(|term| !term.is_empty()),
        search_fields: raw.search_fields.clone(),
        ..FindParams::default()
    };

    if paginate {
        let page = raw.page.unwrap_or(1).max(1);
        let mut page_size = raw
            .page_size
            .filter(|size| *size > 0)
            .unwrap_or(config.default_page_size);
        if config.max_page_size > 0 {
            page_size = page_size.min(config.max_page_size);
        }
        params.page = Some(page);
        params.page_size = Some(page_size);
        params.limit = Some(page_size);
        params.offset = Some((page - 1).saturating_mul(page_size));
    } else {
        params.limit = raw.limit.filter(|limit| *limit > 0);
        params.offset = raw.offset.filter(|offset| *offset > 0);
    }

    if config.max_limit > 0 {
        params.limit = Some(params.limit.map_or(config.max_limit, |limit| {
            limit.min(config.max_limit)
        }));
    }
    params
}
