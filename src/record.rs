//! Record model and per-record decoration.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field storage for a single record.
pub type FieldMap = Map<String, Value>;

/// A single list entry.
///
/// Fields are an opaque mapping owned by the backing store; the engine
/// only coerces them to text for client-side search and sorting. The
/// flag and count decorations are transient, assigned by collaborators
/// after each fetch, and never serialized back to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable unique identifier assigned by the backing store.
    pub id: i64,

    #[serde(default)]
    pub fields: FieldMap,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub liked: bool,

    #[serde(skip)]
    pub bookmarked: bool,

    #[serde(skip)]
    pub comment_count: usize,

    #[serde(skip)]
    pub can_edit: bool,

    #[serde(skip)]
    pub can_delete: bool,
}

impl Record {
    /// Create a record with the given id and fields.
    pub fn new(id: i64, fields: FieldMap) -> Self {
        Self {
            id,
            fields,
            created_at: None,
            updated_at: None,
            liked: false,
            bookmarked: false,
            comment_count: 0,
            can_edit: false,
            can_delete: false,
        }
    }

    /// Set a field value, replacing any previous value.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Builder-style variant of [`Self::set_field`].
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set_field(name, value);
        self
    }

    /// Look up a field value by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Coerce a field to text, the way search and sorting see it.
    ///
    /// Arrays join their coerced elements with ", "; null and missing
    /// fields coerce to the empty string.
    pub fn field_text(&self, name: &str) -> String {
        match self.fields.get(name) {
            Some(value) => value_text(value),
            None => String::new(),
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => String::new(),
        Value::Object(_) => value.to_string(),
    }
}

/// Collaborator that enriches a fetched page before rendering.
///
/// Implementations compute derived fields, resolve attachments, or flag
/// per-record permissions. They receive the whole page at once so they
/// can batch their own lookups.
#[async_trait]
pub trait RecordDecorator: Send + Sync {
    async fn decorate(&self, records: Vec<Record>) -> Result<Vec<Record>>;
}
