//! Documents as seen by the migration engine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field name to value mapping carried by a document.
pub type Fields = Map<String, Value>;

/// Per-document instruction for a batched write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkCommand {
    /// Insert or overwrite.
    Index,
    /// Insert, failing on id collision.
    Create,
    /// Partial update.
    Update,
    /// Delete.
    Delete,
}

impl std::fmt::Display for BulkCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BulkCommand::Index => write!(f, "index"),
            BulkCommand::Create => write!(f, "create"),
            BulkCommand::Update => write!(f, "update"),
            BulkCommand::Delete => write!(f, "delete"),
        }
    }
}

/// A single record stored in an index.
///
/// Identity for upserts is `(index, doc_type, id)`. When `id` is `None` the
/// backend assigns one on write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Index the document lives in (or is written to).
    #[serde(default)]
    pub index: String,
    /// Document type tag.
    pub doc_type: String,
    /// Document identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Opaque field mapping.
    #[serde(default)]
    pub fields: Fields,
    /// Bulk command tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bulk_command: Option<BulkCommand>,
}

impl Document {
    /// Create an empty document of the given type.
    pub fn new(index: impl Into<String>, doc_type: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            doc_type: doc_type.into(),
            id: None,
            fields: Fields::new(),
            bulk_command: None,
        }
    }

    /// Set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set a single field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Replace the whole field mapping.
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// Set the bulk command tag.
    pub fn with_bulk_command(mut self, command: BulkCommand) -> Self {
        self.bulk_command = Some(command);
        self
    }

    /// Get a field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a field value as a string slice.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Set a field value, returning the previous one.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(name.into(), value.into())
    }

    /// Whether the document's key matches another document's key.
    pub(crate) fn same_key(&self, doc_type: &str, id: &str) -> bool {
        self.doc_type == doc_type && self.id.as_deref() == Some(id)
    }
}
