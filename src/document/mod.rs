//! Document store emulation over `(id, body jsonb)` tables.
//!
//! - `format.rs` - rows to documents
//! - `patch.rs` - `$set` / `$insert` / `$push` / `$remove`
//! - `access.rs` - `find`, `search`, `insert`, `update`, `save` on [`Table`](crate::Table)

mod access;
pub mod format;
pub mod patch;

pub use access::{FindOptions, FindResult, SaveOperation};
pub use format::{format_array, format_document, format_single};
pub use patch::PatchOperation;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::ops::Deref;

/// A document: the body's fields plus its `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, JsonValue>);

impl Document {
    pub fn from_map(fields: Map<String, JsonValue>) -> Self {
        Self(fields)
    }

    pub fn id(&self) -> Option<&JsonValue> {
        self.0.get(format::ID_COLUMN)
    }

    /// Value at a dotted path, e.g. `address.city`.
    pub fn pointer(&self, path: &str) -> Option<&JsonValue> {
        let mut segments = path.split('.');
        let first = self.0.get(segments.next()?)?;
        segments.try_fold(first, |current, segment| match current {
            JsonValue::Object(map) => map.get(segment),
            JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.0.clone())
    }
}

impl Deref for Document {
    type Target = Map<String, JsonValue>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Document> for JsonValue {
    fn from(doc: Document) -> Self {
        JsonValue::Object(doc.0)
    }
}
