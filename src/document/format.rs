//! Shapes `(id, body)` rows into documents.

use super::Document;
use crate::core::{DbError, Result, Row, Value};
use crate::result::QueryResult;
use serde_json::{Map, Value as JsonValue};

pub const ID_COLUMN: &str = "id";
pub const BODY_COLUMN: &str = "body";

/// Parse the row's `body` and merge its `id` into it.
///
/// The body may come back as text or as an already decoded JSON cell. Anything
/// that is not a JSON object is a malformed document.
pub fn format_document(result: &QueryResult, row: &Row) -> Result<Document> {
    let id = result
        .get(row, ID_COLUMN)
        .ok_or_else(|| DbError::MalformedDocument("row has no 'id' column".to_string()))?;
    let body = result
        .get(row, BODY_COLUMN)
        .ok_or_else(|| DbError::MalformedDocument("row has no 'body' column".to_string()))?;

    let mut fields = parse_body(body)?;
    fields.insert(ID_COLUMN.to_string(), id.to_json());
    Ok(Document::from_map(fields))
}

/// Every row as a document, in row order. No rows gives an empty vector.
pub fn format_array(result: &QueryResult) -> Result<Vec<Document>> {
    result
        .rows()
        .iter()
        .map(|row| format_document(result, row))
        .collect()
}

/// The first row as a document, if there is one.
pub fn format_single(result: &QueryResult) -> Result<Option<Document>> {
    result
        .rows()
        .first()
        .map(|row| format_document(result, row))
        .transpose()
}

fn parse_body(body: &Value) -> Result<Map<String, JsonValue>> {
    let parsed = match body {
        Value::Text(text) => serde_json::from_str::<JsonValue>(text)?,
        Value::Json(json) => json.clone(),
        other => {
            return Err(DbError::MalformedDocument(format!(
                "body has type {}",
                other.type_name()
            )));
        }
    };

    match parsed {
        JsonValue::Object(map) => Ok(map),
        other => Err(DbError::MalformedDocument(format!(
            "body is not a JSON object: {}",
            other
        ))),
    }
}
