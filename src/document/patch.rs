use crate::core::{DbError, Result, Value};
use crate::sql;
use serde_json::{Map, Value as JsonValue};

/// A single-field mutation of a document body.
///
/// Paths are dotted (`address.city`); array elements are addressed by index
/// (`tags.0`), the same way `jsonb_set` treats them.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOperation {
    /// Create or replace the value at `path`
    Set { path: String, value: JsonValue },
    /// Insert into an array before `path`, or add a missing object key
    Insert { path: String, value: JsonValue },
    /// Append to the array at `path`, creating it when absent
    Push { path: String, value: JsonValue },
    /// Delete the value at `path`
    Remove { path: String },
}

impl PatchOperation {
    pub const SET: &'static str = "$set";
    pub const INSERT: &'static str = "$insert";
    pub const PUSH: &'static str = "$push";
    pub const REMOVE: &'static str = "$remove";

    /// Pull the patch out of an update payload (primary key already removed).
    ///
    /// Returns `None` when the payload carries no `$` key, which means a full
    /// body replace. More than one patch key, an unknown `$` key, or ordinary
    /// fields mixed with a patch are rejected.
    pub fn extract(payload: &Map<String, JsonValue>) -> Result<Option<Self>> {
        let patch_keys: Vec<&String> = payload.keys().filter(|k| k.starts_with('$')).collect();

        let key = match patch_keys.as_slice() {
            [] => return Ok(None),
            [key] => key.as_str(),
            _ => {
                return Err(DbError::invalid(format!(
                    "Only one patch operation is allowed per update, got {:?}",
                    patch_keys
                )));
            }
        };

        if payload.len() > 1 {
            return Err(DbError::invalid(format!(
                "'{}' cannot be combined with other fields",
                key
            )));
        }

        let argument = &payload[key];
        match key {
            Self::SET => single_entry(key, argument).map(|(path, value)| Some(Self::Set { path, value })),
            Self::INSERT => {
                single_entry(key, argument).map(|(path, value)| Some(Self::Insert { path, value }))
            }
            Self::PUSH => single_entry(key, argument).map(|(path, value)| Some(Self::Push { path, value })),
            Self::REMOVE => {
                let path = match argument {
                    JsonValue::String(path) => path.clone(),
                    JsonValue::Object(_) => single_entry(key, argument)?.0,
                    other => {
                        return Err(DbError::invalid(format!(
                            "'$remove' expects a path, got {}",
                            other
                        )));
                    }
                };
                Ok(Some(Self::Remove { path }))
            }
            other => Err(DbError::invalid(format!("Unknown patch operation '{}'", other))),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Set { path, .. }
            | Self::Insert { path, .. }
            | Self::Push { path, .. }
            | Self::Remove { path } => path,
        }
    }

    /// `update ... returning *` for this patch. Binds `$1` id, `$2` path, `$3` value.
    ///
    /// `$set`, `$insert` and `$push` first put an empty object at every missing
    /// parent of the path, since `jsonb_set` only ever creates the last key.
    pub fn statement(&self, table: &str, primary_key: &str, id: Value) -> Result<(String, Vec<Value>)> {
        let path = Value::Text(sql::text_array_path(self.path())?);
        let pk = sql::quote_ident(primary_key);

        let (assignment, params) = match self {
            Self::Set { value, .. } => (
                format!("jsonb_set({}, $2::text[], $3::jsonb, true)", with_parents(self.path())?),
                vec![id, path, serialized(value)?],
            ),
            Self::Insert { value, .. } => (
                format!("jsonb_insert({}, $2::text[], $3::jsonb)", with_parents(self.path())?),
                vec![id, path, serialized(value)?],
            ),
            Self::Push { value, .. } => (
                format!(
                    "jsonb_set({}, $2::text[], coalesce(body #> $2::text[], '[]'::jsonb) || jsonb_build_array($3::jsonb), true)",
                    with_parents(self.path())?
                ),
                vec![id, path, serialized(value)?],
            ),
            Self::Remove { .. } => ("body #- $2::text[]".to_string(), vec![id, path]),
        };

        let sql = format!(
            "update {} set body = {} where {} = $1 returning *",
            table, assignment, pk
        );
        Ok((sql, params))
    }
}

/// `body` with `coalesce(body #> prefix, '{}')` set at each parent prefix, outermost first.
fn with_parents(path: &str) -> Result<String> {
    let mut expr = String::from("body");
    for prefix in sql::parent_path_literals(path)? {
        expr = format!(
            "jsonb_set({}, {}, coalesce(body #> {}, '{{}}'::jsonb), true)",
            expr, prefix, prefix
        );
    }
    Ok(expr)
}

fn single_entry(key: &str, argument: &JsonValue) -> Result<(String, JsonValue)> {
    match argument {
        JsonValue::Object(map) if map.len() == 1 => {
            let (path, value) = map.iter().next().map(|(p, v)| (p.clone(), v.clone())).ok_or_else(
                || DbError::invalid(format!("'{}' expects exactly one path", key)),
            )?;
            sql::path_segments(&path)?;
            Ok((path, value))
        }
        _ => Err(DbError::invalid(format!(
            "'{}' expects an object with exactly one path, got {}",
            key, argument
        ))),
    }
}

fn serialized(value: &JsonValue) -> Result<Value> {
    Ok(Value::Text(serde_json::to_string(value)?))
}
