//! Condition compiler.
//!
//! Turns loosely shaped filter input into a parameterized SQL predicate:
//!
//! - [`Condition`] is the parsed shape (`MatchAll`, `ById`, `ByFields`).
//! - [`key`] splits `"age >="` style keys into property and operator.
//! - [`builder`] accumulates fragments and parameters in lock step.
//! - [`compiler`] routes a condition to the primary-key or document builder.

pub mod builder;
pub mod compiler;
pub mod key;

pub use builder::{CompiledPredicate, PredicateBuilder, PredicateTarget};
pub use compiler::compile;
pub use key::{KeyExpr, Operator, parse_key};

use crate::core::{DbError, Result, Value};
use serde_json::Value as JsonValue;

/// Wildcard accepted wherever a condition is expected
pub const WILDCARD: &str = "*";

/// What a `find` should match.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    MatchAll,
    /// Equality on the primary key
    ById(Value),
    /// `(key expression, value)` pairs, AND-joined in order
    ByFields(Vec<(String, Value)>),
}

impl Condition {
    pub fn by_id(id: impl Into<Value>) -> Self {
        Self::ById(id.into())
    }

    pub fn fields<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let fields: Vec<(String, Value)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if fields.is_empty() {
            Self::MatchAll
        } else {
            Self::ByFields(fields)
        }
    }

    /// Parse caller-supplied JSON into a condition.
    ///
    /// `null`, `""`, `"*"` and `{}` match everything; other strings and numbers
    /// are primary-key values; objects are field conditions.
    pub fn parse(input: &JsonValue) -> Result<Self> {
        match input {
            JsonValue::Null => Ok(Self::MatchAll),
            JsonValue::String(s) if s.is_empty() || s == WILDCARD => Ok(Self::MatchAll),
            JsonValue::String(s) => Ok(Self::ById(Value::Text(s.clone()))),
            JsonValue::Number(_) => Ok(Self::ById(Value::from_json(input))),
            JsonValue::Object(map) => Ok(Self::fields(
                map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))),
            )),
            JsonValue::Bool(_) | JsonValue::Array(_) => Err(DbError::invalid(format!(
                "Unsupported condition: {}",
                input
            ))),
        }
    }
}

impl From<&str> for Condition {
    fn from(s: &str) -> Self {
        if s.is_empty() || s == WILDCARD {
            Self::MatchAll
        } else {
            Self::ById(Value::Text(s.to_string()))
        }
    }
}

impl From<i64> for Condition {
    fn from(id: i64) -> Self {
        Self::ById(Value::Integer(id))
    }
}
