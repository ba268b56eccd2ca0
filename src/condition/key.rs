use regex::Regex;
use std::fmt;
use crate::core::{DbError, Result};

lazy_static::lazy_static! {
    // Two-character operators first so `<=` is not read as `<` followed by `=`.
    static ref OPERATOR: Regex = Regex::new("<=|>=|!=|<>|=|<|>").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl Operator {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "=" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::NotEq),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::LtEq),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::GtEq),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }

    pub fn is_ordering(&self) -> bool {
        !matches!(self, Self::Eq | Self::NotEq)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A condition key split into the property it names and its embedded operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyExpr {
    pub property: String,
    pub operator: Option<Operator>,
}

impl KeyExpr {
    /// Operator to render; a bare key means equality.
    pub fn effective_operator(&self) -> Operator {
        self.operator.unwrap_or(Operator::Eq)
    }
}

/// Parse `"age >="` into property `age` and operator `>=`.
///
/// Anything that is not one of the recognised operators stays part of the
/// property name. A key carrying two operators is rejected.
pub fn parse_key(key: &str) -> Result<KeyExpr> {
    let found: Vec<_> = OPERATOR.find_iter(key).collect();

    let (property, operator) = match found.as_slice() {
        [] => (key.trim().to_string(), None),
        [m] => {
            let property = format!("{}{}", &key[..m.start()], &key[m.end()..]);
            (property.trim().to_string(), Operator::from_symbol(m.as_str()))
        }
        _ => {
            return Err(DbError::invalid(format!(
                "Condition key '{}' contains more than one operator",
                key
            )));
        }
    };

    if property.is_empty() {
        return Err(DbError::invalid(format!(
            "Condition key '{}' does not name a property",
            key
        )));
    }

    Ok(KeyExpr { property, operator })
}
