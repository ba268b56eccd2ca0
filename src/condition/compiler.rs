use super::builder::{CompiledPredicate, PredicateBuilder, PredicateTarget};
use super::key::{KeyExpr, Operator, parse_key};
use super::Condition;
use crate::core::{DbError, Result, Value};
use crate::sql;

/// Compile `condition` against a table whose primary key column is `primary_key`.
///
/// A single key naming the primary key compiles to a plain column test; it is a
/// primary-key lookup unless an operator other than `=` was given. Any other
/// shape compiles to field access into the JSON body.
///
/// ```
/// use dbspace::condition::{compile, Condition};
///
/// let predicate = compile(&Condition::by_id("abc"), "id").unwrap();
/// assert_eq!(predicate.clause, "\"id\" = $1");
/// assert!(predicate.is_primary_key_lookup);
/// ```
pub fn compile(condition: &Condition, primary_key: &str) -> Result<CompiledPredicate> {
    match condition {
        Condition::MatchAll => Ok(CompiledPredicate::match_all()),
        Condition::ById(id) => column_predicate(
            &KeyExpr {
                property: primary_key.to_string(),
                operator: None,
            },
            id,
        ),
        Condition::ByFields(fields) => {
            let parsed = fields
                .iter()
                .map(|(key, value)| parse_key(key).map(|k| (k, value)))
                .collect::<Result<Vec<_>>>()?;

            match parsed.as_slice() {
                [] => Ok(CompiledPredicate::match_all()),
                [(key, value)] if key.property == primary_key => column_predicate(key, value),
                _ => body_predicate(&parsed),
            }
        }
    }
}

fn column_predicate(key: &KeyExpr, value: &Value) -> Result<CompiledPredicate> {
    let operator = key.effective_operator();
    let column = sql::quote_ident(&key.property);

    let mut builder = PredicateBuilder::new();
    push_comparison(&mut builder, column, operator, value.clone(), "")?;

    let lookup = operator == Operator::Eq;
    let predicate = builder.build(lookup, PredicateTarget::Column);
    Ok(predicate)
}

fn body_predicate(fields: &[(KeyExpr, &Value)]) -> Result<CompiledPredicate> {
    let mut builder = PredicateBuilder::new();

    for (key, value) in fields {
        let operator = key.effective_operator();
        match value {
            Value::Text(_) | Value::Null => {
                let field = sql::body_field(&key.property, true)?;
                push_comparison(&mut builder, field, operator, (*value).clone(), "")?;
            }
            Value::Json(_) => {
                let field = sql::body_field(&key.property, false)?;
                push_comparison(&mut builder, field, operator, (*value).clone(), "::jsonb")?;
            }
            // Scalar equality compares jsonb values and never casts.
            Value::Integer(_) | Value::Float(_) | Value::Boolean(_) if !operator.is_ordering() => {
                let field = sql::body_field(&key.property, false)?;
                let json = Value::Json(value.to_json());
                push_comparison(&mut builder, field, operator, json, "::jsonb")?;
            }
            Value::Integer(_) | Value::Float(_) => {
                let field = guarded_cast(&key.property, "number", "numeric")?;
                push_comparison(&mut builder, field, operator, (*value).clone(), "")?;
            }
            Value::Boolean(_) => {
                let field = guarded_cast(&key.property, "boolean", "boolean")?;
                push_comparison(&mut builder, field, operator, (*value).clone(), "")?;
            }
        }
    }

    Ok(builder.build(false, PredicateTarget::Body))
}

/// Cast the field only when its JSON type allows it; other rows compare as null.
fn guarded_cast(path: &str, json_type: &str, sql_type: &str) -> Result<String> {
    Ok(format!(
        "(case when jsonb_typeof({}) = '{}' then {}::{} end)",
        sql::body_field(path, false)?,
        json_type,
        sql::body_field(path, true)?,
        sql_type
    ))
}

/// `lhs <op> $n<cast>`, or `lhs is [not] null` for a null value.
fn push_comparison(
    builder: &mut PredicateBuilder,
    lhs: String,
    operator: Operator,
    value: Value,
    cast: &str,
) -> Result<()> {
    if value.is_null() {
        let test = match operator {
            Operator::Eq => "is null",
            Operator::NotEq => "is not null",
            other => {
                return Err(DbError::invalid(format!(
                    "Operator '{}' cannot be used with a null value",
                    other
                )));
            }
        };
        builder.push_unbound(format!("{} {}", lhs, test));
        return Ok(());
    }

    builder.push_bound(value, |placeholder| {
        format!("{} {} {}{}", lhs, operator.as_sql(), placeholder, cast)
    });
    Ok(())
}
