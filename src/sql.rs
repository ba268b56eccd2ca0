//! SQL text helpers shared by the predicate builders, the document layer and
//! the loader. Values never go through here; they are always bound as
//! parameters. Only identifiers and JSON key names are inlined.

use crate::core::{DbError, Result};

pub(crate) fn quote_ident(ident: &str) -> String {
    let escaped = ident.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Single-quoted SQL string literal
pub(crate) fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// `schema.name`, or just `name` when the schema is the default one.
pub(crate) fn qualified_name(schema: &str, name: &str, default_schema: &str) -> String {
    if schema == default_schema {
        name.to_string()
    } else {
        format!("{}.{}", schema, name)
    }
}

/// Quoted form of [`qualified_name`] for use in statements.
pub(crate) fn quoted_qualified_name(schema: &str, name: &str, default_schema: &str) -> String {
    if schema == default_schema {
        quote_ident(name)
    } else {
        format!("{}.{}", quote_ident(schema), quote_ident(name))
    }
}

/// Quoted `idx_<qualified name with dots as underscores>` for a document table.
pub(crate) fn search_index_name(qualified_name: &str) -> String {
    quote_ident(&format!("idx_{}", qualified_name.replace('.', "_")))
}

/// Split a dotted document path (`address.city`) into its segments.
pub(crate) fn path_segments(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(DbError::invalid(format!("Invalid document path '{}'", path)));
    }
    Ok(segments)
}

/// Field access into the `body` column.
///
/// `as_text` selects `->>` for the last hop (scalar as text) instead of `->`
/// (jsonb). `(body -> 'a' ->> 'b')` for `a.b`.
pub(crate) fn body_field(path: &str, as_text: bool) -> Result<String> {
    let segments = path_segments(path)?;
    let mut expr = String::from("(body");
    let last = segments.len() - 1;
    for (i, segment) in segments.iter().enumerate() {
        let arrow = if i == last && as_text { "->>" } else { "->" };
        expr.push_str(&format!(" {} {}", arrow, quote_literal(segment)));
    }
    expr.push(')');
    Ok(expr)
}

/// PostgreSQL text-array literal for a dotted path, bound as `$n::text[]`.
pub(crate) fn text_array_path(path: &str) -> Result<String> {
    Ok(text_array(&path_segments(path)?))
}

/// Inline `'{...}'::text[]` literals for every proper prefix of a dotted path,
/// shortest first. `a.b.c` gives the literals for `{a}` and `{a,b}`.
pub(crate) fn parent_path_literals(path: &str) -> Result<Vec<String>> {
    let segments = path_segments(path)?;
    Ok((1..segments.len())
        .map(|end| format!("{}::text[]", quote_literal(&text_array(&segments[..end]))))
        .collect())
}

fn text_array(segments: &[&str]) -> String {
    let elements: Vec<String> = segments
        .iter()
        .map(|s| format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("{{{}}}", elements.join(","))
}
