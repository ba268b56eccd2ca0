//! Schema and table filters applied while loading the catalog.
//!
//! Filters arrive as comma-delimited strings or lists. Table patterns use SQL
//! `LIKE` syntax (`%` any run, `_` one character, `\` escape) and also accept
//! `*` as a synonym for `%`.

use crate::core::{DbError, Result, Value};
use regex::Regex;

/// A list of filter entries, normalised from either a comma-delimited string
/// or a sequence of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterList(Vec<String>);

impl FilterList {
    pub fn parse(input: &str) -> Self {
        Self(
            input
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-delimited form sent to the discovery queries; empty means "no filter".
    pub fn to_param(&self) -> String {
        self.0.join(",")
    }
}

impl From<&str> for FilterList {
    fn from(input: &str) -> Self {
        Self::parse(input)
    }
}

impl From<String> for FilterList {
    fn from(input: String) -> Self {
        Self::parse(&input)
    }
}

impl From<Vec<String>> for FilterList {
    fn from(items: Vec<String>) -> Self {
        Self::parse(&items.join(","))
    }
}

impl From<Vec<&str>> for FilterList {
    fn from(items: Vec<&str>) -> Self {
        Self::parse(&items.join(","))
    }
}

impl From<&[&str]> for FilterList {
    fn from(items: &[&str]) -> Self {
        Self::parse(&items.join(","))
    }
}

/// Allowed schemas. Empty, `all` and `*` allow every schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaFilter(FilterList);

impl SchemaFilter {
    pub fn new(list: &FilterList) -> Self {
        let unrestricted = list
            .entries()
            .iter()
            .any(|s| s == "*" || s.eq_ignore_ascii_case("all"));
        if unrestricted {
            Self(FilterList::default())
        } else {
            Self(list.clone())
        }
    }

    pub fn allows(&self, schema: &str) -> bool {
        self.0.is_empty() || self.0.entries().iter().any(|s| s == schema)
    }

    pub fn to_param(&self) -> String {
        self.0.to_param()
    }
}

/// Compiled table-name patterns.
#[derive(Debug, Clone, Default)]
pub struct TablePatterns {
    source: FilterList,
    patterns: Vec<Regex>,
}

impl TablePatterns {
    pub fn compile(list: &FilterList) -> Result<Self> {
        let patterns = list
            .entries()
            .iter()
            .map(|p| {
                Regex::new(&like_to_regex(p))
                    .map_err(|e| DbError::ConfigError(format!("Invalid table pattern '{}': {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: list.clone(),
            patterns,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True when any pattern matches the bare table name or `schema.name`.
    pub fn matches(&self, schema: &str, name: &str) -> bool {
        let qualified = format!("{}.{}", schema, name);
        self.patterns
            .iter()
            .any(|re| re.is_match(name) || re.is_match(&qualified))
    }

    pub fn to_param(&self) -> String {
        self.source.to_param()
    }
}

/// Everything that decides whether a discovered table gets bound.
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    pub schemas: SchemaFilter,
    pub blacklist: TablePatterns,
    pub exceptions: TablePatterns,
    /// When set, only matching tables are loaded and the other filters are ignored
    pub whitelist: Option<TablePatterns>,
}

impl TableFilter {
    pub fn new(
        schemas: &FilterList,
        blacklist: &FilterList,
        exceptions: &FilterList,
        whitelist: Option<&FilterList>,
    ) -> Result<Self> {
        Ok(Self {
            schemas: SchemaFilter::new(schemas),
            blacklist: TablePatterns::compile(blacklist)?,
            exceptions: TablePatterns::compile(exceptions)?,
            whitelist: whitelist
                .filter(|w| !w.is_empty())
                .map(TablePatterns::compile)
                .transpose()?,
        })
    }

    /// Exceptions win over both the schema filter and the blacklist.
    pub fn allows(&self, schema: &str, name: &str) -> bool {
        if let Some(whitelist) = &self.whitelist {
            return whitelist.matches(schema, name);
        }
        if self.exceptions.matches(schema, name) {
            return true;
        }
        self.schemas.allows(schema) && !self.blacklist.matches(schema, name)
    }

    pub fn is_whitelist(&self) -> bool {
        self.whitelist.is_some()
    }

    /// Parameters for the discovery query: `[whitelist]`, or `[schemas, blacklist, exceptions]`.
    pub fn query_params(&self) -> Vec<Value> {
        match &self.whitelist {
            Some(whitelist) => vec![Value::Text(whitelist.to_param())],
            None => vec![
                Value::Text(self.schemas.to_param()),
                Value::Text(self.blacklist.to_param()),
                Value::Text(self.exceptions.to_param()),
            ],
        }
    }
}

/// Convert a LIKE pattern into an anchored regex
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '%' | '*' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                regex.push_str(&regex::escape(&chars[i].to_string()));
            }
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    regex.push('$');
    regex
}
