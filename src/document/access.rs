use super::format::{format_array, format_single};
use super::patch::PatchOperation;
use super::Document;
use crate::condition::{Condition, compile};
use crate::core::{DbError, Result, Value};
use crate::namespace::Table;
use crate::runner::QueryOptions;
use crate::sql;
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

/// Ordering, paging and projection for [`Table::find`].
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    /// Raw `order by` expression; defaults to the quoted primary key
    pub order: Option<String>,
    /// Defaults to the configured find limit (1000)
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    /// Column names; defaults to `*`. Documents need `id` and `body`.
    pub columns: Option<Vec<String>>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

/// Outcome of a find: primary-key lookups unwrap to a single document.
#[derive(Debug, Clone, PartialEq)]
pub enum FindResult {
    One(Option<Document>),
    Many(Vec<Document>),
}

impl FindResult {
    pub fn into_vec(self) -> Vec<Document> {
        match self {
            Self::One(doc) => doc.into_iter().collect(),
            Self::Many(docs) => docs,
        }
    }

    pub fn into_single(self) -> Option<Document> {
        match self {
            Self::One(doc) => doc,
            Self::Many(docs) => docs.into_iter().next(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::One(doc) => usize::from(doc.is_some()),
            Self::Many(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOperation {
    Insert,
    Update,
}

impl FromStr for SaveOperation {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            other => Err(DbError::invalid(format!(
                "Operation must be either 'update' or 'insert', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SaveOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Update => write!(f, "update"),
        }
    }
}

impl Table {
    /// Find documents matching `condition`.
    ///
    /// A primary-key lookup yields [`FindResult::One`]; anything else yields
    /// [`FindResult::Many`] in the requested order.
    pub async fn find(&self, condition: impl Into<Condition>, options: &FindOptions) -> Result<FindResult> {
        let condition = condition.into();
        let predicate = compile(&condition, self.primary_key())?;

        let columns = match &options.columns {
            Some(cols) if !cols.is_empty() => cols
                .iter()
                .map(|c| sql::quote_ident(c))
                .collect::<Vec<_>>()
                .join(", "),
            _ => "*".to_string(),
        };
        let order = options
            .order
            .clone()
            .unwrap_or_else(|| sql::quote_ident(self.primary_key()));
        let limit = options.limit.unwrap_or(self.find_limit());
        let offset = options.offset.unwrap_or(0);

        let sql = format!(
            "select {} from {}{} order by {} limit {} offset {}",
            columns,
            self.sql_name(),
            predicate.where_sql(),
            order,
            limit,
            offset
        );

        if predicate.is_primary_key_lookup {
            let result = self.execute(&sql, &predicate.params, QueryOptions::single()).await?;
            Ok(FindResult::One(format_single(&result)?))
        } else {
            let result = self.execute(&sql, &predicate.params, QueryOptions::default()).await?;
            Ok(FindResult::Many(format_array(&result)?))
        }
    }

    /// Parse a JSON condition (`"*"`, an id, or a field map) and find with it.
    pub async fn find_json(&self, condition: &JsonValue, options: &FindOptions) -> Result<FindResult> {
        let condition = Condition::parse(condition)?;
        self.find(condition, options).await
    }

    pub async fn find_by_id(&self, id: impl Into<Value>) -> Result<Option<Document>> {
        let result = self.find(Condition::ById(id.into()), &FindOptions::default()).await?;
        Ok(result.into_single())
    }

    /// Full-text search over one or more body fields, or the whole body when
    /// `keys` is `["*"]`.
    ///
    /// Several keys are concatenated with a space before building the
    /// `tsvector`; `term` goes through `to_tsquery`. Both use the `simple`
    /// configuration, so whole-body search matches the expression of the
    /// index a document table is created with.
    pub async fn search(&self, keys: &[&str], term: &str) -> Result<Vec<Document>> {
        if keys.is_empty() || term.trim().is_empty() {
            return Err(DbError::invalid("Need the keys to use and the term string"));
        }

        let tsv = match keys {
            ["*"] => "body::text".to_string(),
            _ => {
                let fields = keys
                    .iter()
                    .map(|key| sql::body_field(key, true))
                    .collect::<Result<Vec<_>>>()?;
                match fields.as_slice() {
                    [single] => single.clone(),
                    many => format!("concat({})", many.join(", ' ', ")),
                }
            }
        };

        let sql = format!(
            "select * from {} where to_tsvector('simple', {}) @@ to_tsquery('simple', $1)",
            self.sql_name(),
            tsv
        );
        let result = self
            .execute(&sql, &[Value::Text(term.to_string())], QueryOptions::default())
            .await?;
        format_array(&result)
    }

    pub async fn insert(&self, document: JsonValue) -> Result<Document> {
        self.save(SaveOperation::Insert, document).await
    }

    /// Replace the body of, or patch, the document named by the payload's primary key.
    pub async fn update(&self, document: JsonValue) -> Result<Document> {
        self.save(SaveOperation::Update, document).await
    }

    pub async fn update_by_id(&self, id: impl Into<Value>, document: JsonValue) -> Result<Document> {
        let mut payload = into_object(document)?;
        payload.insert(self.primary_key().to_string(), id.into().to_json());
        self.save(SaveOperation::Update, JsonValue::Object(payload)).await
    }

    /// Insert or update a document.
    ///
    /// Inserts take the id from the payload's primary-key field or generate one.
    /// Updates need the id, and either carry exactly one patch key (`$set`,
    /// `$insert`, `$push`, `$remove`) or replace the whole body. The stored row
    /// is returned as a document.
    pub async fn save(&self, operation: SaveOperation, document: JsonValue) -> Result<Document> {
        let mut body = into_object(document)?;
        let pk = self.primary_key();

        let supplied = body
            .remove(pk)
            .map(|v| Value::from_json(&v))
            .filter(|v| !v.is_blank());
        if let Some(Value::Json(id)) = &supplied {
            return Err(DbError::invalid(format!("Primary key must be a scalar, got {}", id)));
        }

        let (sql, params, id) = match operation {
            SaveOperation::Insert => {
                let id = supplied.unwrap_or_else(|| self.generate_id());
                if id.is_blank() {
                    return Err(DbError::invalid("Id generator produced an empty id"));
                }
                let sql = format!(
                    "insert into {} ({}, body) values ($1, $2) returning *",
                    self.sql_name(),
                    sql::quote_ident(pk)
                );
                (sql, vec![id.clone(), Value::Json(JsonValue::Object(body))], id)
            }
            SaveOperation::Update => {
                let id = supplied.ok_or_else(|| {
                    DbError::invalid(format!("Update requires the primary key '{}'", pk))
                })?;
                match PatchOperation::extract(&body)? {
                    Some(patch) => {
                        let (sql, params) = patch.statement(self.sql_name(), pk, id.clone())?;
                        (sql, params, id)
                    }
                    None => {
                        let sql = format!(
                            "update {} set body = $2 where {} = $1 returning *",
                            self.sql_name(),
                            sql::quote_ident(pk)
                        );
                        (sql, vec![id.clone(), Value::Json(JsonValue::Object(body))], id)
                    }
                }
            }
        };

        let result = self.execute(&sql, &params, QueryOptions::single()).await?;
        format_single(&result)?.ok_or_else(|| DbError::DocumentNotFound(id.to_string()))
    }
}

fn into_object(document: JsonValue) -> Result<Map<String, JsonValue>> {
    match document {
        JsonValue::Object(map) => Ok(map),
        other => Err(DbError::invalid(format!(
            "Please pass in the document for saving as an object, got {}",
            other
        ))),
    }
}
