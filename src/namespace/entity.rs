use crate::core::{DbError, Result, Value};
use crate::id::IdGenerator;
use crate::result::QueryResult;
use crate::runner::{QueryOptions, Runner};
use crate::sql;
use log::debug;
use std::fmt;
use std::sync::Arc;

/// Primary key assumed for document tables whose key was not discovered
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// What every bound entity shares with its database: the runner, the id
/// generator and a few settings.
#[derive(Clone)]
pub struct DbContext {
    pub runner: Arc<dyn Runner>,
    pub id_generator: Arc<dyn IdGenerator>,
    pub default_schema: String,
    pub find_limit: u64,
}

impl DbContext {
    /// Log and hand a statement to the runner.
    pub(crate) async fn execute(
        &self,
        sql: &str,
        params: &[Value],
        options: QueryOptions,
    ) -> Result<QueryResult> {
        debug!("Executing query: {} with {} param(s)", sql, params.len());
        self.runner.execute(sql, params, options).await
    }
}

/// A table as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub schema: String,
    pub name: String,
    /// `None` for tables without a primary key; document tables fall back to `id`
    pub primary_key: Option<String>,
}

/// A stored function as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub schema: String,
    pub name: String,
    pub param_count: usize,
}

/// A bound table. Document operations live in `document::access`.
pub struct Table {
    schema: String,
    name: String,
    primary_key: String,
    qualified_name: String,
    sql_name: String,
    context: DbContext,
}

impl Table {
    pub fn new(descriptor: TableDescriptor, context: DbContext) -> Self {
        let default_schema = context.default_schema.as_str();
        let qualified_name = sql::qualified_name(&descriptor.schema, &descriptor.name, default_schema);
        let sql_name = sql::quoted_qualified_name(&descriptor.schema, &descriptor.name, default_schema);

        Self {
            primary_key: descriptor
                .primary_key
                .unwrap_or_else(|| DEFAULT_PRIMARY_KEY.to_string()),
            schema: descriptor.schema,
            name: descriptor.name,
            qualified_name,
            sql_name,
            context,
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// `name` in the default schema, `schema.name` elsewhere
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Quoted form of the qualified name, as used in generated statements
    pub fn sql_name(&self) -> &str {
        &self.sql_name
    }

    pub(crate) fn find_limit(&self) -> u64 {
        self.context.find_limit
    }

    pub(crate) fn generate_id(&self) -> Value {
        self.context.id_generator.generate_id()
    }

    pub(crate) async fn execute(
        &self,
        sql: &str,
        params: &[Value],
        options: QueryOptions,
    ) -> Result<QueryResult> {
        self.context.execute(sql, params, options).await
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("schema", &self.schema)
            .field("name", &self.name)
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

/// A bound stored function, invoked as `select * from fn($1, ..., $n)`.
pub struct Function {
    schema: String,
    name: String,
    param_count: usize,
    qualified_name: String,
    sql: String,
    context: DbContext,
}

impl Function {
    pub fn new(descriptor: FunctionDescriptor, context: DbContext) -> Self {
        let default_schema = context.default_schema.as_str();
        let qualified_name = sql::qualified_name(&descriptor.schema, &descriptor.name, default_schema);
        let placeholders: Vec<String> = (1..=descriptor.param_count).map(|i| format!("${}", i)).collect();
        let sql = format!(
            "select * from {}({})",
            sql::quoted_qualified_name(&descriptor.schema, &descriptor.name, default_schema),
            placeholders.join(",")
        );

        Self {
            schema: descriptor.schema,
            name: descriptor.name,
            param_count: descriptor.param_count,
            qualified_name,
            sql,
            context,
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub async fn invoke(&self, args: &[Value]) -> Result<QueryResult> {
        if args.len() != self.param_count {
            return Err(DbError::invalid(format!(
                "Function '{}' takes {} argument(s), got {}",
                self.qualified_name,
                self.param_count,
                args.len()
            )));
        }
        self.context.execute(&self.sql, args, QueryOptions::default()).await
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("schema", &self.schema)
            .field("name", &self.name)
            .field("param_count", &self.param_count)
            .finish()
    }
}

/// Anything that can be bound into the namespace.
#[derive(Debug, Clone)]
pub enum Entity {
    Table(Arc<Table>),
    Function(Arc<Function>),
}

impl Entity {
    pub fn schema(&self) -> &str {
        match self {
            Self::Table(t) => t.schema(),
            Self::Function(f) => f.schema(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Table(t) => t.name(),
            Self::Function(f) => f.name(),
        }
    }

    pub fn qualified_name(&self) -> &str {
        match self {
            Self::Table(t) => t.qualified_name(),
            Self::Function(f) => f.qualified_name(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Table(_) => "table",
            Self::Function(_) => "function",
        }
    }

    pub fn as_table(&self) -> Option<&Arc<Table>> {
        match self {
            Self::Table(t) => Some(t),
            Self::Function(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&Arc<Function>> {
        match self {
            Self::Function(f) => Some(f),
            Self::Table(_) => None,
        }
    }
}

impl From<Arc<Table>> for Entity {
    fn from(table: Arc<Table>) -> Self {
        Self::Table(table)
    }
}

impl From<Arc<Function>> for Entity {
    fn from(function: Arc<Function>) -> Self {
        Self::Function(function)
    }
}
