use async_trait::async_trait;
use std::sync::Arc;
use crate::core::{Result, Value};
use crate::result::QueryResult;

/// Per-call hints passed through to the runner alongside the SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// The caller expects at most one row back.
    pub single: bool,
}

impl QueryOptions {
    pub fn single() -> Self {
        Self { single: true }
    }
}

/// Executes parameterized SQL against the database.
///
/// This is the only place where I/O happens. Connection pooling, timeouts and
/// retries are the runner's business; errors it returns are propagated to the
/// caller unchanged.
///
/// Placeholders are PostgreSQL style (`$1`, `$2`, ...) and `params[0]` binds `$1`.
#[async_trait]
pub trait Runner: Send + Sync {
    async fn execute(&self, sql: &str, params: &[Value], options: QueryOptions) -> Result<QueryResult>;
}

#[async_trait]
impl<R: Runner + ?Sized> Runner for Arc<R> {
    async fn execute(&self, sql: &str, params: &[Value], options: QueryOptions) -> Result<QueryResult> {
        (**self).execute(sql, params, options).await
    }
}

/// A factory trait for creating runners.
#[async_trait]
pub trait RunnerFactory: Send + Sync {
    type Runner: Runner + 'static;

    /// Connect to the database using a connection string.
    async fn connect(&self, url: &str) -> Result<Self::Runner>;
}
