use super::filter::TableFilter;
use crate::core::{DbError, Result, Row, Value};
use crate::namespace::{FunctionDescriptor, TableDescriptor};
use crate::result::QueryResult;
use crate::runner::{QueryOptions, Runner};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;

pub const TABLES_SQL: &str = include_str!("sql/tables.sql");
pub const WHITELIST_SQL: &str = include_str!("sql/whitelist.sql");
pub const FUNCTIONS_SQL: &str = include_str!("sql/functions.sql");

/// Everything discovered in one load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub tables: Vec<TableDescriptor>,
    pub functions: Vec<FunctionDescriptor>,
}

/// Runs the discovery queries and turns their rows into descriptors.
///
/// The filters are sent to the database as query parameters and applied again
/// to the returned rows, so a runner that ignores them still cannot leak
/// filtered tables into the namespace.
pub struct CatalogLoader {
    runner: Arc<dyn Runner>,
    filter: TableFilter,
}

impl CatalogLoader {
    pub fn new(runner: Arc<dyn Runner>, filter: TableFilter) -> Self {
        Self { runner, filter }
    }

    pub fn filter(&self) -> &TableFilter {
        &self.filter
    }

    pub async fn load(&self) -> Result<Catalog> {
        let (tables, functions) =
            futures::future::try_join(self.load_tables(), self.load_functions()).await?;
        info!(
            "Catalog loaded: {} table(s), {} function(s)",
            tables.len(),
            functions.len()
        );
        Ok(Catalog { tables, functions })
    }

    pub async fn load_tables(&self) -> Result<Vec<TableDescriptor>> {
        let sql = if self.filter.is_whitelist() {
            WHITELIST_SQL
        } else {
            TABLES_SQL
        };
        let params = self.filter.query_params();
        debug!("Loading tables with filters {:?}", params);

        let result = self.runner.execute(sql, &params, QueryOptions::default()).await?;

        let mut seen = HashSet::new();
        let mut tables = Vec::with_capacity(result.row_count());
        for row in result.rows() {
            let descriptor = table_descriptor(&result, row)?;
            if !self.filter.allows(&descriptor.schema, &descriptor.name) {
                warn!(
                    "Skipping filtered table {}.{} returned by discovery",
                    descriptor.schema, descriptor.name
                );
                continue;
            }
            if seen.insert((descriptor.schema.clone(), descriptor.name.clone())) {
                tables.push(descriptor);
            }
        }
        Ok(tables)
    }

    pub async fn load_functions(&self) -> Result<Vec<FunctionDescriptor>> {
        let result = self
            .runner
            .execute(FUNCTIONS_SQL, &[], QueryOptions::default())
            .await?;

        result
            .rows()
            .iter()
            .map(|row| function_descriptor(&result, row))
            .collect()
    }
}

fn table_descriptor(result: &QueryResult, row: &Row) -> Result<TableDescriptor> {
    Ok(TableDescriptor {
        schema: required_text(result, row, "schema")?,
        name: required_text(result, row, "name")?,
        primary_key: result
            .get(row, "pk")
            .and_then(Value::as_str)
            .filter(|pk| !pk.is_empty())
            .map(str::to_string),
    })
}

fn function_descriptor(result: &QueryResult, row: &Row) -> Result<FunctionDescriptor> {
    let param_count = match result.get(row, "param_count") {
        Some(Value::Integer(n)) if *n >= 0 => *n as usize,
        Some(Value::Text(s)) => s.trim().parse().map_err(|_| {
            DbError::ExecutionError(format!("Invalid param_count '{}' in function catalog", s))
        })?,
        Some(Value::Null) | None => 0,
        Some(other) => {
            return Err(DbError::ExecutionError(format!(
                "Invalid param_count {} in function catalog",
                other
            )));
        }
    };

    Ok(FunctionDescriptor {
        schema: required_text(result, row, "schema")?,
        name: required_text(result, row, "name")?,
        param_count,
    })
}

fn required_text(result: &QueryResult, row: &Row, column: &str) -> Result<String> {
    result
        .get(row, column)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            DbError::ExecutionError(format!("Catalog row is missing text column '{}'", column))
        })
}
