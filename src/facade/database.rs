use crate::catalog::{CatalogLoader, TableFilter};
use crate::config::DatabaseConfig;
use crate::core::{DbError, Result, Value};
use crate::document::{Document, SaveOperation};
use crate::id::{IdGenerator, UuidGenerator};
use crate::namespace::{
    DbContext, Entity, Function, FunctionDescriptor, Namespace, Table, TableDescriptor,
};
use crate::result::QueryResult;
use crate::runner::{QueryOptions, Runner, RunnerFactory};
use crate::sql;
use log::info;
use serde_json::Value as JsonValue;
use std::sync::{Arc, RwLock};

/// Handle to a database: the runner plus the namespace of everything bound
/// from its catalog.
///
/// The namespace is written while loading and when a document table is
/// created on first save; otherwise it is only read. Lock guards are never
/// held across a runner call.
pub struct Database {
    config: DatabaseConfig,
    context: DbContext,
    filter: TableFilter,
    namespace: RwLock<Namespace>,
}

impl Database {
    /// Wrap a runner without loading anything yet.
    pub fn new(runner: Arc<dyn Runner>, config: DatabaseConfig) -> Result<Self> {
        let filter = config.table_filter()?;
        let context = DbContext {
            runner,
            id_generator: Arc::new(UuidGenerator),
            default_schema: config.default_schema.clone(),
            find_limit: config.find_limit,
        };

        Ok(Self {
            namespace: RwLock::new(Namespace::new(config.default_schema.clone())),
            config,
            context,
            filter,
        })
    }

    /// Replace the id generator used for documents inserted without an id.
    ///
    /// Entities capture the generator when they are bound, so call this before
    /// [`load`](Self::load).
    pub fn with_id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.context.id_generator = id_generator;
        self
    }

    /// Validate the config, open a runner through `factory`, and load the catalog.
    pub async fn connect<F: RunnerFactory>(factory: &F, config: DatabaseConfig) -> Result<Self> {
        config.validate()?;
        let runner = tokio::time::timeout(config.connect_timeout, factory.connect(config.url()?))
            .await
            .map_err(|_| {
                DbError::ExecutionError(format!(
                    "Timed out after {:?} connecting to {}",
                    config.connect_timeout,
                    config.to_url()
                ))
            })??;
        info!("Connected to {}", config.to_url());
        Self::with_runner(Arc::new(runner), config).await
    }

    /// Wrap an existing runner and load the catalog.
    pub async fn with_runner(runner: Arc<dyn Runner>, config: DatabaseConfig) -> Result<Self> {
        let db = Self::new(runner, config)?;
        db.load().await?;
        Ok(db)
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Discover tables and functions and bind them. Safe to call again; entries are replaced.
    pub async fn load(&self) -> Result<()> {
        let loader = CatalogLoader::new(self.context.runner.clone(), self.filter.clone());
        let catalog = loader.load().await?;

        let mut namespace = self.namespace.write()?;
        for descriptor in catalog.tables {
            namespace.bind(Arc::new(Table::new(descriptor, self.context.clone())));
        }
        for descriptor in catalog.functions {
            namespace.bind(Arc::new(Function::new(descriptor, self.context.clone())));
        }
        info!(
            "Namespace holds {} table(s) and {} function(s)",
            namespace.tables().count(),
            namespace.functions().count()
        );
        Ok(())
    }

    pub async fn load_tables(&self) -> Result<usize> {
        let loader = CatalogLoader::new(self.context.runner.clone(), self.filter.clone());
        let tables = loader.load_tables().await?;
        let count = tables.len();

        let mut namespace = self.namespace.write()?;
        for descriptor in tables {
            namespace.bind(Arc::new(Table::new(descriptor, self.context.clone())));
        }
        Ok(count)
    }

    pub async fn load_functions(&self) -> Result<usize> {
        let loader = CatalogLoader::new(self.context.runner.clone(), self.filter.clone());
        let functions = loader.load_functions().await?;
        let count = functions.len();

        let mut namespace = self.namespace.write()?;
        for descriptor in functions {
            namespace.bind(Arc::new(Function::new(descriptor, self.context.clone())));
        }
        Ok(count)
    }

    /// Bind a table by hand, e.g. one created outside the catalog load.
    pub fn bind_table(&self, descriptor: TableDescriptor) -> Result<Arc<Table>> {
        let table = Arc::new(Table::new(descriptor, self.context.clone()));
        self.namespace.write()?.bind(table.clone());
        Ok(table)
    }

    pub fn bind_function(&self, descriptor: FunctionDescriptor) -> Result<Arc<Function>> {
        let function = Arc::new(Function::new(descriptor, self.context.clone()));
        self.namespace.write()?.bind(function.clone());
        Ok(function)
    }

    /// Snapshot of the namespace.
    pub fn namespace(&self) -> Result<Namespace> {
        Ok(self.namespace.read()?.clone())
    }

    pub fn entity(&self, path: &str) -> Result<Entity> {
        self.namespace
            .read()?
            .resolve(path)
            .cloned()
            .ok_or_else(|| DbError::EntityNotFound(path.to_string()))
    }

    /// Table by `name` or `schema.name`
    pub fn table(&self, path: &str) -> Result<Arc<Table>> {
        self.namespace.read()?.table(path)
    }

    pub fn function(&self, path: &str) -> Result<Arc<Function>> {
        self.namespace.read()?.function(path)
    }

    /// Pass raw SQL straight to the runner.
    pub async fn run(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        self.context.execute(sql, params, QueryOptions::default()).await
    }

    pub async fn insert_document(&self, collection: &str, document: JsonValue) -> Result<Document> {
        self.save_document(SaveOperation::Insert, collection, document).await
    }

    pub async fn update_document(&self, collection: &str, document: JsonValue) -> Result<Document> {
        self.save_document(SaveOperation::Update, collection, document).await
    }

    /// Save into `collection` (`table` or `schema.table`), creating it as a
    /// document table first if nothing is bound under that name.
    pub async fn save_document(
        &self,
        operation: SaveOperation,
        collection: &str,
        document: JsonValue,
    ) -> Result<Document> {
        if !document.is_object() {
            return Err(DbError::invalid(
                "Please pass in the document for saving as an object",
            ));
        }

        let existing = self.table(collection);
        let table = match existing {
            Ok(table) => table,
            Err(DbError::EntityNotFound(_)) => self.create_document_table(collection).await?,
            Err(e) => return Err(e),
        };
        table.save(operation, document).await
    }

    /// Create an `(id, body)` table with a full-text index and bind it.
    pub async fn create_document_table(&self, collection: &str) -> Result<Arc<Table>> {
        let descriptor = self.collection_descriptor(collection)?;
        for statement in self.document_table_sql(collection)? {
            self.run(&statement, &[]).await?;
        }
        info!("Created document table {}", collection);
        self.bind_table(descriptor)
    }

    /// Statements that create the document table for `collection`.
    pub fn document_table_sql(&self, collection: &str) -> Result<Vec<String>> {
        let descriptor = self.collection_descriptor(collection)?;
        let default_schema = self.config.default_schema.as_str();
        let table = sql::quoted_qualified_name(&descriptor.schema, &descriptor.name, default_schema);
        let qualified = sql::qualified_name(&descriptor.schema, &descriptor.name, default_schema);

        let mut statements = Vec::with_capacity(3);
        if descriptor.schema != default_schema {
            statements.push(format!(
                "create schema if not exists {}",
                sql::quote_ident(&descriptor.schema)
            ));
        }
        statements.push(format!(
            "create table if not exists {} (id text primary key, body jsonb not null)",
            table
        ));
        statements.push(format!(
            "create index if not exists {} on {} using gin (to_tsvector('simple', body::text))",
            sql::search_index_name(&qualified),
            table
        ));
        Ok(statements)
    }

    fn collection_descriptor(&self, collection: &str) -> Result<TableDescriptor> {
        let (schema, name) = match collection.split_once('.') {
            Some((schema, name)) => (schema.trim(), name.trim()),
            None => (self.config.default_schema.as_str(), collection.trim()),
        };

        if schema.is_empty() || name.is_empty() || name.contains('.') {
            return Err(DbError::invalid(format!(
                "Collection must be 'table' or 'schema.table', got '{}'",
                collection
            )));
        }

        Ok(TableDescriptor {
            schema: schema.to_string(),
            name: name.to_string(),
            primary_key: None,
        })
    }
}
