// ============================================================================
// dbspace Library
// ============================================================================

//! Relational access and document-store emulation on top of PostgreSQL.
//!
//! A [`Database`] loads the catalog through a [`Runner`], binds every table
//! and function into an explicit [`Namespace`], and exposes them as
//! [`Table`] and [`Function`] handles. Tables speak loosely shaped
//! conditions (see [`condition`]) and, when laid out as `(id, body jsonb)`,
//! behave as document collections (see [`document`]).
//!
//! The crate never opens a connection itself: all I/O goes through the
//! [`Runner`] the caller supplies.
//!
//! ```no_run
//! use dbspace::{Database, DatabaseConfig, Runner};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn demo(runner: Arc<dyn Runner>) -> dbspace::Result<()> {
//! let db = Database::with_runner(runner, DatabaseConfig::default().database("app")).await?;
//!
//! let saved = db.insert_document("notes", json!({"title": "first"})).await?;
//! let notes = db.table("notes")?;
//! let found = notes.find_by_id(saved.id().cloned().unwrap_or_default()).await?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod condition;
pub mod config;
pub mod core;
pub mod document;
pub mod facade;
pub mod id;
pub mod namespace;
pub mod result;
pub mod runner;
mod sql;

// Re-export main types for convenience
pub use condition::{CompiledPredicate, Condition, compile};
pub use config::DatabaseConfig;
pub use core::{DbError, Result, Row, Value};
pub use document::{Document, FindOptions, FindResult, PatchOperation, SaveOperation};
pub use facade::Database;
pub use id::{IdGenerator, UuidGenerator};
pub use namespace::{Entity, Function, Namespace, Table};
pub use result::QueryResult;
pub use runner::{QueryOptions, Runner, RunnerFactory};
