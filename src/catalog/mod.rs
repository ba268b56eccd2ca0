//! Schema catalog loading: discovery queries plus the filters that decide
//! which tables get bound.

pub mod filter;
pub mod loader;

pub use filter::{FilterList, SchemaFilter, TableFilter, TablePatterns};
pub use loader::{Catalog, CatalogLoader};
