//! Explicit namespace of bound tables and functions.

pub mod binder;
pub mod entity;

pub use binder::{Namespace, NamespaceNode};
pub use entity::{
    DEFAULT_PRIMARY_KEY, DbContext, Entity, Function, FunctionDescriptor, Table, TableDescriptor,
};
