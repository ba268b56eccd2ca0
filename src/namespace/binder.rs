use super::entity::{Entity, Function, Table};
use crate::core::{DbError, Result};
use log::warn;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One level of the namespace: entities by name plus nested nodes.
#[derive(Debug, Clone, Default)]
pub struct NamespaceNode {
    entities: BTreeMap<String, Entity>,
    children: BTreeMap<String, NamespaceNode>,
}

impl NamespaceNode {
    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    pub fn child(&self, name: &str) -> Option<&NamespaceNode> {
        self.children.get(name)
    }

    /// Entity names at this level, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.children.is_empty()
    }
}

/// Tables and functions arranged by schema.
///
/// Entities of the default schema sit on the root node; every other schema
/// gets a child node of its own. A flat registry keyed by `(schema, name)`
/// mirrors the tree for enumeration.
#[derive(Debug, Clone)]
pub struct Namespace {
    default_schema: String,
    root: NamespaceNode,
    registry: BTreeMap<(String, String), Entity>,
}

impl Namespace {
    pub fn new(default_schema: impl Into<String>) -> Self {
        Self {
            default_schema: default_schema.into(),
            root: NamespaceNode::default(),
            registry: BTreeMap::new(),
        }
    }

    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    /// Bind an entity, replacing whatever was bound under the same `(schema, name)`.
    /// Returns the replaced entity. A table and a function share one name space,
    /// so replacing one kind with the other is logged as a warning.
    pub fn bind(&mut self, entity: impl Into<Entity>) -> Option<Entity> {
        let entity = entity.into();
        let schema = entity.schema().to_string();
        let name = entity.name().to_string();

        let node = if schema == self.default_schema {
            &mut self.root
        } else {
            self.root.children.entry(schema.clone()).or_default()
        };
        node.entities.insert(name.clone(), entity.clone());

        let replaced = self.registry.insert((schema, name), entity.clone());
        if let Some(previous) = replaced.as_ref().filter(|p| p.kind() != entity.kind()) {
            warn!(
                "{} {} replaces the {} bound under the same name",
                entity.kind(),
                entity.qualified_name(),
                previous.kind()
            );
        }
        replaced
    }

    pub fn root(&self) -> &NamespaceNode {
        &self.root
    }

    /// Entity bound on the root
    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.root.get(name)
    }

    /// Node for a non-default schema
    pub fn schema(&self, name: &str) -> Option<&NamespaceNode> {
        self.root.child(name)
    }

    pub fn lookup(&self, schema: &str, name: &str) -> Option<&Entity> {
        self.registry.get(&(schema.to_string(), name.to_string()))
    }

    /// Resolve `name` or `schema.name`.
    pub fn resolve(&self, path: &str) -> Option<&Entity> {
        match path.split_once('.') {
            Some((schema, name)) => self.lookup(schema, name),
            None => self.lookup(&self.default_schema, path),
        }
    }

    pub fn table(&self, path: &str) -> Result<Arc<Table>> {
        self.resolve(path)
            .and_then(Entity::as_table)
            .cloned()
            .ok_or_else(|| DbError::EntityNotFound(path.to_string()))
    }

    pub fn function(&self, path: &str) -> Result<Arc<Function>> {
        self.resolve(path)
            .and_then(Entity::as_function)
            .cloned()
            .ok_or_else(|| DbError::EntityNotFound(path.to_string()))
    }

    /// All bound entities ordered by `(schema, name)`
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.registry.values()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<Table>> {
        self.registry.values().filter_map(Entity::as_table)
    }

    pub fn functions(&self) -> impl Iterator<Item = &Arc<Function>> {
        self.registry.values().filter_map(Entity::as_function)
    }

    /// Schemas that have their own node
    pub fn schema_names(&self) -> impl Iterator<Item = &str> {
        self.root.child_names()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }
}
