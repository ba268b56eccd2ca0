use crate::core::Value;

/// Which storage a compiled predicate reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateTarget {
    /// No predicate; every row matches
    All,
    /// A plain relational column (the primary key)
    Column,
    /// Fields inside the JSON `body` column
    Body,
}

/// A SQL boolean expression and the values for its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPredicate {
    /// Expression without the `where` keyword; empty when matching everything
    pub clause: String,
    /// `params[i]` binds placeholder `$i+1`
    pub params: Vec<Value>,
    /// Single equality test on the primary key: at most one row comes back
    pub is_primary_key_lookup: bool,
    pub target: PredicateTarget,
}

impl CompiledPredicate {
    pub fn match_all() -> Self {
        Self {
            clause: String::new(),
            params: Vec::new(),
            is_primary_key_lookup: false,
            target: PredicateTarget::All,
        }
    }

    pub fn is_match_all(&self) -> bool {
        self.clause.is_empty()
    }

    /// `" where <clause>"`, or an empty string for match-all, ready to append to a select.
    pub fn where_sql(&self) -> String {
        if self.clause.is_empty() {
            String::new()
        } else {
            format!(" where {}", self.clause)
        }
    }
}

/// Append-only accumulator for predicate fragments.
///
/// Placeholders are handed out by the builder itself as values are pushed, so
/// ordinals are always contiguous and `params` is always in placeholder order.
#[derive(Debug, Default)]
pub struct PredicateBuilder {
    fragments: Vec<String>,
    params: Vec<Value>,
}

impl PredicateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` and append the fragment `render` builds around its placeholder.
    pub fn push_bound<F>(&mut self, value: Value, render: F)
    where
        F: FnOnce(&str) -> String,
    {
        self.params.push(value);
        let placeholder = format!("${}", self.params.len());
        self.fragments.push(render(&placeholder));
    }

    /// Append a fragment that binds nothing (`x is null`).
    pub fn push_unbound(&mut self, fragment: String) {
        self.fragments.push(fragment);
    }

    /// AND-join the fragments. Clause and parameters leave the builder together.
    pub fn build(self, is_primary_key_lookup: bool, target: PredicateTarget) -> CompiledPredicate {
        if self.fragments.is_empty() {
            return CompiledPredicate::match_all();
        }

        CompiledPredicate {
            clause: self.fragments.join(" and "),
            params: self.params,
            is_primary_key_lookup,
            target,
        }
    }
}
