//! Global variable store.
//!
//! 2n has no scopes: every assignment, whether at top level, inside a loop,
//! or inside a function body, writes to this one table.

use std::collections::HashMap;

use crate::script::value::Value;

/// Name → [`Value`] bindings.
#[derive(Debug, Default)]
pub struct VarStore {
    vars: HashMap<String, Value>,
}

impl VarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) a variable.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.vars.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Get the value of a variable if it holds a list.
    pub fn get_list(&self, name: &str) -> Option<&[f64]> {
        self.vars.get(name)?.as_list()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
