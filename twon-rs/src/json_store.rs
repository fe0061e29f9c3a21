//! In-memory JSON documents and the active operation context.
//!
//! `import.json data.json` stores the parsed file under the name `data`.
//! Inside `operation data { … }` that document is the *active context*, the
//! only one `json.getkey` / `json.addkey` can see.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Number, Value as JsonValue};

use crate::script::error::ScriptError;
use crate::script::value::format_number;

/// Named JSON documents plus the single active-context slot.
#[derive(Debug, Default)]
pub struct JsonStore {
    docs: HashMap<String, JsonValue>,
    active: Option<String>,
}

impl JsonStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) a document.
    pub fn insert(&mut self, name: impl Into<String>, doc: JsonValue) {
        self.docs.insert(name.into(), doc);
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.docs.get(name)
    }

    /// Name of the active context, if any.
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Make `name` the active context.
    ///
    /// The document must exist and no other context may be active.
    pub fn activate(&mut self, name: &str) -> Result<(), ScriptError> {
        if let Some(active) = &self.active {
            return Err(ScriptError::ContextActive {
                active: active.clone(),
                requested: name.to_owned(),
            });
        }
        if !self.docs.contains_key(name) {
            return Err(ScriptError::UnknownContext(name.to_owned()));
        }
        self.active = Some(name.to_owned());
        Ok(())
    }

    /// Clear the active context, returning its name.
    pub fn deactivate(&mut self) -> Option<String> {
        self.active.take()
    }

    /// Read the numeric list stored under `key` in the active document.
    pub fn get_list(&self, key: &str) -> Result<Vec<f64>, ScriptError> {
        let (context, doc) = self.active_doc("json.getkey")?;
        let map = doc
            .as_object()
            .ok_or_else(|| ScriptError::NotAnObject(context.to_owned()))?;
        let value = map.get(key).ok_or_else(|| ScriptError::MissingKey {
            context: context.to_owned(),
            key: key.to_owned(),
        })?;
        let items = value
            .as_array()
            .ok_or_else(|| ScriptError::NotAList { name: format!("'{key}'") })?;
        items
            .iter()
            .map(|item| item.as_f64().ok_or_else(|| ScriptError::NotNumeric(item.to_string())))
            .collect()
    }

    /// Store `items` under `key` in the active document.
    pub fn set_list(&mut self, key: &str, items: &[f64]) -> Result<(), ScriptError> {
        let array = items
            .iter()
            .map(|&x| {
                Number::from_f64(x)
                    .map(JsonValue::Number)
                    .ok_or_else(|| ScriptError::NotNumeric(format_number(x)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let context = self
            .active
            .as_deref()
            .ok_or(ScriptError::NoActiveContext("json.addkey"))?;
        let doc = self
            .docs
            .get_mut(context)
            .ok_or_else(|| ScriptError::UnknownContext(context.to_owned()))?;
        let map: &mut Map<String, JsonValue> = doc
            .as_object_mut()
            .ok_or_else(|| ScriptError::NotAnObject(context.to_owned()))?;
        map.insert(key.to_owned(), JsonValue::Array(array));
        Ok(())
    }

    /// Serialize a document the way it is persisted: two-space indentation,
    /// non-ASCII text kept as-is.
    pub fn to_pretty(&self, name: &str) -> Option<Result<String, serde_json::Error>> {
        self.docs.get(name).map(serde_json::to_string_pretty)
    }

    fn active_doc(&self, what: &'static str) -> Result<(&str, &JsonValue), ScriptError> {
        let context = self.active.as_deref().ok_or(ScriptError::NoActiveContext(what))?;
        let doc = self
            .docs
            .get(context)
            .ok_or_else(|| ScriptError::UnknownContext(context.to_owned()))?;
        Ok((context, doc))
    }
}

/// The context name of an imported JSON file: its base name up to the first `.`.
pub fn context_name(path: &Path) -> String {
    let base = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
    let stem = base.split('.').next().unwrap_or_default();
    stem.to_owned()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
