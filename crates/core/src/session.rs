use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }
}

/// Per-visitor key-value state carried across requests.
///
/// A `Session` is loaded from the session store at the start of a request and
/// written back only when something mutated it. The `modified` flag is what
/// the web layer consults to decide whether a write-back is needed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    values: BTreeMap<String, Value>,
    modified: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a session from its persisted values. The result starts out
    /// unmodified.
    pub fn from_values(values: BTreeMap<String, Value>) -> Self {
        Self { values, modified: false }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
        self.modified = true;
    }

    /// Remove a key if present. Absent keys are a no-op and do not mark the
    /// session modified.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let removed = self.values.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }
}
