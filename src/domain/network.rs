//! Network references as the balance service names them

use serde::{Deserialize, Serialize};

/// A blockchain the balance service can query.
///
/// `key` is the stable identity; `id` and `name` come from the catalog and may
/// be placeholders until the catalog has been seen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkRef {
    pub id: u64,
    pub name: String,
    pub key: String,
}

impl NetworkRef {
    pub fn new(id: u64, name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            key: key.into(),
        }
    }

    /// Entry standing in for a key whose catalog record has not arrived yet.
    pub fn placeholder(key: &str) -> Self {
        Self {
            id: 0,
            name: fallback_name(key),
            key: key.to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == 0
    }

    pub fn same_network(&self, other: &NetworkRef) -> bool {
        self.key == other.key
    }
}

/// Display name derived from a key: first character upper-cased, rest as-is.
pub fn fallback_name(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
