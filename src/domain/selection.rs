//! Selected networks, kept as one ordered list keyed by network key
//!
//! The persisted form still carries both the key list and the metadata list so
//! snapshots written with missing metadata heal on the next catalog load.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::network::NetworkRef;

/// Maximum number of networks a query may span.
pub const MAX_SELECTED: usize = 5;

/// Result of a toggle request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed { emptied: bool },
    /// Selection is full; nothing changed
    Rejected,
}

/// Persisted shape of the selection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSnapshot {
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub networks: Vec<NetworkRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    entries: Vec<NetworkRef>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a snapshot. `keys` wins: each key takes its metadata from
    /// `networks` when present and a placeholder otherwise.
    pub fn from_snapshot(snapshot: SelectionSnapshot) -> Self {
        let keys: Vec<String> = if snapshot.keys.is_empty() {
            snapshot.networks.iter().map(|n| n.key.clone()).collect()
        } else {
            snapshot.keys
        };

        let mut selection = Self::new();
        for key in keys {
            let key = key.trim();
            if key.is_empty() || selection.contains(key) {
                continue;
            }
            if selection.is_full() {
                break;
            }
            let network = snapshot
                .networks
                .iter()
                .find(|n| n.key == key)
                .cloned()
                .unwrap_or_else(|| NetworkRef::placeholder(key));
            selection.entries.push(network);
        }
        selection
    }

    pub fn snapshot(&self) -> SelectionSnapshot {
        SelectionSnapshot {
            keys: self.keys(),
            networks: self.entries.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_SELECTED
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|n| n.key == key)
    }

    /// Keys in selection order
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|n| n.key.clone()).collect()
    }

    pub fn networks(&self) -> &[NetworkRef] {
        &self.entries
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &NetworkRef> {
        self.entries.iter().filter(|n| n.is_placeholder())
    }

    pub fn toggle(&mut self, network: NetworkRef) -> Toggle {
        if let Some(index) = self.entries.iter().position(|n| n.same_network(&network)) {
            self.entries.remove(index);
            debug!(key = %network.key, remaining = self.entries.len(), "network removed");
            return Toggle::Removed {
                emptied: self.entries.is_empty(),
            };
        }
        if self.is_full() {
            debug!(key = %network.key, "selection full, toggle ignored");
            return Toggle::Rejected;
        }
        debug!(key = %network.key, "network added");
        self.entries.push(network);
        Toggle::Added
    }

    /// Toggle by key alone; an add inserts a placeholder.
    pub fn toggle_key(&mut self, key: &str) -> Toggle {
        let key = key.trim();
        if let Some(existing) = self.entries.iter().find(|n| n.key == key).cloned() {
            return self.toggle(existing);
        }
        self.toggle(NetworkRef::placeholder(key))
    }

    /// Replace the whole selection, dropping duplicate keys and anything past
    /// the limit.
    pub fn replace(&mut self, networks: &[NetworkRef]) {
        self.entries.clear();
        for network in networks {
            if self.is_full() {
                break;
            }
            if !self.contains(&network.key) {
                self.entries.push(network.clone());
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Swap placeholders for their catalog records. Returns whether anything
    /// changed; a second call with the same catalog is a no-op.
    pub fn reconcile_with_catalog(&mut self, catalog: &[NetworkRef]) -> bool {
        let mut changed = false;
        for entry in self.entries.iter_mut() {
            if !entry.is_placeholder() {
                continue;
            }
            let Some(resolved) = catalog.iter().find(|n| n.key == entry.key) else {
                continue;
            };
            if entry != resolved {
                debug!(key = %entry.key, id = resolved.id, "placeholder resolved from catalog");
                *entry = resolved.clone();
                changed = true;
            }
        }
        changed
    }
}
