//! Ledger of recently queried addresses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::network::NetworkRef;
use super::selection::Selection;

pub const MAX_HISTORY: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub address: String,
    pub timestamp: DateTime<Utc>,
    /// Networks used by the most recent query of this address
    pub networks: Vec<NetworkRef>,
}

/// Most-recent-first list, unique by address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load persisted entries, keeping the first occurrence of each address.
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        let mut history = Self::new();
        for entry in entries {
            if history.len() >= MAX_HISTORY {
                break;
            }
            if history.get(&entry.address).is_none() {
                history.entries.push(entry);
            }
        }
        history
    }

    pub fn record(&mut self, address: &str, selection: &Selection) {
        self.record_at(address, selection.networks(), Utc::now());
    }

    pub fn record_at(&mut self, address: &str, networks: &[NetworkRef], at: DateTime<Utc>) {
        let networks = networks.to_vec();
        if let Some(index) = self.entries.iter().position(|e| e.address == address) {
            let mut entry = self.entries.remove(index);
            entry.timestamp = at;
            entry.networks = networks;
            self.entries.insert(0, entry);
            return;
        }

        self.entries.insert(
            0,
            HistoryEntry {
                address: address.to_string(),
                timestamp: at,
                networks,
            },
        );
        self.entries.truncate(MAX_HISTORY);
    }

    pub fn remove(&mut self, address: &str) {
        self.entries.retain(|e| e.address != address);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&self, address: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.address == address)
    }

    pub fn entry(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
