//! Balance results as returned by the balance service
//!
//! Amounts stay textual until aggregation so that a bad value on one chain
//! never prevents reading its siblings.

use serde::{Deserialize, Serialize};

/// One chain's balance for one address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainResult {
    pub chain: String,
    pub chain_id: Option<u64>,
    pub balance_native: Option<String>,
    pub balance_usd: Option<String>,
    pub balance_local: Option<String>,
    pub explorer_url: Option<String>,
    pub error: Option<String>,
    /// Set when the entry could not be decoded at all
    #[serde(default)]
    pub malformed: bool,
}

impl ChainResult {
    /// Row kept for a chain entry that could not be decoded at all.
    pub fn malformed(chain: &str, error: impl Into<String>) -> Self {
        Self {
            chain: chain.to_string(),
            error: Some(error.into()),
            malformed: true,
            ..Self::default()
        }
    }

    /// Undecodable or unnamed. A named entry that only reports an error
    /// is still a chain row worth zero.
    pub fn is_malformed(&self) -> bool {
        self.malformed || self.chain.trim().is_empty()
    }

    pub fn explorer_address_url(&self, address: &str) -> Option<String> {
        let base = self.explorer_url.as_deref()?.trim_end_matches('/');
        if base.is_empty() || address.is_empty() {
            return None;
        }
        Some(format!("{base}/address/{address}"))
    }
}

/// Native-asset price at fetch time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub usd: f64,
    pub local: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressResult {
    pub address: String,
    /// In the order the service reported them
    pub chains: Vec<ChainResult>,
    pub total_native: Option<String>,
    pub total_usd: Option<String>,
    pub total_local: Option<String>,
    pub price: Option<PriceSnapshot>,
}

/// What one fetch attempt produced
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResults {
    Single(AddressResult),
    Batch(Vec<AddressResult>),
}
