//! JSON shapes of the balance service and their lenient decoding

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{AddressResult, ChainResult, NetworkRef, PriceSnapshot};

#[derive(Debug, Deserialize)]
pub struct ChainsResponse {
    #[serde(default)]
    pub items: Vec<WireNetwork>,
}

#[derive(Debug, Deserialize)]
pub struct WireNetwork {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: String,
    pub key: String,
}

impl From<WireNetwork> for NetworkRef {
    fn from(network: WireNetwork) -> Self {
        NetworkRef::new(network.id, network.name, network.key)
    }
}

#[derive(Debug, Serialize)]
pub struct BalancesRequest<'a> {
    pub addresses: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chains: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancesResponse {
    #[serde(default)]
    pub items: Vec<WireAddress>,
    #[serde(default)]
    pub eth_price: Option<WirePrice>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAddress {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub chains: serde_json::Map<String, Value>,
    #[serde(default)]
    pub total_balance: Option<Value>,
    #[serde(default)]
    pub total_usd: Option<Value>,
    #[serde(default)]
    pub total_cny: Option<Value>,
    #[serde(default)]
    pub eth_price: Option<WirePrice>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WirePrice {
    #[serde(default)]
    pub usd: f64,
    #[serde(default)]
    pub cny: f64,
}

impl From<WirePrice> for PriceSnapshot {
    fn from(price: WirePrice) -> Self {
        PriceSnapshot {
            usd: price.usd,
            local: price.cny,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChainData {
    #[serde(default)]
    balance_eth: Option<Value>,
    #[serde(default)]
    balance_usd: Option<Value>,
    #[serde(default)]
    balance_cny: Option<Value>,
    #[serde(default)]
    chain_id: Option<u64>,
    #[serde(default)]
    explorer: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Amounts arrive as strings or numbers; anything else is dropped.
fn amount_text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn decode_chain(name: &str, value: Value) -> ChainResult {
    if !value.is_object() {
        warn!(chain = name, "chain entry is not an object");
        return ChainResult::malformed(name, "invalid chain entry");
    }
    match serde_json::from_value::<WireChainData>(value) {
        Ok(data) => {
            let row = ChainResult {
                chain: name.to_string(),
                chain_id: data.chain_id,
                balance_native: amount_text(data.balance_eth),
                balance_usd: amount_text(data.balance_usd),
                balance_local: amount_text(data.balance_cny),
                explorer_url: match data.explorer {
                    Some(Value::String(url)) if !url.is_empty() => Some(url),
                    _ => None,
                },
                error: data.error,
                malformed: false,
            };
            if let Some(error) = &row.error {
                debug!(chain = name, error = %error, "chain reported an error");
            }
            row
        }
        Err(err) => {
            warn!(chain = name, error = %err, "could not decode chain entry");
            ChainResult::malformed(name, err.to_string())
        }
    }
}

impl WireAddress {
    pub fn into_result(self, fallback_price: Option<WirePrice>) -> AddressResult {
        let chains = self
            .chains
            .into_iter()
            .map(|(name, value)| decode_chain(&name, value))
            .collect();
        AddressResult {
            address: self.address,
            chains,
            total_native: amount_text(self.total_balance),
            total_usd: amount_text(self.total_usd),
            total_local: amount_text(self.total_cny),
            price: self.eth_price.or(fallback_price).map(PriceSnapshot::from),
        }
    }
}
