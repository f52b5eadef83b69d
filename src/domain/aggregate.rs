//! Folding balance results into per-chain and grand totals

use std::cmp::Ordering;

use tracing::{debug, warn};

use super::balance::{AddressResult, ChainResult, PriceSnapshot, QueryResults};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub native: f64,
    pub usd: f64,
    pub local: f64,
}

impl Totals {
    fn add(&mut self, native: f64, usd: f64, local: f64) {
        self.native += native;
        self.usd += usd;
        self.local += local;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainTotal {
    pub chain: String,
    pub total_native: f64,
    pub total_usd: f64,
    pub total_local: f64,
    pub address_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// Sorted by `total_native`, descending; ties keep first-seen order
    pub chains: Vec<ChainTotal>,
    pub grand: Totals,
    pub addresses: usize,
    pub price: Option<PriceSnapshot>,
}

/// Last aggregated output, as shown to the user
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    Single {
        address: String,
        chains: Vec<ChainResult>,
        totals: Totals,
        price: Option<PriceSnapshot>,
    },
    Batch {
        addresses: Vec<String>,
        summary: BatchSummary,
    },
}

impl QueryOutput {
    pub fn from_results(results: &QueryResults) -> Self {
        match results {
            QueryResults::Single(result) => QueryOutput::Single {
                address: result.address.clone(),
                chains: result.chains.clone(),
                totals: aggregate_single(&result.chains),
                price: result.price,
            },
            QueryResults::Batch(results) => QueryOutput::Batch {
                addresses: results.iter().map(|r| r.address.clone()).collect(),
                summary: aggregate_batch(results),
            },
        }
    }
}

/// Parse a textual amount; anything missing or non-numeric counts as zero.
pub fn parse_amount(raw: Option<&str>) -> f64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0.0;
    };
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        _ => {
            debug!(raw, "non-numeric amount treated as zero");
            0.0
        }
    }
}

fn amounts(row: &ChainResult) -> (f64, f64, f64) {
    (
        parse_amount(row.balance_native.as_deref()),
        parse_amount(row.balance_usd.as_deref()),
        parse_amount(row.balance_local.as_deref()),
    )
}

pub fn aggregate_single(results: &[ChainResult]) -> Totals {
    let mut totals = Totals::default();
    for row in results {
        if row.is_malformed() {
            warn!(chain = %row.chain, "malformed chain entry counted as zero");
        }
        let (native, usd, local) = amounts(row);
        totals.add(native, usd, local);
    }
    totals
}

pub fn aggregate_batch(results: &[AddressResult]) -> BatchSummary {
    let mut chains: Vec<ChainTotal> = Vec::new();

    for result in results {
        for row in &result.chains {
            if row.is_malformed() {
                warn!(address = %result.address, chain = %row.chain, "skipping malformed chain entry");
                continue;
            }
            let (native, usd, local) = amounts(row);
            match chains.iter_mut().find(|c| c.chain == row.chain) {
                Some(total) => {
                    total.total_native += native;
                    total.total_usd += usd;
                    total.total_local += local;
                    total.address_count += 1;
                }
                None => chains.push(ChainTotal {
                    chain: row.chain.clone(),
                    total_native: native,
                    total_usd: usd,
                    total_local: local,
                    address_count: 1,
                }),
            }
        }
    }

    // -0.0 and 0.0 tie here
    chains.sort_by(|a, b| {
        b.total_native
            .partial_cmp(&a.total_native)
            .unwrap_or(Ordering::Equal)
    });

    let mut grand = Totals::default();
    for chain in &chains {
        grand.add(chain.total_native, chain.total_usd, chain.total_local);
    }

    BatchSummary {
        chains,
        grand,
        addresses: results.len(),
        price: results.first().and_then(|r| r.price),
    }
}
