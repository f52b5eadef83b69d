//! Query orchestration: when a balance fetch may start and whether its result
//! may be committed
//!
//! The orchestrator never performs I/O. The event loop asks it for the next
//! [`FetchRequest`], hands that to the runtime, and reports the outcome back
//! through [`QueryOrchestrator::settle`].

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::aggregate::QueryOutput;

/// Maximum number of addresses in one batch query.
pub const MAX_BATCH: usize = 50;

const RESULT_CACHE_CAPACITY: usize = 32;

/// Address(es) a query runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    Address(String),
    Batch(Vec<String>),
}

impl QueryTarget {
    /// Build a batch target, dropping blanks and duplicates and capping at
    /// [`MAX_BATCH`]. Returns `None` when nothing is left.
    pub fn batch<I, S>(addresses: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for address in addresses {
            let address = address.as_ref().trim();
            if address.is_empty() || out.iter().any(|a| a == address) {
                continue;
            }
            if out.len() == MAX_BATCH {
                break;
            }
            out.push(address.to_string());
        }
        if out.is_empty() {
            None
        } else {
            Some(QueryTarget::Batch(out))
        }
    }

    pub fn addresses(&self) -> &[String] {
        match self {
            QueryTarget::Address(address) => std::slice::from_ref(address),
            QueryTarget::Batch(addresses) => addresses,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, QueryTarget::Batch(_))
    }

    /// Identity of a query: target plus the network keys it runs on.
    pub fn key(&self, network_keys: &[String]) -> String {
        let kind = if self.is_batch() { "batch" } else { "single" };
        format!(
            "{kind}|{}|{}",
            self.addresses().join(","),
            network_keys.join(",")
        )
    }
}

/// Staleness threshold and background interval for one query mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub stale_after: Duration,
    pub interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub single: Cadence,
    pub batch: Cadence,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            single: Cadence {
                stale_after: Duration::from_secs(60),
                interval: Duration::from_secs(60),
            },
            batch: Cadence {
                stale_after: Duration::from_secs(60),
                interval: Duration::from_secs(120),
            },
        }
    }
}

impl RefreshPolicy {
    pub fn cadence_for(&self, target: &QueryTarget) -> Cadence {
        if target.is_batch() {
            self.batch
        } else {
            self.single
        }
    }
}

/// Identifies one dispatched attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub id: u64,
    pub target_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchTrigger {
    Manual,
    Background,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub ticket: FetchTicket,
    pub target: QueryTarget,
    pub network_keys: Vec<String>,
    pub trigger: FetchTrigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Idle,
    ArmedManual,
    Fetching,
    /// Reported by `settle`; the orchestrator is back to `Idle` right after.
    Settled,
}

/// Verdict on a finished attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Result belongs to the current target and may be shown
    Commit,
    /// Superseded or unknown attempt; drop the result
    Discard,
}

#[derive(Debug, Clone)]
struct InFlight {
    ticket: FetchTicket,
    /// Arm generation this attempt consumed, if it was a manual one
    armed_by: Option<u64>,
    started_at: Instant,
}

#[derive(Debug, Clone)]
pub struct QueryOrchestrator {
    policy: RefreshPolicy,
    should_fetch: bool,
    arm_generation: u64,
    next_ticket: u64,
    in_flight: Option<InFlight>,
    last_settled_at: Option<Instant>,
    last_error: Option<String>,
}

impl QueryOrchestrator {
    pub fn new(policy: RefreshPolicy) -> Self {
        Self {
            policy,
            should_fetch: false,
            arm_generation: 0,
            next_ticket: 1,
            in_flight: None,
            last_settled_at: None,
            last_error: None,
        }
    }

    pub fn should_fetch(&self) -> bool {
        self.should_fetch
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn in_flight_ticket(&self) -> Option<&FetchTicket> {
        self.in_flight.as_ref().map(|f| &f.ticket)
    }

    pub fn phase(&self) -> FetchPhase {
        if self.in_flight.is_some() {
            FetchPhase::Fetching
        } else if self.should_fetch {
            FetchPhase::ArmedManual
        } else {
            FetchPhase::Idle
        }
    }

    /// Record a manual fetch intent. Refused while no network is selected.
    pub fn arm(&mut self, has_networks: bool) -> bool {
        if !has_networks {
            debug!("fetch intent refused: no networks selected");
            return false;
        }
        self.should_fetch = true;
        self.arm_generation += 1;
        self.last_error = None;
        true
    }

    pub fn disarm(&mut self) {
        self.should_fetch = false;
    }

    /// Decide whether a fetch starts now.
    ///
    /// Manual intent starts a fetch for the current target unless one for the
    /// same key is already running; an attempt for a different key is
    /// superseded. Without intent, a background refresh starts once the last
    /// success for this key is stale and the mode's interval has elapsed.
    pub fn poll(
        &mut self,
        now: Instant,
        target: Option<&QueryTarget>,
        network_keys: &[String],
        last_success: Option<Instant>,
    ) -> Option<FetchRequest> {
        let target = target?;
        if network_keys.is_empty() {
            return None;
        }
        let key = target.key(network_keys);

        if let Some(in_flight) = &self.in_flight {
            if in_flight.ticket.target_key == key || !self.should_fetch {
                return None;
            }
            debug!(
                superseded = in_flight.ticket.id,
                "starting fetch for new target while previous attempt is in flight"
            );
        }

        let trigger = if self.should_fetch {
            FetchTrigger::Manual
        } else if self.background_due(now, target, last_success) {
            FetchTrigger::Background
        } else {
            return None;
        };

        let ticket = FetchTicket {
            id: self.next_ticket,
            target_key: key,
        };
        self.next_ticket += 1;
        self.in_flight = Some(InFlight {
            ticket: ticket.clone(),
            armed_by: (trigger == FetchTrigger::Manual).then_some(self.arm_generation),
            started_at: now,
        });
        info!(ticket = ticket.id, key = %ticket.target_key, ?trigger, "fetch started");

        Some(FetchRequest {
            ticket,
            target: target.clone(),
            network_keys: network_keys.to_vec(),
            trigger,
        })
    }

    fn background_due(
        &self,
        now: Instant,
        target: &QueryTarget,
        last_success: Option<Instant>,
    ) -> bool {
        let Some(success_at) = last_success else {
            return false;
        };
        let cadence = self.policy.cadence_for(target);
        let stale = now.saturating_duration_since(success_at) >= cadence.stale_after;
        let interval_elapsed = self
            .last_settled_at
            .map(|at| now.saturating_duration_since(at) >= cadence.interval)
            .unwrap_or(true);
        stale && interval_elapsed
    }

    /// Close an attempt. `current_key` is the key of the target the user is
    /// looking at now; results for any other key are discarded.
    ///
    /// The manual intent is cleared here, once, if this attempt consumed the
    /// latest arm. A re-arm that happened mid-flight survives.
    pub fn settle(
        &mut self,
        ticket: &FetchTicket,
        now: Instant,
        current_key: Option<&str>,
        error: Option<String>,
    ) -> Settlement {
        let matches = self
            .in_flight
            .as_ref()
            .map(|f| f.ticket.id == ticket.id)
            .unwrap_or(false);
        if !matches {
            debug!(ticket = ticket.id, "discarding result of superseded attempt");
            return Settlement::Discard;
        }
        let Some(in_flight) = self.in_flight.take() else {
            return Settlement::Discard;
        };

        if in_flight.armed_by == Some(self.arm_generation) {
            self.should_fetch = false;
        }
        self.last_settled_at = Some(now);

        let elapsed_ms = now.saturating_duration_since(in_flight.started_at).as_millis() as u64;
        let ok = error.is_none();
        self.last_error = error;
        info!(ticket = ticket.id, elapsed_ms, ok, phase = ?FetchPhase::Settled, "fetch settled");

        if current_key == Some(ticket.target_key.as_str()) && ok {
            Settlement::Commit
        } else {
            Settlement::Discard
        }
    }

    /// Forget everything tied to the previous target (selection emptied).
    pub fn reset(&mut self) {
        self.should_fetch = false;
        self.last_settled_at = None;
        self.last_error = None;
    }
}

#[derive(Debug, Clone)]
pub struct CachedOutput {
    pub output: QueryOutput,
    pub fetched_at: Instant,
}

/// Last output per query key, oldest evicted first
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    entries: VecDeque<(String, CachedOutput)>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, output: QueryOutput, fetched_at: Instant) {
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push_back((key, CachedOutput { output, fetched_at }));
        while self.entries.len() > RESULT_CACHE_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn get(&self, key: &str) -> Option<&CachedOutput> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn fetched_at(&self, key: &str) -> Option<Instant> {
        self.get(key).map(|c| c.fetched_at)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
