//! Balance query engine: selection, history, orchestration and aggregation

pub mod aggregate;
pub mod balance;
pub mod history;
pub mod network;
pub mod query;
pub mod selection;
pub mod validate;

pub use aggregate::{aggregate_batch, aggregate_single, BatchSummary, ChainTotal, QueryOutput, Totals};
pub use balance::{AddressResult, ChainResult, PriceSnapshot, QueryResults};
pub use history::{History, HistoryEntry, MAX_HISTORY};
pub use network::NetworkRef;
pub use query::{
    Cadence, FetchPhase, FetchRequest, FetchTicket, FetchTrigger, QueryOrchestrator, QueryTarget,
    RefreshPolicy, ResultCache, Settlement, MAX_BATCH,
};
pub use selection::{Selection, SelectionSnapshot, Toggle, MAX_SELECTED};
pub use validate::InputRejection;
