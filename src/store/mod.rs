//! Local persistence for the selection and history snapshots

mod snapshots;
mod writer;

pub use snapshots::{SnapshotStore, HISTORY_SNAPSHOT, SELECTION_SNAPSHOT};
pub use writer::SnapshotWriter;
