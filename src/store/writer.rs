//! Background snapshot writer. The TUI thread hands over serialized bodies
//! and never waits on sqlite.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, warn};

use super::SnapshotStore;

struct SaveRequest {
    name: String,
    body: String,
}

pub struct SnapshotWriter {
    tx: Option<Sender<SaveRequest>>,
    handle: Option<JoinHandle<()>>,
}

impl SnapshotWriter {
    pub fn spawn(store: SnapshotStore) -> anyhow::Result<Self> {
        let (tx, rx) = mpsc::channel::<SaveRequest>();

        let handle = thread::Builder::new()
            .name("tally-store".to_string())
            .spawn(move || {
                while let Ok(first) = rx.recv() {
                    // Only the newest body per name is written
                    let mut pending = BTreeMap::new();
                    pending.insert(first.name, first.body);
                    while let Ok(next) = rx.try_recv() {
                        pending.insert(next.name, next.body);
                    }
                    for (name, body) in pending {
                        match store.save_raw(&name, &body) {
                            Ok(()) => debug!(snapshot = %name, "snapshot saved"),
                            Err(err) => warn!(snapshot = %name, error = %err, "snapshot save failed"),
                        }
                    }
                }
            })
            .context("spawn store thread")?;

        Ok(Self {
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    /// Queue a save. Never blocks; failures are logged.
    pub fn save<T: Serialize + ?Sized>(&self, name: &str, value: &T) {
        let body = match serde_json::to_string(value) {
            Ok(body) => body,
            Err(err) => {
                warn!(snapshot = name, error = %err, "snapshot encode failed");
                return;
            }
        };
        let Some(tx) = &self.tx else {
            return;
        };
        if tx
            .send(SaveRequest {
                name: name.to_string(),
                body,
            })
            .is_err()
        {
            warn!(snapshot = name, "store thread gone, snapshot dropped");
        }
    }
}

impl Drop for SnapshotWriter {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain what is queued and exit
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
