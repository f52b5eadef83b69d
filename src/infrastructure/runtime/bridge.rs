//! Runtime bridge - connects the sync TUI thread with the async Tokio runtime
//!
//! The TUI thread never awaits. It sends [`RuntimeCommand`]s and drains
//! [`RuntimeEvent`]s once per frame; every remote call happens on the worker.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::runtime::Runtime;

use crate::domain::{FetchRequest, FetchTicket, NetworkRef, QueryResults};
use crate::infrastructure::api::BalanceApi;
use crate::infrastructure::runtime::worker::run_async_worker;

/// Commands sent from the TUI to the async worker
#[derive(Debug, Clone)]
pub enum RuntimeCommand {
    /// Load the network catalog, optionally filtered
    LoadCatalog { keyword: Option<String> },
    /// Fetch balances for a query
    FetchBalances(FetchRequest),
    /// Shutdown the worker
    Shutdown,
}

/// Events sent from the async worker to the TUI
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    CatalogReady {
        keyword: Option<String>,
        networks: Vec<NetworkRef>,
    },
    CatalogFailed {
        keyword: Option<String>,
        message: String,
    },
    BalancesReady {
        ticket: FetchTicket,
        results: QueryResults,
    },
    BalancesFailed {
        ticket: FetchTicket,
        message: String,
        transport: bool,
    },
    /// Worker-level error
    Error { message: String },
}

/// Bridge between sync TUI thread and async Tokio runtime
pub struct RuntimeBridge {
    cmd_tx: Sender<RuntimeCommand>,
    evt_rx: Receiver<RuntimeEvent>,
    handle: Option<JoinHandle<()>>,
}

impl RuntimeBridge {
    pub fn new(api: Arc<dyn BalanceApi>) -> anyhow::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<RuntimeCommand>();
        let (evt_tx, evt_rx) = mpsc::channel::<RuntimeEvent>();
        let rt = Runtime::new().context("create tokio runtime")?;

        // The worker thread owns the runtime
        let handle = thread::Builder::new()
            .name("tally-runtime".to_string())
            .spawn(move || {
                rt.block_on(async {
                    if let Err(err) = run_async_worker(api, cmd_rx, evt_tx.clone()).await {
                        let _ = evt_tx.send(RuntimeEvent::Error {
                            message: format!("Worker exited: {:#}", err),
                        });
                    }
                });
            })
            .context("spawn runtime thread")?;

        Ok(Self {
            cmd_tx,
            evt_rx,
            handle: Some(handle),
        })
    }

    /// Send a command to the async worker
    pub fn send(&self, cmd: RuntimeCommand) -> anyhow::Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| anyhow::anyhow!("Worker channel closed"))
    }

    /// Poll for events (non-blocking)
    pub fn poll_events(&self) -> Vec<RuntimeEvent> {
        let mut events = Vec::new();
        while let Ok(evt) = self.evt_rx.try_recv() {
            events.push(evt);
        }
        events
    }

    /// Block until an event arrives or the timeout passes
    pub fn wait_event(&self, timeout: Duration) -> Option<RuntimeEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(evt) = self.evt_rx.try_recv() {
                return Some(evt);
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl Drop for RuntimeBridge {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(RuntimeCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
