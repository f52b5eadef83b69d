//! Async worker - runs in Tokio runtime and handles balance service calls

use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::interval;
use tracing::{debug, info, warn, Instrument};

use crate::domain::FetchRequest;
use crate::infrastructure::api::{fetch_target, BalanceApi};
use crate::infrastructure::runtime::bridge::{RuntimeCommand, RuntimeEvent};

/// Run the async worker loop
///
/// Each command runs as its own task so a slow fetch never delays a catalog
/// load. Results carry the ticket they were started with; the TUI decides
/// whether they still apply.
pub async fn run_async_worker(
    api: Arc<dyn BalanceApi>,
    cmd_rx: Receiver<RuntimeCommand>,
    evt_tx: Sender<RuntimeEvent>,
) -> Result<()> {
    let mut poll_interval = interval(Duration::from_millis(25));

    loop {
        poll_interval.tick().await;

        loop {
            let cmd = match cmd_rx.try_recv() {
                Ok(cmd) => cmd,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("command channel closed, worker exiting");
                    return Ok(());
                }
            };

            match cmd {
                RuntimeCommand::Shutdown => {
                    info!("worker shutdown");
                    return Ok(());
                }

                RuntimeCommand::LoadCatalog { keyword } => {
                    let api = api.clone();
                    let tx = evt_tx.clone();
                    let span = tracing::info_span!("catalog", keyword = ?keyword);
                    tokio::spawn(
                        async move {
                            let event = match api.list_networks(keyword.as_deref()).await {
                                Ok(networks) => RuntimeEvent::CatalogReady { keyword, networks },
                                Err(err) => {
                                    warn!(error = %err, "catalog load failed");
                                    RuntimeEvent::CatalogFailed {
                                        keyword,
                                        message: err.to_string(),
                                    }
                                }
                            };
                            let _ = tx.send(event);
                        }
                        .instrument(span),
                    );
                }

                RuntimeCommand::FetchBalances(request) => {
                    spawn_fetch(api.clone(), request, evt_tx.clone());
                }
            }
        }
    }
}

fn spawn_fetch(api: Arc<dyn BalanceApi>, request: FetchRequest, tx: Sender<RuntimeEvent>) {
    let span = tracing::info_span!(
        "fetch",
        ticket = request.ticket.id,
        trigger = ?request.trigger,
        addresses = request.target.addresses().len(),
    );
    tokio::spawn(
        async move {
            let FetchRequest {
                ticket,
                target,
                network_keys,
                ..
            } = request;
            let event = match fetch_target(api.as_ref(), &target, &network_keys).await {
                Ok(results) => {
                    debug!("fetch completed");
                    RuntimeEvent::BalancesReady { ticket, results }
                }
                Err(err) => {
                    warn!(error = %err, "fetch failed");
                    RuntimeEvent::BalancesFailed {
                        ticket,
                        transport: err.is_transport(),
                        message: err.to_string(),
                    }
                }
            };
            let _ = tx.send(event);
        }
        .instrument(span),
    );
}
