//! Runtime bridge and worker against an in-process balance service

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tally::domain::{
    AddressResult, ChainResult, FetchRequest, FetchTicket, FetchTrigger, NetworkRef, QueryResults,
    QueryTarget,
};
use tally::infrastructure::api::{fetch_target, ApiError, BalanceApi};
use tally::infrastructure::runtime::{RuntimeBridge, RuntimeCommand, RuntimeEvent};

const WAIT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct MockApi {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl BalanceApi for MockApi {
    async fn list_networks(&self, keyword: Option<&str>) -> Result<Vec<NetworkRef>, ApiError> {
        let all = vec![
            NetworkRef::new(1, "Ethereum", "mainnet"),
            NetworkRef::new(10, "Optimism", "optimism"),
            NetworkRef::new(137, "Polygon", "polygon"),
        ];
        Ok(match keyword {
            Some(k) => all.into_iter().filter(|n| n.key.contains(k)).collect(),
            None => all,
        })
    }

    async fn fetch_address(
        &self,
        address: &str,
        network_keys: &[String],
    ) -> Result<AddressResult, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if address == "0xfail" {
            return Err(ApiError::Status {
                status: 500,
                body: "boom".to_string(),
            });
        }
        let chains = network_keys
            .iter()
            .map(|key| ChainResult {
                chain: key.clone(),
                balance_native: Some("1".to_string()),
                balance_usd: Some("3000".to_string()),
                balance_local: Some("21000".to_string()),
                ..ChainResult::default()
            })
            .collect();
        Ok(AddressResult {
            address: address.to_string(),
            chains,
            ..AddressResult::default()
        })
    }
}

fn request(id: u64, target: QueryTarget, keys: &[&str]) -> FetchRequest {
    let network_keys: Vec<String> = keys.iter().map(|k| k.to_string()).collect();
    FetchRequest {
        ticket: FetchTicket {
            id,
            target_key: target.key(&network_keys),
        },
        target,
        network_keys,
        trigger: FetchTrigger::Manual,
    }
}

#[test]
fn catalog_round_trip() {
    let bridge = RuntimeBridge::new(Arc::new(MockApi::default())).unwrap();
    bridge
        .send(RuntimeCommand::LoadCatalog {
            keyword: Some("op".to_string()),
        })
        .unwrap();

    match bridge.wait_event(WAIT) {
        Some(RuntimeEvent::CatalogReady { keyword, networks }) => {
            assert_eq!(keyword.as_deref(), Some("op"));
            assert_eq!(networks, vec![NetworkRef::new(10, "Optimism", "optimism")]);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn single_fetch_reports_ticket() {
    let bridge = RuntimeBridge::new(Arc::new(MockApi::default())).unwrap();
    let req = request(7, QueryTarget::Address("0xA".into()), &["mainnet", "polygon"]);
    let ticket = req.ticket.clone();
    bridge.send(RuntimeCommand::FetchBalances(req)).unwrap();

    match bridge.wait_event(WAIT) {
        Some(RuntimeEvent::BalancesReady { ticket: got, results }) => {
            assert_eq!(got, ticket);
            match results {
                QueryResults::Single(result) => {
                    assert_eq!(result.address, "0xA");
                    assert_eq!(result.chains.len(), 2);
                }
                other => panic!("unexpected results {other:?}"),
            }
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn batch_fails_as_a_whole() {
    let bridge = RuntimeBridge::new(Arc::new(MockApi::default())).unwrap();
    let target = QueryTarget::batch(["0xA", "0xfail", "0xB"]).unwrap();
    bridge
        .send(RuntimeCommand::FetchBalances(request(3, target, &["mainnet"])))
        .unwrap();

    match bridge.wait_event(WAIT) {
        Some(RuntimeEvent::BalancesFailed {
            ticket,
            message,
            transport,
        }) => {
            assert_eq!(ticket.id, 3);
            assert!(message.contains("500"));
            assert!(!transport);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn shutdown_on_drop() {
    let bridge = RuntimeBridge::new(Arc::new(MockApi::default())).unwrap();
    bridge.send(RuntimeCommand::Shutdown).unwrap();
    drop(bridge);
}

#[tokio::test]
async fn batch_fans_out_one_call_per_address() {
    let api = MockApi::default();
    let target = QueryTarget::batch(["0xA", "0xB", "0xC"]).unwrap();
    let results = fetch_target(&api, &target, &["mainnet".to_string()])
        .await
        .unwrap();

    assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    match results {
        QueryResults::Batch(items) => {
            let order: Vec<&str> = items.iter().map(|r| r.address.as_str()).collect();
            assert_eq!(order, vec!["0xA", "0xB", "0xC"]);
        }
        other => panic!("unexpected results {other:?}"),
    }
}

#[test]
fn api_error_kinds() {
    let status = ApiError::Status {
        status: 503,
        body: String::new(),
    };
    assert!(status.is_retryable());
    assert!(!status.is_transport());
    assert!(!ApiError::Decode("bad".into()).is_retryable());
    assert!(!ApiError::Status {
        status: 404,
        body: String::new()
    }
    .is_retryable());
}
