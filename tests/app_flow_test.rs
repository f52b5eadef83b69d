//! App-level flows without the TUI: selection, submission, fetch lifecycle

use std::time::{Duration, Instant};

use tally::app::{App, InputMode, QueryMode, StatusLevel};
use tally::config::Config;
use tally::core::{parse_command, Action};
use tally::domain::{
    AddressResult, ChainResult, FetchTrigger, InputRejection, NetworkRef, QueryOutput,
    QueryResults, Toggle, MAX_SELECTED,
};

const ADDR_A: &str = "0x52908400098527886E0F7030069857D2E4169EE7";
const ADDR_B: &str = "0x8617E340B3D01FA5F11F306F4090FD50E238070D";
const ADDR_C: &str = "0xde709f2102306220921060314715629080e2fb77";

fn app() -> App {
    App::new(&Config::default())
}

fn app_with_networks() -> App {
    let mut app = app();
    app.toggle_network(NetworkRef::new(1, "Ethereum", "mainnet"));
    app.toggle_network(NetworkRef::new(137, "Polygon", "polygon"));
    app
}

fn result_for(address: &str, native: &str) -> AddressResult {
    AddressResult {
        address: address.to_string(),
        chains: vec![ChainResult {
            chain: "mainnet".to_string(),
            balance_native: Some(native.to_string()),
            balance_usd: Some("0".to_string()),
            balance_local: Some("0".to_string()),
            ..ChainResult::default()
        }],
        ..AddressResult::default()
    }
}

fn shown_address(app: &App) -> Option<String> {
    match &app.output {
        Some(QueryOutput::Single { address, .. }) => Some(address.clone()),
        _ => None,
    }
}

#[test]
fn adding_a_network_arms_and_emptying_disarms() {
    let mut app = app();
    assert_eq!(
        app.toggle_network(NetworkRef::new(1, "Ethereum", "mainnet")),
        Toggle::Added
    );
    assert!(app.query.should_fetch());

    assert_eq!(app.toggle_key("mainnet"), Toggle::Removed { emptied: true });
    assert!(!app.query.should_fetch());
    assert!(app.output.is_none());
    assert!(app.cache.is_empty());
}

#[test]
fn capacity_rejection_is_advisory() {
    let mut app = app();
    for i in 0..MAX_SELECTED {
        app.toggle_key(&format!("chain{i}"));
    }
    assert_eq!(app.toggle_key("extra"), Toggle::Rejected);
    assert_eq!(app.selection.len(), MAX_SELECTED);
    let (text, level) = app.status_text().unwrap();
    assert_eq!(level, StatusLevel::Warn);
    assert!(text.contains("network limit reached"));
}

#[test]
fn invalid_submissions_change_nothing() {
    let mut app = app();
    assert_eq!(app.submit_address("   "), Err(InputRejection::Empty));
    assert!(matches!(
        app.submit_address("hello"),
        Err(InputRejection::InvalidAddress(_))
    ));
    assert_eq!(
        app.submit_address(ADDR_A),
        Err(InputRejection::NoNetworksSelected)
    );
    assert_eq!(
        app.submit_batch("nope, still nope"),
        Err(InputRejection::NoValidAddresses)
    );
    assert!(app.history.is_empty());
    assert!(app.address.is_none());
    assert!(!app.query.should_fetch());
}

#[test]
fn submitted_address_is_fetched_and_committed() {
    let mut app = app_with_networks();
    app.submit_address(&format!("  {ADDR_A}  ")).unwrap();
    assert_eq!(app.address.as_deref(), Some(ADDR_A));
    assert_eq!(app.history.entry(0).unwrap().address, ADDR_A);

    let now = Instant::now();
    let request = app.take_fetch_request(now).unwrap();
    assert_eq!(request.trigger, FetchTrigger::Manual);
    assert_eq!(request.network_keys, vec!["mainnet", "polygon"]);
    assert!(app.is_loading());
    assert!(app.take_fetch_request(now).is_none());

    app.apply_balances(request.ticket, QueryResults::Single(result_for(ADDR_A, "1.5")), now);
    assert!(!app.is_loading());
    assert!(!app.query.should_fetch());
    assert_eq!(shown_address(&app).as_deref(), Some(ADDR_A));
    assert_eq!(app.cache.len(), 1);
}

#[test]
fn late_result_for_previous_address_is_dropped() {
    let mut app = app_with_networks();
    let now = Instant::now();

    app.submit_address(ADDR_A).unwrap();
    let first = app.take_fetch_request(now).unwrap();
    app.submit_address(ADDR_B).unwrap();
    let second = app.take_fetch_request(now).unwrap();

    app.apply_balances(first.ticket, QueryResults::Single(result_for(ADDR_A, "1")), now);
    assert!(app.output.is_none());
    assert!(app.is_loading());

    app.apply_balances(second.ticket, QueryResults::Single(result_for(ADDR_B, "2")), now);
    assert_eq!(shown_address(&app).as_deref(), Some(ADDR_B));
    assert_eq!(app.cache.len(), 1);
}

#[test]
fn cached_output_shows_while_refetching() {
    let mut app = app_with_networks();
    let now = Instant::now();

    app.submit_address(ADDR_A).unwrap();
    let a = app.take_fetch_request(now).unwrap();
    app.apply_balances(a.ticket, QueryResults::Single(result_for(ADDR_A, "1")), now);

    app.submit_address(ADDR_B).unwrap();
    let b = app.take_fetch_request(now).unwrap();
    assert!(app.output.is_none());
    app.apply_balances(b.ticket, QueryResults::Single(result_for(ADDR_B, "2")), now);

    let later = now + Duration::from_secs(5);
    app.submit_address(ADDR_A).unwrap();
    let again = app.take_fetch_request(later).unwrap();
    assert_eq!(again.trigger, FetchTrigger::Manual);
    assert_eq!(shown_address(&app).as_deref(), Some(ADDR_A));
}

#[test]
fn failed_fetch_keeps_output_and_offers_retry() {
    let mut app = app_with_networks();
    let now = Instant::now();

    app.submit_address(ADDR_A).unwrap();
    let first = app.take_fetch_request(now).unwrap();
    app.apply_balances(first.ticket, QueryResults::Single(result_for(ADDR_A, "1")), now);

    assert!(app.trigger_fetch());
    let retry = app.take_fetch_request(now).unwrap();
    app.apply_fetch_failure(retry.ticket, "connection refused".into(), true, now);

    assert_eq!(shown_address(&app).as_deref(), Some(ADDR_A));
    assert_eq!(app.query.last_error(), Some("connection refused"));
    let (text, level) = app.status_text().unwrap();
    assert_eq!(level, StatusLevel::Error);
    assert!(text.contains("r to retry"));
    assert!(app.take_fetch_request(now).is_none());
}

#[test]
fn batch_submission_filters_and_records() {
    let mut app = app_with_networks();
    let text = format!("{ADDR_A}\n{ADDR_B}, bogus {ADDR_A}\nvitalik.eth");
    let rejected = app.submit_batch(&text).unwrap();

    assert_eq!(rejected, vec!["bogus"]);
    assert_eq!(app.mode, QueryMode::Batch);
    assert_eq!(app.batch, vec![ADDR_A, ADDR_B, "vitalik.eth"]);
    assert_eq!(app.history.len(), 3);

    let request = app.take_fetch_request(Instant::now()).unwrap();
    assert!(request.target.is_batch());
    assert_eq!(request.target.addresses().len(), 3);
}

#[test]
fn toggling_mode_clears_batch_and_output() {
    let mut app = app_with_networks();
    let now = Instant::now();
    app.submit_batch(&format!("{ADDR_A} {ADDR_B}")).unwrap();
    let request = app.take_fetch_request(now).unwrap();
    app.apply_balances(
        request.ticket,
        QueryResults::Batch(vec![result_for(ADDR_A, "1"), result_for(ADDR_B, "2")]),
        now,
    );
    assert!(matches!(app.output, Some(QueryOutput::Batch { .. })));

    app.toggle_mode();
    assert_eq!(app.mode, QueryMode::Single);
    assert!(app.batch.is_empty());
    assert!(app.output.is_none());
}

#[test]
fn recall_restores_networks_and_queries() {
    let mut app = app_with_networks();
    app.submit_address(ADDR_A).unwrap();
    app.toggle_key("mainnet");
    app.toggle_key("polygon");
    app.toggle_key("base");
    app.submit_address(ADDR_C).unwrap();

    // ADDR_A is second now
    assert_eq!(app.history.entry(1).unwrap().address, ADDR_A);
    assert!(app.recall_history(1));

    assert_eq!(app.address.as_deref(), Some(ADDR_A));
    assert_eq!(app.selection.keys(), vec!["mainnet", "polygon"]);
    assert_eq!(app.history.entry(0).unwrap().address, ADDR_A);
    assert!(app.query.should_fetch());
    assert!(!app.recall_history(10));
}

#[test]
fn clearing_selection_drops_results() {
    let mut app = app_with_networks();
    let now = Instant::now();
    app.submit_address(ADDR_A).unwrap();
    let request = app.take_fetch_request(now).unwrap();

    app.clear_selection();
    assert!(!app.query.should_fetch());

    // The in-flight result arrives after the selection was emptied
    app.apply_balances(request.ticket, QueryResults::Single(result_for(ADDR_A, "1")), now);
    assert!(app.output.is_none());
    assert!(app.cache.is_empty());
    assert!(app.take_fetch_request(now).is_none());
}

#[test]
fn catalog_is_cached_per_keyword() {
    let mut app = app();
    app.toggle_key("mainnet");
    let now = Instant::now();

    app.request_catalog(None, now);
    assert_eq!(app.take_catalog_request(), Some(None));
    app.apply_catalog(
        None,
        vec![
            NetworkRef::new(1, "Ethereum", "mainnet"),
            NetworkRef::new(8453, "Base", "base"),
        ],
        now,
    );
    assert!(!app.catalog_loading);
    assert_eq!(app.catalog.len(), 2);
    assert_eq!(app.selection.networks()[0].name, "Ethereum");

    app.request_catalog(Some("ba".into()), now);
    assert_eq!(app.take_catalog_request(), Some(Some("ba".into())));
    app.apply_catalog(Some("ba".into()), vec![NetworkRef::new(8453, "Base", "base")], now);

    app.request_catalog(Some("  ".into()), now + Duration::from_secs(10));
    assert!(app.take_catalog_request().is_none());
    assert_eq!(app.catalog.len(), 2);

    app.request_catalog(None, now + Duration::from_secs(301));
    assert_eq!(app.take_catalog_request(), Some(None));
}

#[test]
fn cached_search_over_inflight_load_stops_spinner() {
    let mut app = app();
    let now = Instant::now();
    let eth = vec![NetworkRef::new(1, "Ethereum", "mainnet")];

    app.request_catalog(Some("eth".into()), now);
    assert_eq!(app.take_catalog_request(), Some(Some("eth".into())));
    app.apply_catalog(Some("eth".into()), eth.clone(), now);

    app.request_catalog(None, now);
    assert_eq!(app.take_catalog_request(), Some(None));
    assert!(app.catalog_loading);

    app.request_catalog(Some("eth".into()), now + Duration::from_secs(1));
    assert!(app.take_catalog_request().is_none());
    assert!(!app.catalog_loading);
    assert_eq!(app.catalog, eth);

    app.apply_catalog(
        None,
        vec![
            NetworkRef::new(1, "Ethereum", "mainnet"),
            NetworkRef::new(8453, "Base", "base"),
        ],
        now + Duration::from_secs(2),
    );
    assert!(!app.catalog_loading);
    assert_eq!(app.catalog, eth);
}

#[test]
fn commands_drive_the_app() {
    let mut app = app();
    let now = Instant::now();

    let action = app.execute_command(&parse_command("chain mainnet"), now);
    app.apply_action(action);
    assert!(app.selection.contains("mainnet"));

    let action = app.execute_command(&parse_command(&format!("query {ADDR_A}")), now);
    app.apply_action(action);
    assert_eq!(app.address.as_deref(), Some(ADDR_A));

    let action = app.execute_command(&parse_command("copy 1"), now);
    assert_eq!(action, Action::Copy(ADDR_A.to_string()));
    app.apply_action(action);
    assert_eq!(app.take_copy_request().as_deref(), Some(ADDR_A));

    let action = app.execute_command(&parse_command(&format!("forget {ADDR_A}")), now);
    app.apply_action(action);
    assert!(app.history.is_empty());

    let action = app.execute_command(&parse_command("quit"), now);
    app.apply_action(action);
    assert!(app.should_quit);
}

#[test]
fn input_line_submits_by_mode() {
    let mut app = app_with_networks();
    app.enter_input(InputMode::Address);
    app.input.push_str(ADDR_B);
    app.submit_input(Instant::now());

    assert_eq!(app.input_mode, InputMode::Normal);
    assert!(app.input.is_empty());
    assert_eq!(app.address.as_deref(), Some(ADDR_B));
}
