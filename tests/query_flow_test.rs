//! Fetch orchestration: manual intent, background refresh and stale results

use std::time::{Duration, Instant};

use tally::domain::{
    FetchPhase, FetchTrigger, QueryOrchestrator, QueryTarget, RefreshPolicy, Settlement,
};

fn keys(list: &[&str]) -> Vec<String> {
    list.iter().map(|k| k.to_string()).collect()
}

fn single(addr: &str) -> QueryTarget {
    QueryTarget::Address(addr.to_string())
}

#[test]
fn arm_is_refused_without_networks() {
    let mut orch = QueryOrchestrator::new(RefreshPolicy::default());
    assert!(!orch.arm(false));
    assert!(!orch.should_fetch());
    assert_eq!(orch.phase(), FetchPhase::Idle);
}

#[test]
fn manual_fetch_runs_once_and_clears_intent() {
    let mut orch = QueryOrchestrator::new(RefreshPolicy::default());
    let now = Instant::now();
    let target = single("0xA");
    let nets = keys(&["mainnet"]);

    assert!(orch.arm(true));
    assert_eq!(orch.phase(), FetchPhase::ArmedManual);

    let request = orch.poll(now, Some(&target), &nets, None).unwrap();
    assert_eq!(request.trigger, FetchTrigger::Manual);
    assert_eq!(request.network_keys, nets);
    assert!(orch.is_loading());
    assert_eq!(orch.phase(), FetchPhase::Fetching);

    // Same key while in flight: nothing new starts
    assert!(orch.poll(now, Some(&target), &nets, None).is_none());

    let key = target.key(&nets);
    let verdict = orch.settle(&request.ticket, now, Some(&key), None);
    assert_eq!(verdict, Settlement::Commit);
    assert!(!orch.is_loading());
    assert!(!orch.should_fetch());
    assert_eq!(orch.phase(), FetchPhase::Idle);

    // Fresh result: no background refresh yet
    assert!(orch.poll(now, Some(&target), &nets, Some(now)).is_none());
}

#[test]
fn rearm_during_flight_survives_settle() {
    let mut orch = QueryOrchestrator::new(RefreshPolicy::default());
    let now = Instant::now();
    let target = single("0xA");
    let nets = keys(&["mainnet"]);
    let key = target.key(&nets);

    orch.arm(true);
    let first = orch.poll(now, Some(&target), &nets, None).unwrap();
    orch.arm(true);
    orch.settle(&first.ticket, now, Some(&key), None);
    assert!(orch.should_fetch());

    let second = orch.poll(now, Some(&target), &nets, Some(now)).unwrap();
    assert_eq!(second.trigger, FetchTrigger::Manual);
    assert_ne!(second.ticket.id, first.ticket.id);
    orch.settle(&second.ticket, now, Some(&key), None);
    assert!(!orch.should_fetch());
}

#[test]
fn failure_settles_without_data_and_keeps_error() {
    let mut orch = QueryOrchestrator::new(RefreshPolicy::default());
    let now = Instant::now();
    let target = single("0xA");
    let nets = keys(&["mainnet"]);
    let key = target.key(&nets);

    orch.arm(true);
    let request = orch.poll(now, Some(&target), &nets, None).unwrap();
    let verdict = orch.settle(&request.ticket, now, Some(&key), Some("timeout".into()));
    assert_eq!(verdict, Settlement::Discard);
    assert!(!orch.should_fetch());
    assert!(!orch.is_loading());
    assert_eq!(orch.last_error(), Some("timeout"));

    // No automatic retry
    assert!(orch.poll(now + Duration::from_secs(1), Some(&target), &nets, None).is_none());

    // Explicit re-arm retries and clears the error
    orch.arm(true);
    assert!(orch.last_error().is_none());
    assert!(orch.poll(now, Some(&target), &nets, None).is_some());
}

#[test]
fn superseded_result_is_discarded() {
    let mut orch = QueryOrchestrator::new(RefreshPolicy::default());
    let now = Instant::now();
    let nets = keys(&["mainnet", "polygon"]);
    let old_target = QueryTarget::batch(["0xA", "0xB"]).unwrap();
    let new_target = QueryTarget::batch(["0xC"]).unwrap();

    orch.arm(true);
    let old = orch.poll(now, Some(&old_target), &nets, None).unwrap();

    orch.arm(true);
    let new = orch.poll(now, Some(&new_target), &nets, None).unwrap();
    assert_ne!(old.ticket.target_key, new.ticket.target_key);

    let new_key = new_target.key(&nets);
    // The old batch finishes late and must not be committed
    assert_eq!(
        orch.settle(&old.ticket, now, Some(&new_key), None),
        Settlement::Discard
    );
    assert!(orch.is_loading());
    assert_eq!(
        orch.settle(&new.ticket, now, Some(&new_key), None),
        Settlement::Commit
    );
}

#[test]
fn result_for_a_target_no_longer_shown_is_discarded() {
    let mut orch = QueryOrchestrator::new(RefreshPolicy::default());
    let now = Instant::now();
    let target = single("0xA");
    let nets = keys(&["mainnet"]);

    orch.arm(true);
    let request = orch.poll(now, Some(&target), &nets, None).unwrap();
    let other = single("0xB").key(&nets);
    assert_eq!(
        orch.settle(&request.ticket, now, Some(&other), None),
        Settlement::Discard
    );
    assert_eq!(
        orch.settle(&request.ticket, now, None, None),
        Settlement::Discard
    );
}

#[test]
fn background_refresh_follows_single_cadence() {
    let mut orch = QueryOrchestrator::new(RefreshPolicy::default());
    let start = Instant::now();
    let target = single("0xA");
    let nets = keys(&["mainnet"]);
    let key = target.key(&nets);

    orch.arm(true);
    let first = orch.poll(start, Some(&target), &nets, None).unwrap();
    orch.settle(&first.ticket, start, Some(&key), None);

    let early = start + Duration::from_secs(59);
    assert!(orch.poll(early, Some(&target), &nets, Some(start)).is_none());

    let due = start + Duration::from_secs(60);
    let bg = orch.poll(due, Some(&target), &nets, Some(start)).unwrap();
    assert_eq!(bg.trigger, FetchTrigger::Background);
    assert!(!orch.should_fetch());

    // Never two attempts for the same key
    assert!(orch.poll(due, Some(&target), &nets, Some(start)).is_none());
}

#[test]
fn background_refresh_follows_batch_interval() {
    let mut orch = QueryOrchestrator::new(RefreshPolicy::default());
    let start = Instant::now();
    let target = QueryTarget::batch(["0xA", "0xB"]).unwrap();
    let nets = keys(&["mainnet"]);
    let key = target.key(&nets);

    orch.arm(true);
    let first = orch.poll(start, Some(&target), &nets, None).unwrap();
    orch.settle(&first.ticket, start, Some(&key), None);

    // Stale after 60s, but the batch interval is 120s
    let stale = start + Duration::from_secs(90);
    assert!(orch.poll(stale, Some(&target), &nets, Some(start)).is_none());
    let due = start + Duration::from_secs(120);
    assert_eq!(
        orch.poll(due, Some(&target), &nets, Some(start)).unwrap().trigger,
        FetchTrigger::Background
    );
}

#[test]
fn nothing_starts_without_target_or_networks() {
    let mut orch = QueryOrchestrator::new(RefreshPolicy::default());
    let now = Instant::now();
    orch.arm(true);
    assert!(orch.poll(now, None, &keys(&["mainnet"]), None).is_none());
    assert!(orch.poll(now, Some(&single("0xA")), &[], None).is_none());
    assert!(orch.should_fetch());
}

#[test]
fn disarm_and_reset_clear_intent() {
    let mut orch = QueryOrchestrator::new(RefreshPolicy::default());
    orch.arm(true);
    orch.disarm();
    assert!(!orch.should_fetch());

    orch.arm(true);
    orch.reset();
    assert!(!orch.should_fetch());
    assert!(orch.last_error().is_none());
}
