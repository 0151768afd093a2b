use std::str::FromStr;

use pulse_common::state::AgentSerial;

use super::liveness::ping_session;
use super::testing::{mock_session, test_state, MockBehavior};
use super::AgentRegistry;

#[tokio::test]
async fn snapshot_honors_the_filter() {
    let registry = AgentRegistry::new();
    let (a, _srv_a) = mock_session("100", "10.0.0.1:40000", MockBehavior::Responsive);
    let (b, _srv_b) = mock_session("200", "10.0.0.2:40000", MockBehavior::Responsive);
    let (c, _srv_c) = mock_session("300", "10.0.0.3:40000", MockBehavior::Responsive);
    registry.insert(a);
    registry.insert(b);
    registry.insert(c);

    assert_eq!(registry.snapshot(&[]).len(), 3);

    let filter = vec![
        AgentSerial::from_str("100").unwrap(),
        AgentSerial::from_str("200").unwrap(),
    ];
    let mut selected: Vec<_> = registry
        .snapshot(&filter)
        .iter()
        .map(|s| s.identity().serial.to_string())
        .collect();
    selected.sort();
    assert_eq!(selected, vec!["100", "200"]);

    let unknown = vec![AgentSerial::from_str("999").unwrap()];
    assert!(registry.snapshot(&unknown).is_empty());
}

#[tokio::test]
async fn unregister_removes_from_snapshot() {
    let registry = AgentRegistry::new();
    let (a, _srv_a) = mock_session("1", "10.0.0.1:40000", MockBehavior::Responsive);
    let (b, _srv_b) = mock_session("2", "10.0.0.2:40000", MockBehavior::Responsive);
    registry.insert(a.clone());
    registry.insert(b);

    registry.unregister(&a);
    assert_eq!(registry.len(), 1);
    assert!(registry
        .snapshot(&[])
        .iter()
        .all(|s| s.identity().serial.as_str() != "1"));

    // duplicate removal is tolerated
    registry.unregister(&a);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn lookup_finds_sessions_by_serial() {
    let registry = AgentRegistry::new();
    let (a, _srv) = mock_session("12345", "10.0.0.1:40000", MockBehavior::Responsive);
    registry.insert(a);

    let serial = AgentSerial::from_str("12345").unwrap();
    let found = registry.lookup(&serial).expect("session should be indexed");
    assert_eq!(found.identity().common_name, "probe-12345");
    assert!(registry
        .lookup(&AgentSerial::from_str("54321").unwrap())
        .is_none());
}

#[tokio::test]
async fn healthy_ping_refreshes_last_seen() {
    let (state, _guard) = test_state(1);
    let (session, _srv) = mock_session("7", "10.0.0.7:40000", MockBehavior::Responsive);
    state.registry.insert(session.clone());

    let before = session.last_seen();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    ping_session(&state, session.clone()).await;

    assert!(session.last_seen() > before);
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn failed_ping_evicts_the_session() {
    let (state, _guard) = test_state(1);
    let (session, _srv) = mock_session("8", "10.0.0.8:40000", MockBehavior::Wedged);
    state.registry.insert(session.clone());

    ping_session(&state, session).await;
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn repopulate_refreshes_session_profiles() {
    let (state, _guard) = test_state(1);
    let (session, _srv) = mock_session("55", "10.0.0.5:40000", MockBehavior::Responsive);
    session.populate(&state.directory).unwrap();
    state.registry.insert(session.clone());

    assert_eq!(session.profile().name, "probe-55");
    let first_online = session.profile().first_online.clone();
    assert!(!first_online.is_empty());

    // repopulate twice against an unchanged directory: idempotent
    state.registry.repopulate(&state.directory);
    state.registry.repopulate(&state.directory);
    assert_eq!(session.profile().name, "probe-55");
    assert_eq!(session.profile().first_online, first_online);
    assert_eq!(state.registry.len(), 1);
}
