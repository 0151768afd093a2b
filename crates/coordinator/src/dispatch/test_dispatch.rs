use std::collections::HashSet;
use std::str::FromStr;
use std::time::Instant;

use pulse_common::probe::{
    CurlRequest, DnsRequest, MtrResult, ProbeArgs, ProbeEnvelope, ProbeOutcome,
};
use pulse_common::state::AgentSerial;

use super::{backfill_translations, dispatch};
use crate::state::testing::{mock_session, test_state, MockBehavior};

fn curl_envelope(filter: Vec<AgentSerial>) -> ProbeEnvelope {
    ProbeEnvelope::new(
        ProbeArgs::Curl(CurlRequest {
            path: "/".to_owned(),
            endpoint: "example.com".to_owned(),
            host: "example.com".to_owned(),
            ssl: true,
            agent_filter: Vec::new(),
        }),
        filter,
    )
}

fn dns_envelope(targets: Vec<String>) -> ProbeEnvelope {
    ProbeEnvelope::new(
        ProbeArgs::Dns(DnsRequest {
            host: "www.example.com.".to_owned(),
            qtype: 1,
            targets,
            no_recursion: false,
            agent_filter: Vec::new(),
        }),
        Vec::new(),
    )
}

#[tokio::test]
async fn empty_filter_fans_out_to_every_session() {
    let (state, _guard) = test_state(5);
    let mut servers = Vec::new();
    for (serial, addr) in [
        ("100", "10.1.0.1:40000"),
        ("200", "10.1.0.2:40000"),
        ("300", "10.1.0.3:40000"),
    ] {
        let (session, server) = mock_session(serial, addr, MockBehavior::Responsive);
        session.populate(&state.directory).unwrap();
        state.registry.insert(session);
        servers.push(server);
    }

    let results = dispatch(&state, curl_envelope(Vec::new())).await;
    assert_eq!(results.len(), 3);

    let serials: HashSet<_> = results
        .iter()
        .map(|r| r.agent_serial.clone().unwrap().to_string())
        .collect();
    assert_eq!(serials.len(), 3, "no serial appears twice");
}

#[tokio::test]
async fn filter_selects_exactly_the_named_serials() {
    let (state, _guard) = test_state(5);
    let mut servers = Vec::new();
    for (serial, addr) in [
        ("100", "10.1.0.1:40000"),
        ("200", "10.1.0.2:40000"),
        ("300", "10.1.0.3:40000"),
    ] {
        let (session, server) = mock_session(serial, addr, MockBehavior::Responsive);
        session.populate(&state.directory).unwrap();
        state.registry.insert(session);
        servers.push(server);
    }

    let filter = vec![
        AgentSerial::from_str("100").unwrap(),
        AgentSerial::from_str("200").unwrap(),
    ];
    let results = dispatch(&state, curl_envelope(filter)).await;

    let mut serials: Vec<_> = results
        .iter()
        .map(|r| r.agent_serial.clone().unwrap().to_string())
        .collect();
    serials.sort();
    assert_eq!(serials, vec!["100", "200"]);
}

#[tokio::test]
async fn unknown_filter_returns_empty_without_waiting() {
    let (state, _guard) = test_state(60);
    let (session, _srv) = mock_session("100", "10.1.0.1:40000", MockBehavior::Responsive);
    state.registry.insert(session);

    let started = Instant::now();
    let filter = vec![AgentSerial::from_str("424242").unwrap()];
    let results = dispatch(&state, curl_envelope(filter)).await;

    assert!(results.is_empty());
    assert!(started.elapsed().as_secs() < 5);
}

#[tokio::test]
async fn results_carry_the_session_snapshot() {
    let (state, _guard) = test_state(5);
    let (session, _srv) = mock_session("12345", "203.0.113.77:40000", MockBehavior::Responsive);
    session.populate(&state.directory).unwrap();
    state.registry.insert(session);

    let results = dispatch(&state, curl_envelope(Vec::new())).await;
    assert_eq!(results.len(), 1);

    let result = &results[0];
    assert_eq!(result.agent_serial.clone().unwrap().to_string(), "12345");
    assert_eq!(result.agent_name, "probe-12345");
    assert_eq!(result.asn.as_deref(), Some("AS64512"));
    assert_eq!(result.as_name.as_deref(), Some("Test Net"));
    assert_eq!(result.anonymized_ip, "203.0.113.0");
    assert!(result.body.is_some());
}

#[tokio::test]
async fn wedged_agent_is_evicted_within_the_budget() {
    let (state, _guard) = test_state(1);
    let (good, _srv_good) = mock_session("1", "10.1.0.1:40000", MockBehavior::Responsive);
    let (bad, _srv_bad) = mock_session("900", "10.1.0.9:40000", MockBehavior::Wedged);
    good.populate(&state.directory).unwrap();
    state.registry.insert(good);
    state.registry.insert(bad);

    let started = Instant::now();
    let results = dispatch(&state, curl_envelope(Vec::new())).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].agent_serial.clone().unwrap().to_string(), "1");
    assert!(started.elapsed().as_secs() < 5);

    // the wedged session is gone before the dispatch returned
    assert!(state
        .registry
        .lookup(&AgentSerial::from_str("900").unwrap())
        .is_none());
    assert_eq!(state.registry.len(), 1);
}

#[tokio::test]
async fn vanished_agent_is_evicted_on_shutdown() {
    let (state, _guard) = test_state(5);
    let (session, server) = mock_session("77", "10.1.0.7:40000", MockBehavior::Responsive);
    state.registry.insert(session);
    server.abort();
    // let the transport observe the closed channel
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let results = dispatch(&state, curl_envelope(Vec::new())).await;
    assert!(results.is_empty());
    assert!(state.registry.is_empty());
}

#[tokio::test]
async fn empty_dns_targets_get_per_agent_defaults() {
    let (state, _guard) = test_state(5);
    let (session, _srv) = mock_session("5", "10.1.0.5:40000", MockBehavior::Responsive);
    session.populate(&state.directory).unwrap();
    state.registry.insert(session);

    let results = dispatch(&state, dns_envelope(Vec::new())).await;
    assert_eq!(results.len(), 1);

    let Some(ProbeOutcome::Dns(body)) = &results[0].body else {
        panic!("expected a dns body");
    };
    let servers: Vec<_> = body.results.iter().map(|r| r.server.as_str()).collect();
    assert!(servers.contains(&"8.8.8.8:53"));
    assert!(servers.contains(&"208.67.222.222:53"));
}

#[tokio::test]
async fn explicit_dns_targets_are_left_alone() {
    let (state, _guard) = test_state(5);
    let (session, _srv) = mock_session("5", "10.1.0.5:40000", MockBehavior::Responsive);
    session.populate(&state.directory).unwrap();
    state.registry.insert(session);

    let results = dispatch(&state, dns_envelope(vec!["1.1.1.1:53".to_owned()])).await;
    let Some(ProbeOutcome::Dns(body)) = &results[0].body else {
        panic!("expected a dns body");
    };
    assert_eq!(body.results.len(), 1);
    assert_eq!(body.results[0].server, "1.1.1.1:53");
}

#[test]
fn translations_backfill_only_empty_fields() {
    let mut result = pulse_common::probe::ProbeResult::from_body(ProbeOutcome::Mtr(MtrResult {
        result: None,
        err: "context deadline exceeded".to_owned(),
        err_english: String::new(),
    }));
    backfill_translations(&mut result);
    let Some(ProbeOutcome::Mtr(body)) = &result.body else {
        panic!("expected an mtr body");
    };
    assert!(body.err_english.starts_with("Test was cancelled"));

    // an agent-provided sentence is never overwritten
    let mut result = pulse_common::probe::ProbeResult::from_body(ProbeOutcome::Mtr(MtrResult {
        result: None,
        err: "context deadline exceeded".to_owned(),
        err_english: "already translated".to_owned(),
    }));
    backfill_translations(&mut result);
    let Some(ProbeOutcome::Mtr(body)) = &result.body else {
        panic!("expected an mtr body");
    };
    assert_eq!(body.err_english, "already translated");
}
