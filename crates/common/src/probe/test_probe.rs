use std::str::FromStr;
use std::time::Duration;

use serde_json::json;

use super::*;
use crate::state::AgentSerial;

fn dns_args(targets: Vec<String>) -> ProbeArgs {
    ProbeArgs::Dns(DnsRequest {
        host: "www.example.com.".to_owned(),
        qtype: 1,
        targets,
        no_recursion: false,
        agent_filter: Vec::new(),
    })
}

#[test]
fn envelope_clones_are_independent() {
    let envelope = ProbeEnvelope::new(dns_args(Vec::new()), Vec::new());

    let mut clone = envelope.clone();
    if let ProbeArgs::Dns(req) = &mut clone.args {
        req.apply_default_targets(&["192.168.1.1".to_owned()]);
    }

    let ProbeArgs::Dns(original) = &envelope.args else {
        panic!("expected dns args");
    };
    assert!(original.targets.is_empty());
    let ProbeArgs::Dns(cloned) = &clone.args else {
        panic!("expected dns args");
    };
    assert_eq!(cloned.targets.len(), 3);
}

#[test]
fn default_targets_include_public_resolvers() {
    let mut req = DnsRequest {
        host: "example.org.".to_owned(),
        qtype: 1,
        targets: Vec::new(),
        no_recursion: true,
        agent_filter: Vec::new(),
    };
    req.apply_default_targets(&["10.0.0.53".to_owned(), String::new()]);

    assert_eq!(
        req.targets,
        vec!["8.8.8.8:53", "208.67.222.222:53", "10.0.0.53:53"]
    );
}

#[test]
fn wire_names_are_stable() {
    let envelope = ProbeEnvelope::new(
        ProbeArgs::Mtr(MtrRequest {
            target: "example.net".to_owned(),
            ipv: String::new(),
            agent_filter: vec![AgentSerial::from_str("42").unwrap()],
        }),
        vec![AgentSerial::from_str("42").unwrap()],
    );
    let value = serde_json::to_value(&envelope).unwrap();
    assert_eq!(value["Type"], json!("MtrRequest"));
    assert_eq!(value["Args"]["Target"], json!("example.net"));
    assert_eq!(value["AgentFilter"], json!(["42"]));

    let result = ProbeResult::from_body(ProbeOutcome::Curl(CurlResult {
        status: 200,
        ..Default::default()
    }));
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["Type"], json!("CurlResult"));
    assert_eq!(value["Result"]["Status"], json!(200));
}

#[test]
fn envelope_round_trips() {
    let envelope = ProbeEnvelope::new(dns_args(vec!["1.1.1.1:53".to_owned()]), Vec::new());
    let bytes = serde_json::to_vec(&envelope).unwrap();
    let back: ProbeEnvelope = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(back.kind(), ProbeKind::Dns);
    let ProbeArgs::Dns(req) = back.args else {
        panic!("expected dns args");
    };
    assert_eq!(req.targets, vec!["1.1.1.1:53"]);
}

#[test]
fn humanized_durations() {
    assert_eq!(humanize_duration(Duration::ZERO), "0s");
    assert_eq!(humanize_duration(Duration::from_nanos(512)), "512ns");
    assert_eq!(humanize_duration(Duration::from_nanos(110_043)), "110.043µs");
    assert_eq!(
        humanize_duration(Duration::from_nanos(132_406_652)),
        "132.406652ms"
    );
    assert_eq!(
        humanize_duration(Duration::from_nanos(15_001_603_612)),
        "15.001603612s"
    );
    assert_eq!(humanize_duration(Duration::from_secs(2)), "2s");
}
