//! Probe request/result types shared between the coordinator and agents.
//!
//! The serde tags on [`ProbeArgs`] and [`ProbeOutcome`] are the stable wire
//! names; they must never be renamed once agents in the field speak them.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::AgentSerial;

mod curl;
mod dns;
mod mtr;

pub use curl::{CurlRequest, CurlResult};
pub use dns::{DnsRequest, DnsResult, IndividualDnsResult, DEFAULT_DNS_TARGETS};
pub use mtr::{MtrHop, MtrOutput, MtrRequest, MtrResult};

#[cfg(test)]
mod test_probe;

/// One operator request, fanned out to the selected agents. Each agent
/// receives an independent clone so per-agent defaulting never aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeEnvelope {
    #[serde(flatten)]
    pub args: ProbeArgs,
    #[serde(rename = "RequestedAt")]
    pub requested_at: DateTime<Utc>,
    /// Serials to dispatch to. Empty means every live agent.
    #[serde(rename = "AgentFilter", default)]
    pub agent_filter: Vec<AgentSerial>,
}

impl ProbeEnvelope {
    pub fn new(args: ProbeArgs, agent_filter: Vec<AgentSerial>) -> Self {
        Self {
            args,
            requested_at: Utc::now(),
            agent_filter,
        }
    }

    pub fn kind(&self) -> ProbeKind {
        self.args.kind()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeKind {
    Dns,
    Curl,
    Mtr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "Type", content = "Args")]
pub enum ProbeArgs {
    #[serde(rename = "DNSRequest")]
    Dns(DnsRequest),
    #[serde(rename = "CurlRequest")]
    Curl(CurlRequest),
    #[serde(rename = "MtrRequest")]
    Mtr(MtrRequest),
}

impl ProbeArgs {
    pub fn kind(&self) -> ProbeKind {
        match self {
            Self::Dns(_) => ProbeKind::Dns,
            Self::Curl(_) => ProbeKind::Curl,
            Self::Mtr(_) => ProbeKind::Mtr,
        }
    }
}

/// The variant-typed body an agent hands back for one probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "Type", content = "Result")]
pub enum ProbeOutcome {
    #[serde(rename = "DNSResult")]
    Dns(DnsResult),
    #[serde(rename = "CurlResult")]
    Curl(CurlResult),
    #[serde(rename = "MtrResult")]
    Mtr(MtrResult),
}

/// A probe reply plus the attribution the dispatcher stamps on from the
/// session snapshot. Either `body` is present or `err` is non-empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(flatten)]
    pub body: Option<ProbeOutcome>,
    #[serde(rename = "Err", default)]
    pub err: String,
    #[serde(rename = "Id")]
    pub agent_serial: Option<AgentSerial>,
    #[serde(rename = "Name", default)]
    pub agent_name: String,
    #[serde(rename = "ASN")]
    pub asn: Option<String>,
    #[serde(rename = "ASName")]
    pub as_name: Option<String>,
    #[serde(rename = "City", default)]
    pub city: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Country", default)]
    pub country: String,
    /// Anonymized remote address of the agent, `a.b.c.0` form.
    #[serde(rename = "Agent", default)]
    pub anonymized_ip: String,
}

impl ProbeResult {
    pub fn from_body(body: ProbeOutcome) -> Self {
        Self {
            body: Some(body),
            ..Default::default()
        }
    }

    pub fn from_err(err: impl Into<String>) -> Self {
        Self {
            err: err.into(),
            ..Default::default()
        }
    }
}

/// Render a duration the way operators expect to read round trips:
/// the largest unit that keeps the value >= 1, trailing zeros trimmed.
pub fn humanize_duration(d: Duration) -> String {
    let ns = d.as_nanos();
    if ns == 0 {
        return "0s".to_owned();
    }
    let (value, unit) = if ns < 1_000 {
        return format!("{ns}ns");
    } else if ns < 1_000_000 {
        (ns as f64 / 1e3, "µs")
    } else if ns < 1_000_000_000 {
        (ns as f64 / 1e6, "ms")
    } else {
        (ns as f64 / 1e9, "s")
    };
    let mut text = format!("{value:.9}");
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    format!("{text}{unit}")
}
