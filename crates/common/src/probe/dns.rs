use serde::{Deserialize, Serialize};

use crate::state::AgentSerial;

/// Resolvers injected when an operator leaves the target list empty.
pub const DEFAULT_DNS_TARGETS: [&str; 2] = ["8.8.8.8:53", "208.67.222.222:53"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsRequest {
    /// The name to query, FQDN form.
    #[serde(rename = "Host")]
    pub host: String,
    /// Query type code (A = 1, AAAA = 28, ...).
    #[serde(rename = "QType")]
    pub qtype: u16,
    /// Nameservers to ask, `host:port` form. Empty means use per-agent
    /// defaults.
    #[serde(rename = "Targets", default)]
    pub targets: Vec<String>,
    #[serde(rename = "NoRecursion", default)]
    pub no_recursion: bool,
    #[serde(rename = "AgentFilter", default)]
    pub agent_filter: Vec<AgentSerial>,
}

impl DnsRequest {
    /// Fill in the default target set for one agent: the well-known public
    /// resolvers plus the agent's own resolvers, all annotated with port 53.
    /// Call on a per-agent clone only.
    pub fn apply_default_targets(&mut self, local_resolvers: &[String]) {
        self.targets = DEFAULT_DNS_TARGETS.iter().map(|s| (*s).to_owned()).collect();
        for resolver in local_resolvers {
            if !resolver.is_empty() {
                self.targets.push(format!("{resolver}:53"));
            }
        }
    }
}

/// One nameserver's answer within a DNS probe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndividualDnsResult {
    /// IP or hostname the query was sent to.
    #[serde(rename = "Server")]
    pub server: String,
    #[serde(rename = "Err", default)]
    pub err: String,
    /// Human friendly version of `err`.
    #[serde(rename = "ErrEnglish", default)]
    pub err_english: String,
    /// Round trip in nanoseconds.
    #[serde(rename = "Rtt", default)]
    pub rtt: u64,
    #[serde(rename = "RttStr", default)]
    pub rtt_str: String,
    /// Raw reply packet.
    #[serde(rename = "Raw", default)]
    pub raw: Vec<u8>,
    /// Dig-style rendering of `raw`, filled by the coordinator.
    #[serde(rename = "Formatted", default)]
    pub formatted: String,
    /// ASN of `server`, filled by the coordinator.
    #[serde(rename = "ASN")]
    pub asn: Option<String>,
    #[serde(rename = "ASName")]
    pub as_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DnsResult {
    #[serde(rename = "Results", default)]
    pub results: Vec<IndividualDnsResult>,
    /// Error with the probe as a whole.
    #[serde(rename = "Err", default)]
    pub err: String,
}
