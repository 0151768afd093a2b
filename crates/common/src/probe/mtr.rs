use serde::{Deserialize, Serialize};

use crate::state::AgentSerial;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MtrRequest {
    #[serde(rename = "Target")]
    pub target: String,
    /// Blank for auto, "4" to force IPv4, "6" to force IPv6.
    #[serde(rename = "IPv", default)]
    pub ipv: String,
    #[serde(rename = "AgentFilter", default)]
    pub agent_filter: Vec<AgentSerial>,
}

/// One traceroute hop. A hop can answer from several addresses across
/// rounds, so IP, host and ASN are parallel lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MtrHop {
    #[serde(rename = "IP", default)]
    pub ip: Vec<String>,
    #[serde(rename = "Host", default)]
    pub host: Vec<String>,
    /// ASN per address, filled by the coordinator.
    #[serde(rename = "ASN", default)]
    pub asn: Vec<String>,
    #[serde(rename = "Sent", default)]
    pub sent: u32,
    #[serde(rename = "LostPercent", default)]
    pub lost_percent: f64,
    /// Round-trip aggregates in nanoseconds.
    #[serde(rename = "Avg", default)]
    pub avg: u64,
    #[serde(rename = "Best", default)]
    pub best: u64,
    #[serde(rename = "Worst", default)]
    pub worst: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MtrOutput {
    #[serde(rename = "Hops", default)]
    pub hops: Vec<MtrHop>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MtrResult {
    #[serde(rename = "Result")]
    pub result: Option<MtrOutput>,
    #[serde(rename = "Err", default)]
    pub err: String,
    #[serde(rename = "ErrEnglish", default)]
    pub err_english: String,
}
