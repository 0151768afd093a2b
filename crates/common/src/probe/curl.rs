use serde::{Deserialize, Serialize};

use crate::state::AgentSerial;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurlRequest {
    /// Request path, leading slash included.
    #[serde(rename = "Path")]
    pub path: String,
    /// Host or `host:port` actually dialed.
    #[serde(rename = "Endpoint")]
    pub endpoint: String,
    /// Value of the Host header, which may differ from the endpoint.
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "Ssl", default)]
    pub ssl: bool,
    #[serde(rename = "AgentFilter", default)]
    pub agent_filter: Vec<AgentSerial>,
}

/// Timing breakdown of one HTTP fetch. Durations are nanoseconds alongside
/// their humanized forms, matching what operators see in result JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurlResult {
    #[serde(rename = "Status", default)]
    pub status: i32,
    #[serde(rename = "DNSTime", default)]
    pub dns_time: u64,
    #[serde(rename = "DNSTimeStr", default)]
    pub dns_time_str: String,
    #[serde(rename = "ConnectTime", default)]
    pub connect_time: u64,
    #[serde(rename = "ConnectTimeStr", default)]
    pub connect_time_str: String,
    /// Total dial time: DNS plus connect.
    #[serde(rename = "DialTime", default)]
    pub dial_time: u64,
    #[serde(rename = "DialTimeStr", default)]
    pub dial_time_str: String,
    #[serde(rename = "TLSTime", default)]
    pub tls_time: u64,
    #[serde(rename = "TLSTimeStr", default)]
    pub tls_time_str: String,
    #[serde(rename = "Ttfb", default)]
    pub ttfb: u64,
    #[serde(rename = "TtfbStr", default)]
    pub ttfb_str: String,
    #[serde(rename = "Err", default)]
    pub err: String,
    #[serde(rename = "ErrEnglish", default)]
    pub err_english: String,
}
