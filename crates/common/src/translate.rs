//! Optional translation of machine error strings into operator-readable
//! sentences. Unknown errors translate to the empty string; that is not
//! itself an error.

use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;

use crate::probe::{CurlResult, ProbeKind};

lazy_static! {
    static ref RE_NXDOMAIN: Regex =
        Regex::new(r"lookup ([^\s:]+)(?: on [^\s:]+(?::\d+)?)?: no such host").unwrap();
    static ref RE_DNS_TIMEOUT: Regex = Regex::new(r"dial udp ([^\s]+): i/o timeout").unwrap();
    static ref RE_CONNECT_TIMEOUT: Regex =
        Regex::new(r"dial tcp ([^\s]+): i/o timeout").unwrap();
    static ref RE_REFUSED: Regex =
        Regex::new(r"\[?([0-9a-fA-F:.]+?)\]?:(\d+): connection refused").unwrap();
    static ref RE_MISBEHAVING: Regex = Regex::new(r"on ([^\s]+): server misbehaving").unwrap();
}

/// Timing fields a translation may cite. The humanized strings feed the
/// breakdown clause; the durations feed the rounded-seconds phrasing.
#[derive(Debug, Clone, Default)]
pub struct ProbeTiming {
    pub dns: Duration,
    pub dial: Duration,
    pub dns_str: String,
    pub connect_str: String,
    pub tls_str: String,
}

impl From<&CurlResult> for ProbeTiming {
    fn from(res: &CurlResult) -> Self {
        Self {
            dns: Duration::from_nanos(res.dns_time),
            dial: Duration::from_nanos(res.dial_time),
            dns_str: res.dns_time_str.clone(),
            connect_str: res.connect_time_str.clone(),
            tls_str: res.tls_time_str.clone(),
        }
    }
}

impl ProbeTiming {
    /// "(DNS lookup .., TCP connect ..[, TLS handshake ..])"
    fn breakdown(&self) -> String {
        let dns = if self.dns_str.is_empty() {
            "0s"
        } else {
            &self.dns_str
        };
        let connect = if self.connect_str.is_empty() {
            "0s"
        } else {
            &self.connect_str
        };
        let mut text = format!("(DNS lookup {dns}, TCP connect {connect}");
        if !self.tls_str.is_empty() && self.tls_str != "0s" {
            text.push_str(&format!(", TLS handshake {}", self.tls_str));
        }
        text.push(')');
        text
    }
}

/// Translate a machine error into a human sentence, or return an empty
/// string when no translation is known.
pub fn translate_error(kind: ProbeKind, timing: &ProbeTiming, err: &str) -> String {
    if err.is_empty() {
        return String::new();
    }

    if let Some(captures) = RE_NXDOMAIN.captures(err) {
        return format!(
            "DNS lookup failed. {} could not be resolved (NXDOMAIN).",
            &captures[1]
        );
    }

    if err.contains("context deadline exceeded") {
        return "Test was cancelled because agent was unresponsible for 50 seconds during test \
                execution. This may indicate agent is malfunctioning; please inform maintainers."
            .to_owned();
    }

    if err.contains("Not allowed to connect to local IP") {
        return "Test was blocked. The target resolves to a private or local IP address, which \
                agents refuse to probe."
            .to_owned();
    }

    match kind {
        ProbeKind::Curl => translate_curl_error(timing, err),
        ProbeKind::Dns | ProbeKind::Mtr => String::new(),
    }
}

fn translate_curl_error(timing: &ProbeTiming, err: &str) -> String {
    // the nameserver went silent; distinct from the TCP connect timeout below
    if let Some(captures) = RE_DNS_TIMEOUT.captures(err) {
        return format!(
            "DNS lookup timed out. No response from {} within {} seconds.",
            &captures[1],
            timing.dns.as_secs()
        );
    }

    if let Some(captures) = RE_MISBEHAVING.captures(err) {
        return format!(
            "DNS lookup failed. Agent/client can\u{2019}t reach {}.",
            &captures[1]
        );
    }

    if let Some(captures) = RE_CONNECT_TIMEOUT.captures(err) {
        return format!(
            "Connection timed out. Agent/client could not connect to {} within {} seconds. {}",
            &captures[1],
            timing.dial.as_secs(),
            timing.breakdown()
        );
    }

    if err.contains("timeout awaiting response headers") {
        return format!(
            "Request timed out. TCP connection was established but server did not respond to the \
             request within 25 seconds. {}",
            timing.breakdown()
        );
    }

    if let Some(captures) = RE_REFUSED.captures(err) {
        return format!(
            "Connection refused. {} did not accept the connection on port {}.",
            &captures[1], &captures[2]
        );
    }

    String::new()
}
