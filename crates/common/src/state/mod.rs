use std::fmt::{self, Display};
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use x509_parser::prelude::*;

mod host_type;
pub use host_type::HostType;

#[cfg(test)]
mod test_identity;

/// The stable identity of an agent: the decimal rendering of its client
/// certificate serial. Certificate serials exceed 64 bits, so the canonical
/// form is the string and it is never narrowed to a machine integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentSerial(String);

#[derive(Debug, Error)]
#[error("invalid agent serial `{0}`")]
pub struct InvalidSerial(String);

impl AgentSerial {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AgentSerial {
    type Err = InvalidSerial;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidSerial(s.to_owned()));
        }
        // canonicalize: strip leading zeros but keep a lone zero
        let trimmed = s.trim_start_matches('0');
        Ok(Self(if trimmed.is_empty() {
            "0".to_owned()
        } else {
            trimmed.to_owned()
        }))
    }
}

impl Display for AgentSerial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity minted from the peer certificate at TLS handshake. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    pub serial: AgentSerial,
    /// The agent-chosen display name, used on first registration only.
    pub common_name: String,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("connection presented no peer certificate")]
    MissingCertificate,
    #[error("malformed peer certificate")]
    MalformedCertificate,
}

impl AgentIdentity {
    /// Extract the serial and subject common name from a DER-encoded peer
    /// certificate. The serial is rendered to its canonical decimal string.
    pub fn from_der(der: &[u8]) -> Result<Self, IdentityError> {
        let (_, cert) =
            X509Certificate::from_der(der).map_err(|_| IdentityError::MalformedCertificate)?;
        let serial = AgentSerial(cert.serial.to_str_radix(10));
        let common_name = cert
            .subject()
            .iter_common_name()
            .next()
            .and_then(|cn| cn.as_str().ok())
            .unwrap_or_default()
            .to_owned();
        Ok(Self {
            serial,
            common_name,
        })
    }
}

/// First three octets of an IPv4 remote, kept for anonymized reporting.
pub fn ipv4_prefix(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let o = v4.octets();
            format!("{}.{}.{}", o[0], o[1], o[2])
        }
        IpAddr::V6(v6) => {
            let s = v6.segments();
            format!("{:x}:{:x}:{:x}", s[0], s[1], s[2])
        }
    }
}

/// Anonymize a remote address for operator-facing results: the last octet is
/// zeroed (IPv4), or the tail hextets dropped (IPv6).
pub fn anonymize_ip(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(_) => format!("{}.0", ipv4_prefix(ip)),
        IpAddr::V6(_) => format!("{}::", ipv4_prefix(ip)),
    }
}
