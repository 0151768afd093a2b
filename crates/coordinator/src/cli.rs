use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Debug, Parser)]
pub struct Cli {
    /// Path to the CA certificate agent certificates must chain to
    #[clap(long = "ca", env = "PULSE_CA", default_value = "ca.crt")]
    pub ca: PathBuf,

    /// Path to the server certificate
    #[clap(long = "crt", env = "PULSE_CRT", default_value = "server.crt")]
    pub crt: PathBuf,

    /// Path to the server private key
    #[clap(long = "key", env = "PULSE_KEY", default_value = "server.key")]
    pub key: PathBuf,

    /// Bind address for both listeners
    #[clap(long = "bind", env = "PULSE_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind_addr: IpAddr,

    /// Port of the agent RPC listener
    #[clap(long, env = "PULSE_RPC_PORT", default_value_t = 7777)]
    pub rpc_port: u16,

    /// Port of the operator HTTP API
    #[clap(long, env = "PULSE_HTTP_PORT", default_value_t = 7778)]
    pub http_port: u16,

    /// Path to the directory containing the persistent store
    #[clap(long, env = "PULSE_DATA_DIR", default_value = "./pulse-data")]
    pub path: PathBuf,

    /// Production origin allowed to call the HTTP API, in addition to the
    /// local development origin
    #[clap(long, env = "PULSE_CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Path to a GeoLite2-ASN style database for offline ASN lookups
    #[clap(long, env = "PULSE_ASN_DB")]
    pub maxmind_db: Option<PathBuf>,

    /// Access token for ipinfo.io lookups
    #[clap(long, env = "PULSE_IPINFO_TOKEN")]
    pub ipinfo_token: Option<String>,

    /// Run without the ASN override collection; asndb endpoints answer 406
    #[clap(long, default_value_t = false)]
    pub disable_asndb: bool,

    /// Seconds between liveness sweeps
    #[clap(long, default_value_t = 20)]
    pub liveness_interval_secs: u64,

    /// Budget in seconds for handshake and liveness pings
    #[clap(long, default_value_t = 10)]
    pub ping_timeout_secs: u64,

    /// Budget in seconds for each per-agent probe call
    #[clap(long, default_value_t = 60)]
    pub probe_timeout_secs: u64,

    /// Budget in seconds for each external GeoResolver source
    #[clap(long, default_value_t = 5)]
    pub geo_timeout_secs: u64,
}

impl Cli {
    pub fn rpc_listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.rpc_port)
    }

    pub fn http_listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.ping_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn geo_timeout(&self) -> Duration {
        Duration::from_secs(self.geo_timeout_secs)
    }
}
