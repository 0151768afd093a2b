//! In-memory agents for exercising the registry, liveness sweep, and
//! dispatcher without sockets or certificates.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use futures_util::StreamExt;
use pulse_common::probe::{
    CurlResult, DnsResult, IndividualDnsResult, MtrResult, ProbeArgs, ProbeEnvelope, ProbeOutcome,
    ProbeResult,
};
use pulse_common::rpc::{AgentService, AgentServiceClient};
use pulse_common::state::{AgentIdentity, AgentSerial};
use tarpc::server::{BaseChannel, Channel};
use tokio::task::JoinHandle;

use super::{AgentRegistry, AgentSession, AppState, GlobalState};
use crate::cli::Cli;
use crate::db::Database;
use crate::directory::AgentDirectory;
use crate::geo::{GeoConfig, GeoResolver};

/// How a mock agent answers the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Answers pings and echoes probes back immediately.
    Responsive,
    /// Accepts the connection but never answers anything.
    Wedged,
}

#[derive(Clone)]
struct MockAgent {
    behavior: MockBehavior,
}

impl AgentService for MockAgent {
    async fn ping(self, _: tarpc::context::Context, probe: bool) -> bool {
        match self.behavior {
            MockBehavior::Responsive => probe,
            MockBehavior::Wedged => std::future::pending().await,
        }
    }

    async fn combined(
        self,
        _: tarpc::context::Context,
        envelope: ProbeEnvelope,
    ) -> ProbeResult {
        match self.behavior {
            MockBehavior::Wedged => std::future::pending().await,
            MockBehavior::Responsive => match envelope.args {
                // echo the targets back so tests can observe defaulting
                ProbeArgs::Dns(req) => ProbeResult::from_body(ProbeOutcome::Dns(DnsResult {
                    results: req
                        .targets
                        .into_iter()
                        .map(|target| IndividualDnsResult {
                            server: target,
                            ..Default::default()
                        })
                        .collect(),
                    err: String::new(),
                })),
                ProbeArgs::Curl(_) => ProbeResult::from_body(ProbeOutcome::Curl(CurlResult {
                    status: 200,
                    ..Default::default()
                })),
                ProbeArgs::Mtr(_) => {
                    ProbeResult::from_body(ProbeOutcome::Mtr(MtrResult::default()))
                }
            },
        }
    }
}

/// Serve a mock agent over an in-memory transport. Aborting the returned
/// handle severs the connection the way a vanished agent would.
pub fn spawn_mock_agent(behavior: MockBehavior) -> (AgentServiceClient, JoinHandle<()>) {
    let (client_transport, server_transport) = tarpc::transport::channel::unbounded();
    let server = tokio::spawn(
        BaseChannel::with_defaults(server_transport)
            .execute(MockAgent { behavior }.serve())
            .for_each(|response| async move {
                tokio::spawn(response);
            }),
    );
    let client = AgentServiceClient::new(tarpc::client::Config::default(), client_transport).spawn();
    (client, server)
}

pub fn mock_session(
    serial: &str,
    addr: &str,
    behavior: MockBehavior,
) -> (Arc<AgentSession>, JoinHandle<()>) {
    let (client, server) = spawn_mock_agent(behavior);
    let identity = AgentIdentity {
        serial: AgentSerial::from_str(serial).unwrap(),
        common_name: format!("probe-{serial}"),
    };
    let session = AgentSession::new(
        identity,
        SocketAddr::from_str(addr).unwrap(),
        client,
        Some("AS64512".to_owned()),
        Some("Test Net".to_owned()),
    );
    (Arc::new(session), server)
}

/// A coordinator state with short budgets, an empty registry, and a
/// temporary store.
pub fn test_state(probe_timeout_secs: u64) -> (AppState, tempfile::TempDir) {
    build_state(probe_timeout_secs, false)
}

/// Same, with the ASN override collection enabled.
pub fn test_state_with_overrides() -> (AppState, tempfile::TempDir) {
    build_state(5, true)
}

fn build_state(probe_timeout_secs: u64, overrides: bool) -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("store")).unwrap();

    use clap::Parser;
    let mut cli = Cli::parse_from(["pulse-coordinator"]);
    cli.probe_timeout_secs = probe_timeout_secs;
    cli.ping_timeout_secs = 1;

    let geo = GeoResolver::new(
        overrides.then(|| crate::geo::OverrideStore::new(db.overrides)),
        GeoConfig {
            source_timeout: std::time::Duration::from_millis(500),
            ..Default::default()
        },
    )
    .unwrap();

    let state = Arc::new(GlobalState {
        cli,
        directory: AgentDirectory::new(db.agents),
        geo,
        registry: AgentRegistry::new(),
    });
    (state, dir)
}
