use std::net::SocketAddr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use chrono::Utc;
use pulse_common::probe::{ProbeEnvelope, ProbeResult};
use pulse_common::rpc::AgentServiceClient;
use pulse_common::state::{anonymize_ip, AgentIdentity, HostType};
use tarpc::client::RpcError;
use tarpc::context;
use tracing::{info, warn};

use crate::db::error::DatabaseError;
use crate::directory::{AgentDirectory, AgentRecordPatch};

/// Snapshot of the directory fields taken at registration (and refreshed by
/// repopulate). Enrichment always reads this snapshot, never the directory.
#[derive(Debug, Clone, Default)]
pub struct AgentProfile {
    pub name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub lat_lng: String,
    pub resolvers: Vec<String>,
    pub host: String,
    pub host_type: Option<HostType>,
    pub first_online: String,
    /// ASN of the remote address, looked up at handshake.
    pub asn: Option<String>,
    pub as_name: Option<String>,
}

/// How a call to an agent failed. Shutdown and timeout are session-fatal;
/// anything else leaves the session indexed.
#[derive(Debug)]
pub enum AgentCallError {
    Shutdown,
    Timeout,
    Rpc(RpcError),
}

/// One live bidirectional RPC session with a remote agent.
pub struct AgentSession {
    identity: AgentIdentity,
    remote_addr: SocketAddr,
    client: AgentServiceClient,
    connected_at: Instant,
    last_seen: RwLock<Instant>,
    profile: RwLock<AgentProfile>,
}

impl AgentSession {
    pub fn new(
        identity: AgentIdentity,
        remote_addr: SocketAddr,
        client: AgentServiceClient,
        asn: Option<String>,
        as_name: Option<String>,
    ) -> Self {
        Self {
            identity,
            remote_addr,
            client,
            connected_at: Instant::now(),
            last_seen: RwLock::new(Instant::now()),
            profile: RwLock::new(AgentProfile {
                asn,
                as_name,
                ..Default::default()
            }),
        }
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }

    pub fn last_seen(&self) -> Instant {
        *self.last_seen.read().expect("last_seen lock poisoned")
    }

    pub fn profile(&self) -> AgentProfile {
        self.profile.read().expect("profile lock poisoned").clone()
    }

    /// Liveness probe with the given budget.
    pub async fn ping(&self, timeout: Duration) -> Result<(), AgentCallError> {
        let mut ctx = context::current();
        ctx.deadline += timeout;
        let call = self.client.ping(ctx, true);
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(_)) => {
                *self.last_seen.write().expect("last_seen lock poisoned") = Instant::now();
                Ok(())
            }
            Ok(Err(RpcError::Shutdown)) => Err(AgentCallError::Shutdown),
            Ok(Err(RpcError::DeadlineExceeded)) => Err(AgentCallError::Timeout),
            Ok(Err(e)) => Err(AgentCallError::Rpc(e)),
            Err(_) => Err(AgentCallError::Timeout),
        }
    }

    /// Run one probe on the agent with the given budget.
    pub async fn execute(
        &self,
        envelope: ProbeEnvelope,
        timeout: Duration,
    ) -> Result<ProbeResult, AgentCallError> {
        let mut ctx = context::current();
        ctx.deadline += timeout;
        let call = self.client.combined(ctx, envelope);
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(result)) => {
                *self.last_seen.write().expect("last_seen lock poisoned") = Instant::now();
                Ok(result)
            }
            Ok(Err(RpcError::Shutdown)) => Err(AgentCallError::Shutdown),
            Ok(Err(RpcError::DeadlineExceeded)) => Err(AgentCallError::Timeout),
            Ok(Err(e)) => Err(AgentCallError::Rpc(e)),
            Err(_) => Err(AgentCallError::Timeout),
        }
    }

    /// Load the directory record for this serial into the session snapshot,
    /// inserting a default record on a brand-new serial. Insertion failure is
    /// fatal to the caller; the ASN write-back is best effort.
    pub fn populate(&self, directory: &AgentDirectory) -> Result<(), DatabaseError> {
        let serial = &self.identity.serial;
        let (record, created) = directory.get_or_create(serial, &self.identity.common_name)?;
        if created {
            info!("first handshake for agent {serial}");
        }

        let (asn, as_name) = {
            let profile = self.profile.read().expect("profile lock poisoned");
            (profile.asn.clone(), profile.as_name.clone())
        };
        let patch = AgentRecordPatch {
            asn: asn.clone(),
            as_name: as_name.clone(),
            first_online: record
                .first_online
                .is_empty()
                .then(|| Utc::now().to_string()),
        };
        let first_online = patch
            .first_online
            .clone()
            .unwrap_or_else(|| record.first_online.clone());
        if let Err(e) = directory.update(serial, patch) {
            warn!("failed to write back directory record for {serial}: {e}");
        }

        let mut profile = self.profile.write().expect("profile lock poisoned");
        *profile = AgentProfile {
            name: record.name,
            city: record.city,
            state: record.state,
            country: record.country,
            lat_lng: record.lat_lng,
            resolvers: record.local_resolvers,
            host: record.host,
            host_type: record.host_type,
            first_online,
            asn,
            as_name,
        };
        Ok(())
    }

    /// Stamp a probe reply with this session's attribution snapshot.
    pub fn enrich(&self, result: &mut ProbeResult) {
        let profile = self.profile.read().expect("profile lock poisoned");
        result.agent_serial = Some(self.identity.serial.clone());
        result.agent_name = profile.name.clone();
        result.asn = profile.asn.clone();
        result.as_name = profile.as_name.clone();
        result.city = profile.city.clone();
        result.state = profile.state.clone();
        result.country = profile.country.clone();
        result.anonymized_ip = anonymize_ip(self.remote_addr.ip());
    }
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("serial", &self.identity.serial)
            .field("remote_addr", &self.remote_addr)
            .finish_non_exhaustive()
    }
}
