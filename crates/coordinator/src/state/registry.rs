use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;
use pulse_common::state::AgentSerial;
use tracing::warn;

use super::AgentSession;
use crate::directory::AgentDirectory;

/// Thread-safe index of live sessions, keyed by remote address.
///
/// Callers must never hold an entry across an RPC call; `snapshot` copies the
/// filtered session set out before the caller awaits anything.
#[derive(Default)]
pub struct AgentRegistry {
    sessions: DashMap<SocketAddr, Arc<AgentSession>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, session: Arc<AgentSession>) {
        self.sessions.insert(session.remote_addr(), session);
    }

    /// Remove a session by identity. Scans values, so a session that was
    /// already removed (or re-keyed by a reconnect) is tolerated.
    pub fn unregister(&self, session: &Arc<AgentSession>) {
        self.sessions.retain(|_, s| !Arc::ptr_eq(s, session));
    }

    /// Copy out the sessions matching the filter; an empty filter selects
    /// every live session.
    pub fn snapshot(&self, filter: &[AgentSerial]) -> Vec<Arc<AgentSession>> {
        self.sessions
            .iter()
            .filter(|entry| {
                filter.is_empty() || filter.contains(&entry.value().identity().serial)
            })
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn lookup(&self, serial: &AgentSerial) -> Option<Arc<AgentSession>> {
        self.sessions
            .iter()
            .find(|entry| &entry.value().identity().serial == serial)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Serials of every live session.
    pub fn live_serials(&self) -> HashSet<AgentSerial> {
        self.sessions
            .iter()
            .map(|entry| entry.value().identity().serial.clone())
            .collect()
    }

    /// Refresh every live session from the directory, without disconnecting.
    pub fn repopulate(&self, directory: &AgentDirectory) {
        for session in self.snapshot(&[]) {
            if let Err(e) = session.populate(directory) {
                warn!(
                    "failed to repopulate agent {}: {e}",
                    session.identity().serial
                );
            }
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
