//! Periodic liveness sweep over every indexed session.
//!
//! The monitor holds the registry and sessions are value-only; eviction is
//! "monitor observes failure, monitor removes key". Each ping runs as its own
//! task so a slow agent never delays the sweep, and no registry entry is held
//! across an RPC.

use std::sync::Arc;

use tracing::{info, warn};

use super::{AgentCallError, AgentSession, AppState};

pub async fn liveness_task(state: AppState) {
    loop {
        tokio::time::sleep(state.cli.liveness_interval()).await;
        for session in state.registry.snapshot(&[]) {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                ping_session(&state, session).await;
            });
        }
    }
}

pub(crate) async fn ping_session(state: &AppState, session: Arc<AgentSession>) {
    match session.ping(state.cli.ping_timeout()).await {
        Ok(()) => {}
        Err(AgentCallError::Shutdown) => {
            info!(
                "agent {} shut down, unregistering",
                session.identity().serial
            );
            state.registry.unregister(&session);
        }
        Err(AgentCallError::Timeout) => {
            info!(
                "agent {} did not answer ping, unregistering",
                session.identity().serial
            );
            state.registry.unregister(&session);
        }
        Err(AgentCallError::Rpc(e)) => warn!("pinger: {e}"),
    }
}
