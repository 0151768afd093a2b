//! The fan-out dispatcher: one operator request, one task per selected
//! agent, replies collected in arrival order.

use std::sync::Arc;

use pulse_common::probe::{ProbeArgs, ProbeEnvelope, ProbeKind, ProbeOutcome, ProbeResult};
use pulse_common::translate::{translate_error, ProbeTiming};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::state::{AgentCallError, AgentSession, AppState};

/// Fan a request out to every selected session and collect whatever returns
/// within the per-agent budget. Results come back in reply-arrival order; a
/// failed agent contributes nothing.
pub async fn dispatch(state: &AppState, envelope: ProbeEnvelope) -> Vec<ProbeResult> {
    let selected = state.registry.snapshot(&envelope.agent_filter);
    info!(
        "dispatching {:?} probe to {} agent(s)",
        envelope.kind(),
        selected.len()
    );

    let (tx, mut rx) = mpsc::channel::<Option<ProbeResult>>(selected.len().max(1));
    for session in selected {
        let state = Arc::clone(state);
        let tx = tx.clone();
        // clone the request so per-agent defaulting never aliases
        let envelope = envelope.clone();
        tokio::spawn(async move {
            let slot = run_probe(&state, &session, envelope).await;
            let _ = tx.send(slot).await;
        });
    }
    drop(tx);

    // every task writes exactly once; the channel drains to `None` once the
    // last slot has arrived
    let mut results = Vec::new();
    while let Some(slot) = rx.recv().await {
        if let Some(result) = slot {
            results.push(result);
        }
    }
    results
}

async fn run_probe(
    state: &AppState,
    session: &Arc<AgentSession>,
    mut envelope: ProbeEnvelope,
) -> Option<ProbeResult> {
    if let ProbeArgs::Dns(req) = &mut envelope.args {
        if req.targets.is_empty() {
            req.apply_default_targets(&session.profile().resolvers);
        }
    }

    let serial = &session.identity().serial;
    match session.execute(envelope, state.cli.probe_timeout()).await {
        Ok(mut result) => {
            session.enrich(&mut result);
            backfill_translations(&mut result);
            Some(result)
        }
        Err(AgentCallError::Shutdown) => {
            info!("agent {serial} shut down mid-dispatch, unregistering");
            state.registry.unregister(session);
            None
        }
        Err(AgentCallError::Timeout) => {
            info!("agent {serial} exceeded the probe budget, unregistering");
            state.registry.unregister(session);
            None
        }
        Err(AgentCallError::Rpc(e)) => {
            warn!("probe call to agent {serial} failed: {e}");
            None
        }
    }
}

/// Fill `ErrEnglish` wherever the agent left it empty and a translation is
/// known.
fn backfill_translations(result: &mut ProbeResult) {
    match &mut result.body {
        Some(ProbeOutcome::Curl(res)) => {
            if res.err_english.is_empty() {
                let timing = ProbeTiming::from(&*res);
                res.err_english = translate_error(ProbeKind::Curl, &timing, &res.err);
            }
        }
        Some(ProbeOutcome::Mtr(res)) => {
            if res.err_english.is_empty() {
                res.err_english =
                    translate_error(ProbeKind::Mtr, &ProbeTiming::default(), &res.err);
            }
        }
        Some(ProbeOutcome::Dns(res)) => {
            for item in &mut res.results {
                if item.err_english.is_empty() {
                    item.err_english =
                        translate_error(ProbeKind::Dns, &ProbeTiming::default(), &item.err);
                }
            }
        }
        None => {}
    }
}

#[cfg(test)]
mod test_dispatch;
