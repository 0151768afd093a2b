use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::future::join_all;
use pulse_common::probe::{
    CurlRequest, DnsRequest, MtrRequest, ProbeArgs, ProbeEnvelope, ProbeOutcome, ProbeResult,
};
use pulse_common::state::AgentSerial;
use serde::de::DeserializeOwned;

use super::error::ServerError;
use super::models::AgentSummary;
use crate::dispatch::dispatch;
use crate::geo::AsnOverride;
use crate::state::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/dns/", post(run_dns))
        .route("/curl/", post(run_curl))
        .route("/mtr/", post(run_mtr))
        .route("/agents/", get(list_agents))
        .route("/agents/:serial/", get(get_agent))
        .route("/repopulate/", get(repopulate))
        .route("/asndb/", get(asndb_list))
        .route(
            "/asndb/:asn",
            get(asndb_get).put(asndb_put).delete(asndb_delete),
        )
        .route("/asnlookup/asn/:asn", get(asnlookup_by_asn))
        .route("/asnlookup/ip/:ip", get(asnlookup_by_ip))
        .fallback(unmatched)
}

/// Anything the route table does not cover. Malformed asndb/asnlookup URLs
/// (unknown lookup type, missing parameter, too many segments) are operator
/// errors, not missing resources.
async fn unmatched(uri: axum::http::Uri) -> ServerError {
    let path = uri.path();

    if let Some(rest) = path.strip_prefix("/asnlookup") {
        if rest.is_empty() || rest.starts_with('/') {
            let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
            return match segments.as_slice() {
                [] => ServerError::BadRequest("missing lookup type".to_owned()),
                [kind, ..] if *kind != "asn" && *kind != "ip" => {
                    ServerError::BadRequest("unexpected lookup type".to_owned())
                }
                [_] => ServerError::BadRequest("missing lookup parameter".to_owned()),
                _ => ServerError::BadRequest("too many arguments".to_owned()),
            };
        }
    }

    if let Some(rest) = path.strip_prefix("/asndb/") {
        if rest.contains('/') {
            return ServerError::BadRequest("Too many arguments".to_owned());
        }
    }

    ServerError::NotFound
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ServerError> {
    serde_json::from_slice(body).map_err(|e| ServerError::BadRequest(format!("malformed content: {e}")))
}

async fn run_dns(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<ProbeResult>>, ServerError> {
    let mut req: DnsRequest = parse_body(&body)?;
    if !req.host.ends_with('.') {
        req.host.push('.');
    }
    for target in &mut req.targets {
        target.push_str(":53");
    }
    let filter = std::mem::take(&mut req.agent_filter);

    let mut results = dispatch(&state, ProbeEnvelope::new(ProbeArgs::Dns(req), filter)).await;

    // attribute each answering nameserver and render the raw packets
    for result in &mut results {
        let Some(ProbeOutcome::Dns(dns)) = &mut result.body else {
            continue;
        };
        for item in &mut dns.results {
            if let Ok(ip) = item.server.parse() {
                let (asn, as_name) = state.geo.lookup_asn(ip).await;
                item.asn = asn;
                item.as_name = as_name;
            }
            if !item.raw.is_empty() {
                item.formatted = render_dns_packet(&item.raw);
            }
        }
    }
    Ok(Json(results))
}

async fn run_curl(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<ProbeResult>>, ServerError> {
    let mut req: CurlRequest = parse_body(&body)?;
    let filter = std::mem::take(&mut req.agent_filter);
    let results = dispatch(&state, ProbeEnvelope::new(ProbeArgs::Curl(req), filter)).await;
    Ok(Json(results))
}

async fn run_mtr(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<ProbeResult>>, ServerError> {
    let mut req: MtrRequest = parse_body(&body)?;
    let filter = std::mem::take(&mut req.agent_filter);
    let mut results = dispatch(&state, ProbeEnvelope::new(ProbeArgs::Mtr(req), filter)).await;

    // annotate every hop address with its ASN, hops in parallel
    let geo = &state.geo;
    for result in &mut results {
        let Some(ProbeOutcome::Mtr(mtr)) = &mut result.body else {
            continue;
        };
        if !mtr.err.is_empty() {
            continue;
        }
        let Some(output) = &mut mtr.result else {
            continue;
        };
        join_all(output.hops.iter_mut().map(|hop| async move {
            let mut asns = Vec::with_capacity(hop.ip.len());
            for ip in &hop.ip {
                asns.push(match ip.parse() {
                    Ok(ip) => geo.lookup_asn_only(ip).await,
                    Err(_) => String::new(),
                });
            }
            hop.asn = asns;
        }))
        .await;
    }
    Ok(Json(results))
}

async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentSummary>> {
    let mut agents: Vec<AgentSummary> = state
        .registry
        .snapshot(&[])
        .iter()
        .map(|session| AgentSummary::from_session(session))
        .collect();

    // append offline workers from the directory
    let live = state.registry.live_serials();
    for (serial, record) in state.directory.list_missing(&live) {
        agents.push(AgentSummary::from_record(serial, record));
    }
    Json(agents)
}

async fn get_agent(State(state): State<AppState>, Path(serial): Path<String>) -> Response {
    let Ok(serial) = serial.parse::<AgentSerial>() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if let Some(session) = state.registry.lookup(&serial) {
        return Json(AgentSummary::from_session(&session)).into_response();
    }
    match state.directory.get(&serial) {
        Ok(Some(record)) => Json(AgentSummary::from_record(serial, record)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => ServerError::Internal(e.to_string()).into_response(),
    }
}

async fn repopulate(State(state): State<AppState>) -> &'static str {
    state.registry.repopulate(&state.directory);
    "DONE"
}

async fn asndb_list(State(state): State<AppState>) -> Result<Json<Vec<AsnOverride>>, ServerError> {
    Ok(Json(state.geo.overrides()?.list()))
}

async fn asndb_get(
    State(state): State<AppState>,
    Path(asn): Path<String>,
) -> Result<Json<AsnOverride>, ServerError> {
    let name = state
        .geo
        .overrides()?
        .lookup(&asn)?
        .ok_or(ServerError::NotFound)?;
    Ok(Json(AsnOverride { asn, name }))
}

async fn asndb_put(
    State(state): State<AppState>,
    Path(asn): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AsnOverride>, ServerError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !content_type.starts_with("application/json") {
        return Err(ServerError::BadRequest("unexpected content type".to_owned()));
    }

    let override_body: AsnOverride = parse_body(&body)?;
    if override_body.name.is_empty() {
        return Err(ServerError::BadRequest("empty name field".to_owned()));
    }

    state.geo.overrides()?.set(&asn, &override_body.name)?;
    Ok(Json(AsnOverride {
        asn,
        name: override_body.name,
    }))
}

async fn asndb_delete(
    State(state): State<AppState>,
    Path(asn): Path<String>,
) -> Result<(), ServerError> {
    state.geo.overrides()?.remove(&asn)?;
    Ok(())
}

async fn asnlookup_by_asn(State(state): State<AppState>, Path(asn): Path<String>) -> Response {
    if asn.is_empty() {
        return ServerError::BadRequest("missing lookup parameter".to_owned()).into_response();
    }
    Json(state.geo.lookup_all_by_asn(&asn).await).into_response()
}

async fn asnlookup_by_ip(State(state): State<AppState>, Path(ip): Path<String>) -> Response {
    let Ok(ip) = ip.parse() else {
        return ServerError::BadRequest(format!("`{ip}` is not an IP address")).into_response();
    };
    Json(state.geo.lookup_all_by_ip(ip).await).into_response()
}

/// Dig-style rendering of a raw DNS reply packet.
fn render_dns_packet(raw: &[u8]) -> String {
    let Ok(msg) = hickory_proto::op::Message::from_vec(raw) else {
        return String::new();
    };

    let mut out = format!(
        ";; opcode: {:?}, status: {:?}, id: {}\n",
        msg.op_code(),
        msg.response_code(),
        msg.id()
    );
    let mut flags = vec!["qr"];
    if msg.recursion_desired() {
        flags.push("rd");
    }
    if msg.recursion_available() {
        flags.push("ra");
    }
    out.push_str(&format!(
        ";; flags: {}; QUERY: {}, ANSWER: {}, AUTHORITY: {}, ADDITIONAL: {}\n",
        flags.join(" "),
        msg.queries().len(),
        msg.answers().len(),
        msg.name_servers().len(),
        msg.additionals().len(),
    ));

    if !msg.queries().is_empty() {
        out.push_str("\n;; QUESTION SECTION:\n");
        for query in msg.queries() {
            out.push_str(&format!(
                ";{}\t{}\t{}\n",
                query.name(),
                query.query_class(),
                query.query_type()
            ));
        }
    }
    for (title, records) in [
        ("ANSWER", msg.answers()),
        ("AUTHORITY", msg.name_servers()),
        ("ADDITIONAL", msg.additionals()),
    ] {
        if !records.is_empty() {
            out.push_str(&format!("\n;; {title} SECTION:\n"));
            for record in records {
                out.push_str(&format!("{record}\n"));
            }
        }
    }
    out
}

#[cfg(test)]
mod test_api;
