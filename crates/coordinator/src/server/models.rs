use pulse_common::probe::humanize_duration;
use pulse_common::state::{anonymize_ip, AgentSerial, HostType};
use serde::Serialize;

use crate::directory::AgentRecord;
use crate::state::AgentSession;

/// One row of the agents listing: a live session or an offline directory
/// record.
#[derive(Debug, Serialize)]
pub struct AgentSummary {
    #[serde(rename = "Serial")]
    pub serial: AgentSerial,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Connected")]
    pub connected: bool,
    #[serde(rename = "ConnectedFor")]
    pub connected_for: String,
    #[serde(rename = "FirstOnline")]
    pub first_online: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "LatLng")]
    pub lat_lng: String,
    #[serde(rename = "Resolvers")]
    pub resolvers: Vec<String>,
    #[serde(rename = "ASN")]
    pub asn: Option<String>,
    #[serde(rename = "ASName")]
    pub as_name: Option<String>,
    #[serde(rename = "Host")]
    pub host: String,
    #[serde(rename = "HostType")]
    pub host_type: Option<HostType>,
    /// Anonymized remote address; empty for offline agents.
    #[serde(rename = "Agent")]
    pub agent: String,
}

impl AgentSummary {
    pub fn from_session(session: &AgentSession) -> Self {
        let profile = session.profile();
        Self {
            serial: session.identity().serial.clone(),
            name: profile.name,
            connected: true,
            connected_for: humanize_duration(session.connected_for()),
            first_online: profile.first_online,
            city: profile.city,
            state: profile.state,
            country: profile.country,
            lat_lng: profile.lat_lng,
            resolvers: profile.resolvers,
            asn: profile.asn,
            as_name: profile.as_name,
            host: profile.host,
            host_type: profile.host_type,
            agent: anonymize_ip(session.remote_addr().ip()),
        }
    }

    pub fn from_record(serial: AgentSerial, record: AgentRecord) -> Self {
        Self {
            serial,
            name: record.name,
            connected: false,
            connected_for: String::new(),
            first_online: record.first_online,
            city: record.city,
            state: record.state,
            country: record.country,
            lat_lng: record.lat_lng,
            resolvers: record.local_resolvers,
            asn: (!record.asn.is_empty()).then_some(record.asn),
            as_name: (!record.as_name.is_empty()).then_some(record.as_name),
            host: record.host,
            host_type: record.host_type,
            agent: String::new(),
        }
    }
}
