//! The persistent agent directory: serial-keyed records carrying the human
//! and geographic metadata operators curate for each agent.

use std::collections::HashSet;

use chrono::Utc;
use pulse_common::state::{AgentSerial, HostType};
use serde::{Deserialize, Serialize};

use crate::db::error::DatabaseError;
use crate::db::JsonTree;

/// One directory entry, keyed by the decimal serial string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "City", default)]
    pub city: String,
    #[serde(rename = "State", default)]
    pub state: String,
    #[serde(rename = "Country", default)]
    pub country: String,
    #[serde(rename = "LatLng", default)]
    pub lat_lng: String,
    /// Stored comma-joined on the wire.
    #[serde(rename = "LocalResolvers", default, with = "comma_separated")]
    pub local_resolvers: Vec<String>,
    #[serde(rename = "ASN", default)]
    pub asn: String,
    #[serde(rename = "ASName", default)]
    pub as_name: String,
    /// Hosting organization.
    #[serde(rename = "Host", default)]
    pub host: String,
    #[serde(rename = "HostType", default)]
    pub host_type: Option<HostType>,
    /// UTC timestamp of the first successful handshake; empty until then.
    #[serde(rename = "FirstOnline", default)]
    pub first_online: String,
}

/// Partial update; only the populated fields are overwritten.
#[derive(Debug, Clone, Default)]
pub struct AgentRecordPatch {
    pub asn: Option<String>,
    pub as_name: Option<String>,
    pub first_online: Option<String>,
}

impl AgentRecordPatch {
    fn apply(self, record: &mut AgentRecord) {
        if let Some(asn) = self.asn {
            record.asn = asn;
        }
        if let Some(as_name) = self.as_name {
            record.as_name = as_name;
        }
        if let Some(first_online) = self.first_online {
            record.first_online = first_online;
        }
    }
}

#[derive(Clone)]
pub struct AgentDirectory {
    tree: JsonTree,
}

impl AgentDirectory {
    pub fn new(tree: JsonTree) -> Self {
        Self { tree }
    }

    /// Atomic upsert. A brand-new record gets the agent-chosen default name
    /// and its `FirstOnline` stamp; an existing record is returned untouched.
    pub fn get_or_create(
        &self,
        serial: &AgentSerial,
        default_name: &str,
    ) -> Result<(AgentRecord, bool), DatabaseError> {
        let fresh = AgentRecord {
            name: default_name.to_owned(),
            first_online: Utc::now().to_string(),
            ..Default::default()
        };
        match self.tree.create_if_absent(serial.as_str(), &fresh)? {
            None => Ok((fresh, true)),
            Some(existing) => Ok((existing, false)),
        }
    }

    pub fn get(&self, serial: &AgentSerial) -> Result<Option<AgentRecord>, DatabaseError> {
        self.tree.restore(serial.as_str())
    }

    pub fn update(
        &self,
        serial: &AgentSerial,
        patch: AgentRecordPatch,
    ) -> Result<(), DatabaseError> {
        let Some(mut record) = self.tree.restore::<AgentRecord>(serial.as_str())? else {
            return Ok(());
        };
        patch.apply(&mut record);
        self.tree.save(serial.as_str(), &record)
    }

    /// Every record whose serial is not in the given set. Read errors are
    /// logged inside the tree iterator and the offending rows skipped.
    pub fn list_missing(&self, excluded: &HashSet<AgentSerial>) -> Vec<(AgentSerial, AgentRecord)> {
        self.tree
            .read_all::<AgentRecord>()
            .filter_map(|(key, record)| {
                let serial: AgentSerial = key.parse().ok()?;
                (!excluded.contains(&serial)).then_some((serial, record))
            })
            .collect()
    }
}

mod comma_separated {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(list: &[String], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&list.join(","))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<String>, D::Error> {
        let joined = String::deserialize(deserializer)?;
        Ok(joined
            .split(',')
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect())
    }
}
