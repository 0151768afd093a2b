use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::OverrideError;
use crate::db::JsonTree;

lazy_static! {
    static ref ASN_ID: Regex = Regex::new(r"^AS\d+$").unwrap();
}

/// One operator-curated `asn -> name` correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnOverride {
    #[serde(default)]
    pub asn: String,
    pub name: String,
}

/// The override collection, taking precedence over upstream ASN
/// descriptions.
#[derive(Clone)]
pub struct OverrideStore {
    tree: JsonTree,
}

impl OverrideStore {
    pub fn new(tree: JsonTree) -> Self {
        Self { tree }
    }

    pub fn list(&self) -> Vec<AsnOverride> {
        self.tree
            .read_all::<String>()
            .map(|(asn, name)| AsnOverride { asn, name })
            .collect()
    }

    pub fn lookup(&self, asn: &str) -> Result<Option<String>, OverrideError> {
        Ok(self.tree.restore(asn)?)
    }

    pub fn set(&self, asn: &str, name: &str) -> Result<(), OverrideError> {
        if !ASN_ID.is_match(asn) {
            return Err(OverrideError::MalformedAsn);
        }
        self.tree.save(asn, &name.to_owned())?;
        Ok(())
    }

    pub fn remove(&self, asn: &str) -> Result<bool, OverrideError> {
        Ok(self.tree.delete(asn)?)
    }
}
