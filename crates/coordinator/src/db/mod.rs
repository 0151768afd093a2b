use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod error;

use error::DatabaseError;

/// The coordinator's persistent store: the agent directory and the ASN
/// override collection.
pub struct Database {
    pub agents: JsonTree,
    pub overrides: JsonTree,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        let db = sled::open(path)?;
        Ok(Self {
            agents: JsonTree::new(db.open_tree("agents")?),
            overrides: JsonTree::new(db.open_tree("geoipdb")?),
        })
    }
}

/// A sled tree with string keys and JSON-encoded values.
#[derive(Debug, Clone)]
pub struct JsonTree {
    tree: sled::Tree,
}

impl JsonTree {
    pub fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }

    pub fn read_all<V: DeserializeOwned>(&self) -> impl Iterator<Item = (String, V)> + '_ {
        self.tree.iter().filter_map(|row| {
            let (key_bytes, value_bytes) = match row {
                Ok((key, value)) => (key, value),
                Err(e) => {
                    tracing::error!("Error reading row from store: {e}");
                    return None;
                }
            };

            let key = match std::str::from_utf8(&key_bytes) {
                Ok(key) => key.to_owned(),
                Err(e) => {
                    tracing::error!("Error parsing key from store: {e}");
                    return None;
                }
            };

            let value = match serde_json::from_slice(&value_bytes) {
                Ok(value) => value,
                Err(e) => {
                    tracing::error!("Error parsing value for `{key}` from store: {e}");
                    return None;
                }
            };

            Some((key, value))
        })
    }

    pub fn restore<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>, DatabaseError> {
        Ok(self
            .tree
            .get(key)?
            .map(|value_bytes| serde_json::from_slice(&value_bytes))
            .transpose()?)
    }

    pub fn save<V: Serialize>(&self, key: &str, value: &V) -> Result<(), DatabaseError> {
        self.tree.insert(key, serde_json::to_vec(value)?)?;
        Ok(())
    }

    /// Insert only if the key is vacant. Returns the already-present value
    /// otherwise.
    pub fn create_if_absent<V: Serialize + DeserializeOwned>(
        &self,
        key: &str,
        value: &V,
    ) -> Result<Option<V>, DatabaseError> {
        let bytes = serde_json::to_vec(value)?;
        match self.tree.compare_and_swap(key, None as Option<&[u8]>, Some(bytes))? {
            Ok(()) => Ok(None),
            Err(cas) => Ok(cas
                .current
                .map(|existing| serde_json::from_slice(&existing))
                .transpose()?),
        }
    }

    pub fn delete(&self, key: &str) -> Result<bool, DatabaseError> {
        Ok(self.tree.remove(key)?.is_some())
    }
}
