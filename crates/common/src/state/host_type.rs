use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Where an agent physically lives. Stored in the directory as
/// single-letter codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostType {
    #[serde(rename = "H")]
    Home,
    #[serde(rename = "O")]
    Office,
    #[serde(rename = "D")]
    Datacenter,
}

impl Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Home => "Home",
            Self::Office => "Office",
            Self::Datacenter => "Datacenter",
        })
    }
}
