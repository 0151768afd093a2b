use std::sync::Arc;

use crate::cli::Cli;
use crate::directory::AgentDirectory;
use crate::geo::GeoResolver;

use super::AgentRegistry;

/// The global state for the coordinator.
pub struct GlobalState {
    pub cli: Cli,
    pub directory: AgentDirectory,
    pub geo: GeoResolver,
    pub registry: AgentRegistry,
}

pub type AppState = Arc<GlobalState>;
