use std::io;
use std::sync::Arc;

use clap::Parser;
use cli::Cli;
use state::{AgentRegistry, GlobalState};
use tokio::select;
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::db::Database;
use crate::directory::AgentDirectory;
use crate::geo::{GeoConfig, GeoResolver, OverrideStore};

pub mod cli;
pub mod db;
pub mod directory;
pub mod dispatch;
pub mod geo;
pub mod server;
pub mod state;

fn make_env_filter(level: LevelFilter) -> EnvFilter {
    EnvFilter::builder()
        .with_env_var("PULSE_LOG")
        .with_default_directive(level.into())
        .from_env_lossy()
        .add_directive("hyper_util=off".parse().unwrap())
        .add_directive("hyper=off".parse().unwrap())
        .add_directive("reqwest=off".parse().unwrap())
        .add_directive("hickory_proto=off".parse().unwrap())
        .add_directive("hickory_resolver=off".parse().unwrap())
        .add_directive("tarpc::client=ERROR".parse().unwrap())
        .add_directive("tarpc::server=ERROR".parse().unwrap())
        .add_directive("tower_http::trace::on_request=off".parse().unwrap())
        .add_directive("tower_http::trace::on_response=off".parse().unwrap())
}

#[tokio::main]
async fn main() {
    let filter_level = if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    let (stdout, _guard) = tracing_appender::non_blocking(io::stdout());
    let output = tracing_subscriber::fmt::layer().with_writer(stdout);
    let output = if cfg!(debug_assertions) {
        output.with_file(true).with_line_number(true)
    } else {
        output
    };

    tracing_subscriber::registry()
        .with(make_env_filter(filter_level))
        .with(output)
        .try_init()
        .unwrap();

    let _ = rustls::crypto::ring::default_provider().install_default();

    let cli = Cli::parse();

    trace!("Opening store");
    let db = Database::open(&cli.path.join("store")).expect("open database");
    let directory = AgentDirectory::new(db.agents);
    let overrides = (!cli.disable_asndb).then(|| OverrideStore::new(db.overrides));

    trace!("Initializing geo resolver");
    let geo = GeoResolver::new(
        overrides,
        GeoConfig {
            maxmind_db: cli.maxmind_db.clone(),
            source_timeout: cli.geo_timeout(),
            ipinfo_token: cli.ipinfo_token.clone(),
        },
    )
    .expect("initialize geo resolver");

    let state = Arc::new(GlobalState {
        cli,
        directory,
        geo,
        registry: AgentRegistry::new(),
    });

    // keep every indexed session alive or evicted
    let liveness = tokio::spawn(state::liveness::liveness_task(Arc::clone(&state)));

    info!("monitoring");
    select! {
        Err(err) = server::start_rpc(Arc::clone(&state)) => {
            error!("error running agent listener: {err:?}");
        }
        Err(err) = server::start_http(Arc::clone(&state)) => {
            error!("error running operator API: {err:?}");
        }
        Err(err) = liveness => {
            error!("liveness task failed: {err:?}");
        }
    }
    std::process::exit(1);
}
