use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{ACCEPT, CONTENT_TYPE, ORIGIN};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::Router;
use tokio_rustls::TlsAcceptor;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

mod agents;
mod api;
pub mod error;
mod models;
mod tls;

use error::StartError;

use crate::state::AppState;

/// The local development origin, always allowed alongside the configured
/// production origin.
const DEV_ORIGIN: &str = "http://127.0.0.1:8000";

/// Accept loop for inbound agents: mutual TLS on the RPC port, one
/// registration task per connection.
pub async fn start_rpc(state: AppState) -> Result<(), StartError> {
    let config = tls::server_config(&state.cli.ca, &state.cli.crt, &state.cli.key)?;
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = tokio::net::TcpListener::bind(state.cli.rpc_listen_addr())
        .await
        .map_err(StartError::TcpBind)?;
    info!("listening for agents on {}", state.cli.rpc_listen_addr());

    loop {
        let (stream, remote) = listener.accept().await.map_err(StartError::Serve)?;
        info!("{remote} at your service");
        tokio::spawn(agents::register_connection(
            Arc::clone(&state),
            acceptor.clone(),
            stream,
            remote,
        ));
    }
}

/// The operator HTTP API: gzip when the client asks for it, CORS for exactly
/// the configured origins.
pub async fn start_http(state: AppState) -> Result<(), StartError> {
    let addr = state.cli.http_listen_addr();
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(StartError::TcpBind)?;
    info!("operator API on {addr}");

    axum::serve(listener, app).await.map_err(StartError::Serve)?;
    Ok(())
}

pub fn router(state: AppState) -> Router {
    let mut origins = vec![HeaderValue::from_static(DEV_ORIGIN)];
    match state.cli.cors_origin.as_deref().map(HeaderValue::from_str) {
        Some(Ok(origin)) => origins.push(origin),
        Some(Err(e)) => warn!("ignoring unusable cors origin: {e}"),
        None => {}
    }

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            ORIGIN,
            CONTENT_TYPE,
            ACCEPT,
            HeaderName::from_static("x-requested-with"),
        ])
        .max_age(Duration::from_secs(3600));

    api::routes()
        .layer(
            CompressionLayer::new()
                .no_br()
                .no_deflate()
                .no_zstd(),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
