//! Inbound agent connections: TLS handshake, identity extraction, initial
//! ping, directory populate, registry insertion.

use std::net::SocketAddr;
use std::sync::Arc;

use pulse_common::rpc::{self, AgentServiceClient};
use pulse_common::state::{AgentIdentity, IdentityError};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;
use tracing::info;

use crate::db::error::DatabaseError;
use crate::state::{AgentSession, AppState};

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("TLS handshake failed: {0}")]
    Handshake(#[from] std::io::Error),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("agent did not answer the initial ping")]
    InitialPing,
    #[error("failed to insert directory record: {0}")]
    Directory(#[from] DatabaseError),
}

pub async fn register_connection(
    state: AppState,
    acceptor: TlsAcceptor,
    stream: TcpStream,
    remote: SocketAddr,
) {
    match try_register(&state, acceptor, stream, remote).await {
        Ok(serial) => info!(
            "agent {serial} registered from {remote}; {} live session(s)",
            state.registry.len()
        ),
        Err(e) => info!("connection from {remote} rejected: {e}"),
    }
}

async fn try_register(
    state: &AppState,
    acceptor: TlsAcceptor,
    stream: TcpStream,
    remote: SocketAddr,
) -> Result<String, RegisterError> {
    let tls = acceptor.accept(stream).await?;

    let identity = {
        let (_, connection) = tls.get_ref();
        let der = connection
            .peer_certificates()
            .and_then(|certs| certs.first())
            .ok_or(IdentityError::MissingCertificate)?;
        AgentIdentity::from_der(der.as_ref())?
    };

    let client =
        AgentServiceClient::new(tarpc::client::Config::default(), rpc::transport(tls)).spawn();

    let (asn, as_name) = state.geo.lookup_asn(remote.ip()).await;
    let session = AgentSession::new(identity, remote, client, asn, as_name);

    // the initial ping gates acceptance; a silent agent never gets indexed
    session
        .ping(state.cli.ping_timeout())
        .await
        .map_err(|_| RegisterError::InitialPing)?;

    // a brand-new serial that cannot be inserted is handshake-fatal
    session.populate(&state.directory)?;

    let serial = session.identity().serial.to_string();
    state.registry.insert(Arc::new(session));
    Ok(serial)
}
