//! Mutual-TLS configuration for the agent listener. Agents must present a
//! certificate chained to the configured CA; the certificate serial becomes
//! their identity.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::sync::Arc;

use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read `{1}`: {0}")]
    Read(#[source] io::Error, String),
    #[error("no private key found in key file")]
    MissingKey,
    #[error("no certificates found in `{0}`")]
    EmptyPem(String),
    #[error("failed to build client verifier: {0}")]
    Verifier(#[from] rustls::server::VerifierBuilderError),
    #[error(transparent)]
    Rustls(#[from] rustls::Error),
}

fn read_certs(path: &Path) -> Result<Vec<rustls::pki_types::CertificateDer<'static>>, TlsError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|e| TlsError::Read(e, display.clone()))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::Read(e, display.clone()))?;
    if certs.is_empty() {
        return Err(TlsError::EmptyPem(display));
    }
    Ok(certs)
}

pub fn server_config(ca: &Path, crt: &Path, key: &Path) -> Result<ServerConfig, TlsError> {
    let mut roots = RootCertStore::empty();
    for cert in read_certs(ca)? {
        roots.add(cert)?;
    }
    let verifier = WebPkiClientVerifier::builder(Arc::new(roots)).build()?;

    let certs = read_certs(crt)?;
    let key_display = key.display().to_string();
    let key_file = File::open(key).map_err(|e| TlsError::Read(e, key_display.clone()))?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
        .map_err(|e| TlsError::Read(e, key_display))?
        .ok_or(TlsError::MissingKey)?;

    Ok(ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(certs, key)?)
}
