use thiserror::Error;

use crate::db::error::DatabaseError;

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("failed to open ASN database: {0}")]
    MaxmindOpen(#[source] maxminddb::MaxMindDBError),
    #[error("ASN database lookup failed: {0}")]
    Maxmind(#[from] maxminddb::MaxMindDBError),
    #[error("ASN database not loaded")]
    MaxmindDisabled,
    #[error("DNS lookup failed: {0}")]
    Resolve(#[from] hickory_resolver::error::ResolveError),
    #[error("ip-info request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no record for address")]
    NoRecord,
    #[error("source query timed out")]
    Timeout,
    #[error("no source could resolve the address")]
    NoAnswer,
    #[error("lookup by ASN not supported by this source")]
    AsnLookupUnsupported,
}

#[derive(Debug, Error)]
pub enum OverrideError {
    #[error("asndb features are disabled")]
    Disabled,
    #[error("ASN not found")]
    NotFound,
    #[error("malformed ASN id")]
    MalformedAsn,
    #[error(transparent)]
    Database(#[from] DatabaseError),
}
