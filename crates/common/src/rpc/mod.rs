//! The RPC surface agents expose to the coordinator.
//!
//! Agents dial the coordinator over mutual TLS, then act as the tarpc
//! *server* on that connection; the coordinator drives every call. The
//! transport is length-prefixed frames carrying JSON-encoded messages.
//! (bincode and msgpack have various limitations and are troublesome to
//! debug; the overhead of JSON is not a concern for the RPC layer.)

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::probe::{ProbeEnvelope, ProbeResult};

/// The value codec used inside each length-delimited frame.
pub type WireCodec<In, Out> = tokio_serde::formats::Json<In, Out>;

/// The RPC service every agent implements as a server.
#[tarpc::service]
pub trait AgentService {
    /// Liveness probe; echoes readiness. The coordinator sends one at
    /// handshake and then periodically.
    async fn ping(probe: bool) -> bool;

    /// Execute one probe and return the (unenriched) result.
    async fn combined(envelope: ProbeEnvelope) -> ProbeResult;
}

/// Wrap a connected byte stream into a tarpc transport: length-delimited
/// framing, JSON payloads.
pub fn transport<S, In, Out>(
    io: S,
) -> tarpc::serde_transport::Transport<S, In, Out, WireCodec<In, Out>>
where
    S: AsyncRead + AsyncWrite,
    In: for<'de> serde::Deserialize<'de>,
    Out: serde::Serialize,
{
    tarpc::serde_transport::new(
        Framed::new(io, LengthDelimitedCodec::new()),
        WireCodec::default(),
    )
}
