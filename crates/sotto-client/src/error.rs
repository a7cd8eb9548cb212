//! Error types for the client runtime.

use thiserror::Error;

/// Errors surfaced by the public facade.
///
/// State setters never fail; only the completion-handle operations
/// (`connect`/`disconnect`) can observe these.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Address was not `host:port` (or `[v6]:port`).
    #[error("invalid server address: {0}")]
    InvalidAddress(String),

    /// The connection task has shut down.
    #[error("client runtime has shut down")]
    Closed,
}

/// Transport-layer errors, internal to dial and link handling.
#[derive(Debug, Error)]
pub enum TransportError {
    /// TCP connect or DNS resolution failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// TLS configuration or handshake failed.
    #[error("tls failure: {0}")]
    Tls(String),
}
