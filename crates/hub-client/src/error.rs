//! Hub client errors

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when delivering a change record to the hub
#[derive(Debug, Error)]
pub enum HubError {
    /// The configured destination could not be turned into an endpoint URI
    #[error("Invalid hub endpoint: {0}")]
    InvalidEndpoint(String),

    /// Channel setup failed (TLS configuration, URI scheme, etc.)
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// The RPC itself failed (unreachable hub, server error, etc.)
    #[error("RPC failed: {0}")]
    Rpc(#[from] tonic::Status),

    /// The hub did not answer within the send deadline
    #[error("Hub did not respond within {0:?}")]
    DeadlineExceeded(Duration),

    /// Injected failure from the mock client
    #[cfg(feature = "test-util")]
    #[error("Mock failure: {0}")]
    Mock(String),
}
