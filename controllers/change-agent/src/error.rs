//! Controller-specific error types.
//!
//! Everything here is fatal for the process; per-event failures are logged
//! where they happen and never surface as a `ControllerError`.

use hub_client::HubError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the change agent.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Hub client could not be set up
    #[error("Hub client error: {0}")]
    Hub(#[from] HubError),

    /// Resource kind discovery failed
    #[error("Resource discovery failed: {0}")]
    Discovery(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Watched object could not be converted to JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
