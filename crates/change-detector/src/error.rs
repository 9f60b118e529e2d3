//! Change engine errors
//!
//! All of these are per-event: the notification is dropped and the watch
//! continues.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Object has no `metadata` map
    #[error("object has no metadata")]
    MissingMetadata,

    /// Object has no usable `metadata.name`
    #[error("object metadata has no name")]
    MissingName,

    /// Change set could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
