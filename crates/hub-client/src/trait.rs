//! HubClient trait for mocking
//!
//! This trait abstracts the HubClient so the change engine can be tested
//! without a running hub.

use crate::error::HubError;
use crate::models::ChangeRecord;

/// Trait for delivering change records
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait HubClientTrait: Send + Sync {
    /// Destination the records are delivered to (for diagnostics)
    fn destination(&self) -> &str;

    /// Deliver one record, returning the hub's acknowledgement flag.
    ///
    /// Implementations must not retry.
    async fn send(&self, record: ChangeRecord) -> Result<bool, HubError>;
}
