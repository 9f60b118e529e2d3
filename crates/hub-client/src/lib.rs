//! Incident Hub Client
//!
//! Delivers change records to the external incident-management hub over gRPC.
//!
//! # Example
//!
//! ```no_run
//! use hub_client::{ChangeRecord, HubClient, HubClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Channels connect lazily; nothing is dialed until the first send.
//! let client = HubClient::connect("hub.incidents:50051", false)?;
//!
//! let record = ChangeRecord {
//!     namespace: "default".to_string(),
//!     name: "web".to_string(),
//!     event_type: "Modified".to_string(),
//!     data: br#"{"/spec/replicas":{"new":3,"old":1}}"#.to_vec(),
//!     api_key: "secret".to_string(),
//! };
//! let acknowledged = client.send(record).await?;
//! # Ok(())
//! # }
//! ```
//!
//! Delivery is at-most-once: a send is bounded by [`SEND_DEADLINE`] and a
//! failed send is never retried.

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod hub_trait;
#[cfg(feature = "test-util")]
pub mod mock;

/// Generated protobuf types and the `EventService` stubs.
pub mod proto {
    tonic::include_proto!("event");
}

pub use client::{HubClient, SEND_DEADLINE};
pub use error::HubError;
pub use hub_trait::HubClientTrait;
pub use models::ChangeRecord;
#[cfg(feature = "test-util")]
pub use mock::MockHubClient;
