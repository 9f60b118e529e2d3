//! Mock HubClient for unit testing
//!
//! Records every delivered change record in memory and can be configured to
//! fail or to answer without acknowledgement.

use std::sync::{Arc, Mutex};

use crate::error::HubError;
use crate::hub_trait::HubClientTrait;
use crate::models::ChangeRecord;

/// Mock HubClient for testing
#[derive(Debug, Clone)]
pub struct MockHubClient {
    destination: String,
    sent: Arc<Mutex<Vec<ChangeRecord>>>,
    acknowledge: bool,
    failure: Option<String>,
}

impl MockHubClient {
    /// Create a mock that acknowledges every record
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            sent: Arc::new(Mutex::new(Vec::new())),
            acknowledge: true,
            failure: None,
        }
    }

    /// Answer every send with `acknowledged = false`
    pub fn unacknowledged(mut self) -> Self {
        self.acknowledge = false;
        self
    }

    /// Fail every send with the given message
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Records received so far, in delivery order
    pub fn sent(&self) -> Vec<ChangeRecord> {
        self.sent.lock().expect("mock mutex poisoned").clone()
    }
}

#[async_trait::async_trait]
impl HubClientTrait for MockHubClient {
    fn destination(&self) -> &str {
        &self.destination
    }

    async fn send(&self, record: ChangeRecord) -> Result<bool, HubError> {
        if let Some(message) = &self.failure {
            return Err(HubError::Mock(message.clone()));
        }
        self.sent.lock().expect("mock mutex poisoned").push(record);
        Ok(self.acknowledge)
    }
}
