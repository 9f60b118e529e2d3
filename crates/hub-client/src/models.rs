//! Change record model

use std::fmt;

use crate::proto::EventMessage;

/// One qualifying change, assembled by the change engine and delivered once.
#[derive(Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub namespace: String,
    /// Object name.
    pub name: String,
    pub event_type: String,
    /// JSON-encoded field change set.
    pub data: Vec<u8>,
    /// Shared-secret credential.
    pub api_key: String,
}

impl fmt::Debug for ChangeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRecord")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("event_type", &self.event_type)
            .field("data", &String::from_utf8_lossy(&self.data))
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl From<ChangeRecord> for EventMessage {
    fn from(record: ChangeRecord) -> Self {
        EventMessage {
            namespace: record.namespace,
            resource_key: record.name,
            event_type: record.event_type,
            data: record.data,
            api_key: record.api_key,
        }
    }
}
