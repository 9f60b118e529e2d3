//! Watch loop for a single resource kind.
//!
//! Notifications are handled one at a time in arrival order, so every object
//! of the kind sees its cache updates in the order the API server sent them.

use std::sync::Arc;

use change_detector::{ChangeEngine, EventType, Outcome};
use futures::StreamExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::discovery::ResourceKind;
use crate::error::ControllerError;
use crate::source::{ClusterSource, Notification};

/// How a watch stream ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Notifications received, including bookmarks and error events
    pub notifications: u64,
    /// Change records assembled
    pub changes: u64,
    /// Newest resource version seen on the stream
    pub last_resource_version: Option<String>,
    /// The last notification was an error event
    pub ended_with_error: bool,
}

pub struct WatchLoop<S: ?Sized> {
    source: Arc<S>,
    kind: ResourceKind,
    engine: Arc<ChangeEngine>,
}

impl<S: ClusterSource + ?Sized> WatchLoop<S> {
    pub fn new(source: Arc<S>, kind: ResourceKind, engine: Arc<ChangeEngine>) -> Self {
        Self { source, kind, engine }
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// Open a stream at `resource_version` and process it until it closes.
    ///
    /// Only a failure to open the stream is an error.
    pub async fn run(&self, resource_version: &str) -> Result<StreamSummary, ControllerError> {
        let mut stream = self
            .source
            .watch(&self.kind, resource_version)
            .await
            .map_err(|e| ControllerError::Watch(format!("failed to watch {}: {}", self.kind, e)))?;
        info!(
            resource = %self.kind,
            resource_version = %resource_version,
            "Watching resource kind"
        );

        let mut summary = StreamSummary::default();
        while let Some(item) = stream.next().await {
            match item {
                Ok(notification) => {
                    summary.notifications += 1;
                    self.process(notification, &mut summary).await;
                }
                Err(e) => {
                    debug!(resource = %self.kind, error = %e, "Dropping undecodable notification")
                }
            }
        }

        info!(
            resource = %self.kind,
            notifications = summary.notifications,
            changes = summary.changes,
            cached_objects = self.engine.cache().len(),
            "Watch stream closed"
        );
        Ok(summary)
    }

    async fn process(&self, notification: Notification, summary: &mut StreamSummary) {
        let (event_type, object) = match notification {
            Notification::Added(object) => (EventType::Added, object),
            Notification::Modified(object) => (EventType::Modified, object),
            Notification::Deleted(object) => (EventType::Deleted, object),
            Notification::Bookmark { resource_version } => {
                summary.last_resource_version = Some(resource_version);
                summary.ended_with_error = false;
                return;
            }
            Notification::Error(message) => {
                warn!(resource = %self.kind, error = %message, "Watch stream reported an error");
                summary.ended_with_error = true;
                return;
            }
        };

        summary.ended_with_error = false;
        if let Some(version) = object
            .pointer("/metadata/resourceVersion")
            .and_then(Value::as_str)
        {
            summary.last_resource_version = Some(version.to_string());
        }

        match self.engine.handle(&self.kind.resource, event_type, object).await {
            Ok(Outcome::Changed { .. }) => summary.changes += 1,
            Ok(_) => {}
            Err(e) => debug!(
                resource = %self.kind,
                event_type = %event_type,
                error = %e,
                "Skipping notification"
            ),
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for WatchLoop<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchLoop").field("kind", &self.kind).finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "watcher_test.rs"]
mod watcher_test;
