//! Per-notification change handling.
//!
//! - `Added` records a baseline snapshot and never emits a record.
//! - `Modified` diffs against the cached snapshot, always stores the incoming
//!   object, and emits a record when the change set is non-empty. An object
//!   with no cached snapshot is ignored; the cache is the only source of
//!   previous state.
//! - `Deleted` drops the cached snapshot and never emits a record.

use std::fmt;
use std::sync::Arc;

use hub_client::{ChangeRecord, HubClientTrait};
use serde_json::Value;
use tracing::{Level, debug};

use crate::cache::ObjectCache;
use crate::change_set;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Added,
    Modified,
    Deleted,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Added => "Added",
            EventType::Modified => "Modified",
            EventType::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a record handed to the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// External send is switched off
    Disabled,
    Acknowledged,
    Unacknowledged,
    /// Send failed or timed out; the record is dropped
    Failed,
}

/// Result of handling one notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Snapshot stored from an `Added` notification
    Baseline,
    /// `Modified` for an object with no cached snapshot
    Untracked,
    /// `Modified` without a relevant field change; stored as the new baseline
    Unchanged,
    /// Relevant field changes were found and a record was assembled
    Changed { record: ChangeRecord, delivery: Delivery },
    /// Snapshot dropped on `Deleted`
    Removed,
}

/// Cache key for an object: `[namespace/]resource/name`.
pub fn cache_key(resource: &str, namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}/{}/{}", ns, resource, name),
        _ => format!("{}/{}", resource, name),
    }
}

struct ObjectIdentity {
    namespace: Option<String>,
    name: String,
}

impl ObjectIdentity {
    fn of(object: &Value) -> Result<Self, EngineError> {
        let metadata = object
            .get("metadata")
            .and_then(Value::as_object)
            .ok_or(EngineError::MissingMetadata)?;
        let name = metadata
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or(EngineError::MissingName)?;
        let namespace = metadata
            .get("namespace")
            .and_then(Value::as_str)
            .filter(|ns| !ns.is_empty())
            .map(str::to_string);
        Ok(Self { namespace, name: name.to_string() })
    }
}

/// Drives the object cache, the diff and the hub for each notification.
pub struct ChangeEngine {
    cache: Arc<ObjectCache>,
    hub: Option<Arc<dyn HubClientTrait>>,
    api_key: String,
}

impl ChangeEngine {
    /// Engine that computes and logs changes without dispatching them.
    pub fn new(cache: Arc<ObjectCache>, api_key: impl Into<String>) -> Self {
        Self {
            cache,
            hub: None,
            api_key: api_key.into(),
        }
    }

    /// Dispatch qualifying change records to `hub`.
    pub fn with_hub(mut self, hub: Arc<dyn HubClientTrait>) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn cache(&self) -> &Arc<ObjectCache> {
        &self.cache
    }

    /// Handle one notification for an object of kind `resource`.
    ///
    /// Errors are per-event; the caller logs them and moves on.
    pub async fn handle(
        &self,
        resource: &str,
        event_type: EventType,
        object: Value,
    ) -> Result<Outcome, EngineError> {
        let identity = ObjectIdentity::of(&object)?;
        let key = cache_key(resource, identity.namespace.as_deref(), &identity.name);

        match event_type {
            EventType::Added => {
                self.store(key, object);
                Ok(Outcome::Baseline)
            }
            EventType::Modified => {
                let Some(prior) = self.cache.get(&key) else {
                    debug!(key = %key, "modified object has no cached snapshot; ignoring");
                    return Ok(Outcome::Untracked);
                };

                let changes = change_set::compute(&prior, &object);
                let Some(changes) = changes else {
                    log_baseline(&key, &object);
                    self.store(key, object);
                    return Ok(Outcome::Unchanged);
                };
                self.store(key.clone(), object);

                let data = serde_json::to_vec(&changes)?;
                if tracing::enabled!(Level::DEBUG) {
                    let pretty = serde_json::to_string_pretty(&changes)?;
                    debug!(
                        key = %key,
                        changes = %pretty,
                        cached_objects = self.cache.len(),
                        "field changes detected"
                    );
                }

                let record = ChangeRecord {
                    namespace: identity.namespace.unwrap_or_default(),
                    name: identity.name,
                    event_type: event_type.to_string(),
                    data,
                    api_key: self.api_key.clone(),
                };
                let delivery = self.dispatch(record.clone()).await;
                Ok(Outcome::Changed { record, delivery })
            }
            EventType::Deleted => {
                self.cache.delete(&key);
                Ok(Outcome::Removed)
            }
        }
    }

    fn store(&self, key: String, object: Value) {
        if let Some(evicted) = self.cache.set(key, object) {
            debug!(evicted = %evicted, "cache full; evicted least recently used snapshot");
        }
    }

    async fn dispatch(&self, record: ChangeRecord) -> Delivery {
        let Some(hub) = &self.hub else {
            return Delivery::Disabled;
        };
        match hub.send(record).await {
            Ok(true) => {
                debug!(destination = %hub.destination(), "change record acknowledged");
                Delivery::Acknowledged
            }
            Ok(false) => {
                debug!(destination = %hub.destination(), "change record not acknowledged");
                Delivery::Unacknowledged
            }
            Err(e) => {
                debug!(
                    destination = %hub.destination(),
                    error = %e,
                    "failed to send change record; dropping"
                );
                Delivery::Failed
            }
        }
    }
}

impl fmt::Debug for ChangeEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeEngine")
            .field("cache", &self.cache)
            .field("hub", &self.hub.as_ref().map(|hub| hub.destination().to_string()))
            .finish_non_exhaustive()
    }
}

/// Log an object whose update carried no relevant change, like a fresh sighting.
fn log_baseline(key: &str, object: &Value) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }
    match serde_json::to_string(object) {
        Ok(encoded) => {
            debug!(key = %key, object = %encoded, "no relevant changes; recorded as baseline")
        }
        Err(e) => debug!(key = %key, error = %e, "failed to encode baseline object"),
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;
