//! Test helpers: a scripted cluster source and object builders.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{APIResource, APIResourceList};
use serde_json::{Value, json};

use crate::discovery::ResourceKind;
use crate::error::ControllerError;
use crate::source::{ClusterSource, Notification, NotificationStream};

/// What the next `watch` call for a resource returns.
#[derive(Debug)]
pub enum Script {
    /// Opening the stream fails
    Fail(String),
    /// The stream yields these items, then closes
    Stream(Vec<Result<Notification, ControllerError>>),
}

/// Cluster source that replays scripted watch streams per resource name.
///
/// A `watch` with no script left fails to open.
#[derive(Debug, Default)]
pub struct FakeSource {
    lists: Vec<APIResourceList>,
    discovery_error: Option<String>,
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    opened: Mutex<Vec<(String, String)>>,
}

impl FakeSource {
    pub fn new(lists: Vec<APIResourceList>) -> Self {
        Self {
            lists,
            ..Default::default()
        }
    }

    pub fn failing_discovery(message: &str) -> Self {
        Self {
            discovery_error: Some(message.to_string()),
            ..Default::default()
        }
    }

    pub fn script(self, resource: &str, script: Script) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(resource.to_string())
            .or_default()
            .push_back(script);
        self
    }

    /// `(resource, resource_version)` of every watch opened, in order.
    pub fn opened(&self) -> Vec<(String, String)> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterSource for FakeSource {
    async fn discover(&self) -> Result<Vec<APIResourceList>, ControllerError> {
        match &self.discovery_error {
            Some(message) => Err(ControllerError::Discovery(message.clone())),
            None => Ok(self.lists.clone()),
        }
    }

    async fn watch(
        &self,
        kind: &ResourceKind,
        resource_version: &str,
    ) -> Result<NotificationStream, ControllerError> {
        self.opened
            .lock()
            .unwrap()
            .push((kind.resource.clone(), resource_version.to_string()));
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&kind.resource)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Script::Stream(items)) => Ok(futures::stream::iter(items).boxed()),
            Some(Script::Fail(message)) => Err(ControllerError::Watch(message)),
            None => Err(ControllerError::Watch(format!("no stream scripted for {}", kind))),
        }
    }
}

pub fn resource_list(group_version: &str, resources: &[(&str, &str)]) -> APIResourceList {
    APIResourceList {
        group_version: group_version.to_string(),
        resources: resources
            .iter()
            .map(|(name, kind)| APIResource {
                name: name.to_string(),
                kind: kind.to_string(),
                namespaced: true,
                verbs: vec!["list".to_string(), "watch".to_string()],
                ..Default::default()
            })
            .collect(),
    }
}

pub fn deployments_kind() -> ResourceKind {
    ResourceKind {
        group: "apps".to_string(),
        version: "v1".to_string(),
        resource: "deployments".to_string(),
        kind: "Deployment".to_string(),
    }
}

pub fn deployment(name: &str, resource_version: &str, replicas: i64) -> Value {
    json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {
            "name": name,
            "namespace": "default",
            "resourceVersion": resource_version,
        },
        "spec": { "replicas": replicas },
        "status": { "readyReplicas": 0 },
    })
}
