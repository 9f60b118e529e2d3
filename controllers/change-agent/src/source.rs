//! Cluster access seam.
//!
//! The controller only talks to the cluster through [`ClusterSource`]: one
//! call to enumerate resource kinds and one to open a watch stream per kind.
//! [`KubeSource`] is the real implementation on top of `kube`.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube::Client;
use kube::api::{Api, WatchEvent, WatchParams};
use kube::core::DynamicObject;
use serde_json::Value;
use tracing::debug;

use crate::discovery::ResourceKind;
use crate::error::ControllerError;

/// Resource version that asks the API server to start a watch from any
/// recent state. Objects that already exist arrive as `Added` notifications.
pub const INITIAL_RESOURCE_VERSION: &str = "0";

/// One watch notification, with the object already converted to JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Added(Value),
    Modified(Value),
    Deleted(Value),
    /// Progress marker carrying only a resource version
    Bookmark { resource_version: String },
    /// Error event sent by the API server inside the stream
    Error(String),
}

/// Stream of notifications for one resource kind.
///
/// An `Err` item is a single undecodable notification; the stream goes on.
pub type NotificationStream = BoxStream<'static, Result<Notification, ControllerError>>;

#[async_trait]
pub trait ClusterSource: Send + Sync {
    /// Resource lists for every group the API server serves, in the
    /// preferred version of each group.
    async fn discover(&self) -> Result<Vec<APIResourceList>, ControllerError>;

    /// Open a watch on all objects of `kind` across namespaces.
    async fn watch(
        &self,
        kind: &ResourceKind,
        resource_version: &str,
    ) -> Result<NotificationStream, ControllerError>;
}

/// Cluster source backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeSource {
    client: Client,
}

impl KubeSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect with in-cluster configuration, falling back to kubeconfig.
    pub async fn try_default() -> Result<Self, ControllerError> {
        Ok(Self::new(Client::try_default().await?))
    }
}

impl std::fmt::Debug for KubeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeSource")
            .field("default_namespace", &self.client.default_namespace())
            .finish()
    }
}

#[async_trait]
impl ClusterSource for KubeSource {
    async fn discover(&self) -> Result<Vec<APIResourceList>, ControllerError> {
        let mut lists = Vec::new();

        let core = self.client.list_core_api_versions().await?;
        for version in &core.versions {
            lists.push(self.client.list_core_api_resources(version).await?);
        }

        let groups = self.client.list_api_groups().await?;
        for group in &groups.groups {
            let Some(preferred) = group
                .preferred_version
                .as_ref()
                .or_else(|| group.versions.first())
            else {
                debug!(group = %group.name, "API group has no versions; skipping");
                continue;
            };
            lists.push(
                self.client
                    .list_api_group_resources(&preferred.group_version)
                    .await?,
            );
        }

        Ok(lists)
    }

    async fn watch(
        &self,
        kind: &ResourceKind,
        resource_version: &str,
    ) -> Result<NotificationStream, ControllerError> {
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &kind.api_resource());
        // default params close the stream after ~290s; the controller reopens it
        let stream = api.watch(&WatchParams::default(), resource_version).await?;
        Ok(stream
            .map_err(ControllerError::from)
            .and_then(|event| futures::future::ready(notification_from(event)))
            .boxed())
    }
}

fn notification_from(event: WatchEvent<DynamicObject>) -> Result<Notification, ControllerError> {
    Ok(match event {
        WatchEvent::Added(object) => Notification::Added(serde_json::to_value(&object)?),
        WatchEvent::Modified(object) => Notification::Modified(serde_json::to_value(&object)?),
        WatchEvent::Deleted(object) => Notification::Deleted(serde_json::to_value(&object)?),
        WatchEvent::Bookmark(bookmark) => Notification::Bookmark {
            resource_version: bookmark.metadata.resource_version,
        },
        WatchEvent::Error(error) => Notification::Error(format!("{:?}", error)),
    })
}
