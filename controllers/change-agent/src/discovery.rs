//! Resource kind discovery filtering.
//!
//! Discovery returns every resource the API server serves, in its preferred
//! version per group. Only the allow-listed workload, networking, config and
//! RBAC resources are watched.

use std::collections::HashSet;
use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube::core::{ApiResource, GroupVersionKind};
use tracing::{debug, warn};

/// Resource names watched unless overridden by configuration.
pub const DEFAULT_WATCHED_RESOURCES: [&str; 16] = [
    "pods",
    "deployments",
    "statefulsets",
    "daemonsets",
    "jobs",
    "cronjobs",
    "services",
    "ingresses",
    "networkpolicies",
    "configmaps",
    "secrets",
    "persistentvolumeclaims",
    "roles",
    "rolebindings",
    "clusterroles",
    "clusterrolebindings",
];

/// A watchable kind: group, version and plural resource name (plus the kind,
/// which dynamic API access needs).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKind {
    /// Empty for the core group
    pub group: String,
    pub version: String,
    pub resource: String,
    pub kind: String,
}

impl ResourceKind {
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Dynamic API descriptor used to open watches on this kind
    pub fn api_resource(&self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(&self.group, &self.version, &self.kind);
        ApiResource::from_gvk_with_plural(&gvk, &self.resource)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.resource)
    }
}

/// Split a `group/version` (or core `version`) string.
pub fn parse_group_version(group_version: &str) -> Result<(String, String), String> {
    let parts: Vec<&str> = group_version.split('/').collect();
    match parts.as_slice() {
        [version] if !version.is_empty() => Ok((String::new(), (*version).to_string())),
        [group, version] if !group.is_empty() && !version.is_empty() => {
            Ok(((*group).to_string(), (*version).to_string()))
        }
        _ => Err(format!(
            "unexpected GroupVersion string: {:?} (expect v1 or group/v1)",
            group_version
        )),
    }
}

/// Keep the discovered kinds whose resource name is in `allowed`.
///
/// Only resources that support `watch` qualify. Each resource name is watched
/// in the first group that serves it, since snapshots are keyed by resource
/// name. Lists with an unparseable group/version are skipped with a warning.
/// Subresources (`pods/log`, ...) never match.
pub fn filter_allowed(lists: &[APIResourceList], allowed: &[String]) -> Vec<ResourceKind> {
    let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    let mut kinds = Vec::new();

    for list in lists {
        let (group, version) = match parse_group_version(&list.group_version) {
            Ok(gv) => gv,
            Err(e) => {
                warn!("Skipping resource list: {}", e);
                continue;
            }
        };
        for resource in &list.resources {
            if resource.name.contains('/') || !allowed.contains(resource.name.as_str()) {
                continue;
            }
            if !resource.verbs.iter().any(|verb| verb == "watch") {
                debug!(
                    group_version = %list.group_version,
                    resource = %resource.name,
                    "resource does not support watch; skipping"
                );
                continue;
            }
            if !seen.insert(resource.name.clone()) {
                debug!(
                    group_version = %list.group_version,
                    resource = %resource.name,
                    "resource already watched in another group; skipping"
                );
                continue;
            }
            kinds.push(ResourceKind {
                group: group.clone(),
                version: version.clone(),
                resource: resource.name.clone(),
                kind: resource.kind.clone(),
            });
        }
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResource;

    fn list_with_verbs(
        group_version: &str,
        resources: &[(&str, &str)],
        verbs: &[&str],
    ) -> APIResourceList {
        APIResourceList {
            group_version: group_version.to_string(),
            resources: resources
                .iter()
                .map(|(name, kind)| APIResource {
                    name: name.to_string(),
                    kind: kind.to_string(),
                    namespaced: true,
                    verbs: verbs.iter().map(|verb| verb.to_string()).collect(),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn list(group_version: &str, resources: &[(&str, &str)]) -> APIResourceList {
        list_with_verbs(group_version, resources, &["list", "watch"])
    }

    fn defaults() -> Vec<String> {
        DEFAULT_WATCHED_RESOURCES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_group_version() {
        assert_eq!(parse_group_version("v1").unwrap(), (String::new(), "v1".to_string()));
        assert_eq!(
            parse_group_version("apps/v1").unwrap(),
            ("apps".to_string(), "v1".to_string())
        );
        assert!(parse_group_version("").is_err());
        assert!(parse_group_version("a/b/c").is_err());
        assert!(parse_group_version("apps/").is_err());
    }

    #[test]
    fn test_filter_keeps_only_allowed_resources() {
        let lists = vec![
            list(
                "v1",
                &[("pods", "Pod"), ("pods/log", "Pod"), ("events", "Event"), ("secrets", "Secret")],
            ),
            list(
                "apps/v1",
                &[("deployments", "Deployment"), ("controllerrevisions", "ControllerRevision")],
            ),
        ];

        let kinds = filter_allowed(&lists, &defaults());
        let names: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
        assert_eq!(names, vec!["v1/pods", "v1/secrets", "apps/v1/deployments"]);
        assert_eq!(kinds[2].kind, "Deployment");
        assert_eq!(kinds[2].api_version(), "apps/v1");
    }

    #[test]
    fn test_filter_skips_unparseable_group_version() {
        let lists = vec![
            list("bad/group/version", &[("pods", "Pod")]),
            list("rbac.authorization.k8s.io/v1", &[("roles", "Role")]),
        ];

        let kinds = filter_allowed(&lists, &defaults());
        assert_eq!(kinds.len(), 1);
        assert_eq!(kinds[0].group, "rbac.authorization.k8s.io");
    }

    #[test]
    fn test_filter_honors_custom_allow_list() {
        let lists = vec![list("v1", &[("pods", "Pod"), ("configmaps", "ConfigMap")])];
        let kinds = filter_allowed(&lists, &["configmaps".to_string()]);
        assert_eq!(kinds.len(), 1);
        assert_eq!(kinds[0].resource, "configmaps");
    }

    #[test]
    fn test_filter_drops_duplicate_group_resource() {
        let lists = vec![
            list("batch/v1", &[("jobs", "Job")]),
            list("batch/v1", &[("jobs", "Job")]),
        ];
        assert_eq!(filter_allowed(&lists, &defaults()).len(), 1);
    }

    #[test]
    fn test_resource_name_is_watched_in_first_group_only() {
        let lists = vec![
            list("networking.k8s.io/v1", &[("ingresses", "Ingress")]),
            list("extensions/v1beta1", &[("ingresses", "Ingress")]),
        ];

        let kinds = filter_allowed(&lists, &defaults());
        assert_eq!(kinds.len(), 1);
        assert_eq!(kinds[0].group, "networking.k8s.io");
    }

    #[test]
    fn test_resources_without_watch_are_skipped() {
        let lists = vec![
            list_with_verbs("metrics.k8s.io/v1beta1", &[("pods", "PodMetrics")], &["get", "list"]),
            list("v1", &[("pods", "Pod")]),
        ];

        let kinds = filter_allowed(&lists, &defaults());
        assert_eq!(kinds.len(), 1);
        assert_eq!(kinds[0].group, "");
        assert_eq!(kinds[0].kind, "Pod");
    }

    #[test]
    fn test_api_resource_for_core_kind() {
        let kind = ResourceKind {
            group: String::new(),
            version: "v1".to_string(),
            resource: "configmaps".to_string(),
            kind: "ConfigMap".to_string(),
        };
        let ar = kind.api_resource();
        assert_eq!(ar.api_version, "v1");
        assert_eq!(ar.plural, "configmaps");
        assert_eq!(ar.kind, "ConfigMap");
    }
}
