//! Backing cluster access
//!
//! The rest of the crate talks to the cluster only through [`ClusterApi`]:
//! list a collection narrowed by a [`Query`], create an object, and look up
//! failure events for a pod. [`rest::RestCluster`] speaks to a live API
//! server; [`memory::InMemoryCluster`] serves a fixture.

pub mod feedback;
pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::InMemoryCluster;
pub use rest::RestCluster;

/// Which API surface the cluster exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterFlavor {
    Kubernetes,
    #[serde(alias = "openShift")]
    OpenShift,
}

impl ClusterFlavor {
    /// Name used when speaking about the cluster
    pub fn spoken_name(self) -> &'static str {
        match self {
            ClusterFlavor::Kubernetes => "Kubernetes",
            ClusterFlavor::OpenShift => "Openshift",
        }
    }

    /// Kind listed when the user refers to "namespaces"
    pub fn namespace_kind(self) -> ResourceKind {
        match self {
            ClusterFlavor::Kubernetes => ResourceKind::Namespace,
            ClusterFlavor::OpenShift => ResourceKind::Project,
        }
    }

    /// Workload kind reported on launch
    pub fn workload_kind(self) -> ResourceKind {
        match self {
            ClusterFlavor::Kubernetes => ResourceKind::Deployment,
            ClusterFlavor::OpenShift => ResourceKind::DeploymentConfig,
        }
    }
}

/// Failure reported by the backing system
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// The API server answered with a non-success status
    #[error("{message} (HTTP {code})")]
    Status { code: u16, message: String },

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("{0}")]
    Unsupported(String),
}

impl ClusterError {
    /// The text spoken back to the user in a failure notice
    pub fn message(&self) -> &str {
        match self {
            ClusterError::Status { message, .. } => message,
            ClusterError::Transport(message)
            | ClusterError::Decode(message)
            | ClusterError::Unsupported(message) => message,
        }
    }
}

/// Resource collections the skill can query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Namespace,
    Project,
    Deployment,
    DeploymentConfig,
    Service,
    Pod,
}

impl ResourceKind {
    /// Plural noun used in spoken replies
    pub fn plural(self) -> &'static str {
        match self {
            ResourceKind::Namespace => "namespaces",
            ResourceKind::Project => "projects",
            ResourceKind::Deployment => "deployments",
            ResourceKind::DeploymentConfig => "deployment configs",
            ResourceKind::Service => "services",
            ResourceKind::Pod => "pods",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            ResourceKind::Namespace => "namespace",
            ResourceKind::Project => "project",
            ResourceKind::Deployment => "deployment",
            ResourceKind::DeploymentConfig => "deployment config",
            ResourceKind::Service => "service",
            ResourceKind::Pod => "pod",
        }
    }

    pub fn is_namespaced(self) -> bool {
        !matches!(self, ResourceKind::Namespace | ResourceKind::Project)
    }
}

/// Name and label constraints shared by every query kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub name: Option<String>,
    /// Label selector terms (`key`, `key=value`, `key in (a,b)`, ...)
    pub labels: Vec<String>,
}

/// Constraints for a namespaced collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scoped {
    /// `None` means the client's default namespace
    pub namespace: Option<String>,
    pub selector: Selector,
}

/// Deferred description of a list query, narrowed by filters
///
/// Every narrowing method consumes the query and returns the narrowed
/// copy; nothing is sent to the cluster until [`ClusterApi::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Namespaces(Selector),
    Projects(Selector),
    Deployments(Scoped),
    DeploymentConfigs(Scoped),
    Services(Scoped),
    Pods(Scoped),
}

impl Query {
    /// An unfiltered query over every object of `kind`
    pub fn new(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Namespace => Query::Namespaces(Selector::default()),
            ResourceKind::Project => Query::Projects(Selector::default()),
            ResourceKind::Deployment => Query::Deployments(Scoped::default()),
            ResourceKind::DeploymentConfig => Query::DeploymentConfigs(Scoped::default()),
            ResourceKind::Service => Query::Services(Scoped::default()),
            ResourceKind::Pod => Query::Pods(Scoped::default()),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Query::Namespaces(_) => ResourceKind::Namespace,
            Query::Projects(_) => ResourceKind::Project,
            Query::Deployments(_) => ResourceKind::Deployment,
            Query::DeploymentConfigs(_) => ResourceKind::DeploymentConfig,
            Query::Services(_) => ResourceKind::Service,
            Query::Pods(_) => ResourceKind::Pod,
        }
    }

    pub fn selector(&self) -> &Selector {
        match self {
            Query::Namespaces(selector) | Query::Projects(selector) => selector,
            Query::Deployments(scoped)
            | Query::DeploymentConfigs(scoped)
            | Query::Services(scoped)
            | Query::Pods(scoped) => &scoped.selector,
        }
    }

    fn selector_mut(&mut self) -> &mut Selector {
        match self {
            Query::Namespaces(selector) | Query::Projects(selector) => selector,
            Query::Deployments(scoped)
            | Query::DeploymentConfigs(scoped)
            | Query::Services(scoped)
            | Query::Pods(scoped) => &mut scoped.selector,
        }
    }

    /// Explicit namespace, if the query has been narrowed to one
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Query::Namespaces(_) | Query::Projects(_) => None,
            Query::Deployments(scoped)
            | Query::DeploymentConfigs(scoped)
            | Query::Services(scoped)
            | Query::Pods(scoped) => scoped.namespace.as_deref(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.selector().name.as_deref()
    }

    pub fn labels(&self) -> &[String] {
        &self.selector().labels
    }

    /// Require an exact object name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.selector_mut().name = Some(name.into());
        self
    }

    /// Add one label selector term
    pub fn with_label(mut self, term: impl Into<String>) -> Self {
        self.selector_mut().labels.push(term.into());
        self
    }

    /// Restrict to a namespace. Cluster-scoped kinds are returned unchanged.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        match &mut self {
            Query::Namespaces(_) | Query::Projects(_) => {}
            Query::Deployments(scoped)
            | Query::DeploymentConfigs(scoped)
            | Query::Services(scoped)
            | Query::Pods(scoped) => scoped.namespace = Some(namespace.into()),
        }
        self
    }

    /// The label terms joined into a Kubernetes `labelSelector` value
    pub fn label_selector(&self) -> Option<String> {
        let labels = self.labels();
        if labels.is_empty() {
            None
        } else {
            Some(labels.join(","))
        }
    }
}

/// What the skill needs to know about one listed object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSummary {
    pub name: String,
    pub namespace: Option<String>,
    pub uid: Option<String>,
    /// Workload readiness; always true for kinds without replicas
    pub ready: bool,
    /// Label selector terms locating a workload's pods
    pub pod_selector: Option<Vec<String>>,
}

impl ResourceSummary {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            uid: None,
            ready: true,
            pod_selector: None,
        }
    }
}

/// Operations the skill consumes from the cluster
///
/// Implementations must be safe to share across concurrent conversations.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    fn flavor(&self) -> ClusterFlavor;

    /// Namespace used when a namespaced query names none
    fn default_namespace(&self) -> &str;

    async fn list(&self, query: &Query) -> Result<Vec<ResourceSummary>, ClusterError>;

    /// Create an object of `kind` from its manifest
    async fn create(
        &self,
        kind: ResourceKind,
        manifest: serde_json::Value,
    ) -> Result<(), ClusterError>;

    /// Messages of `Failed` events involving the given pod
    async fn failed_events(&self, pod: &ResourceSummary) -> Result<Vec<String>, ClusterError>;

    /// Names of every namespace the caller can see (projects on OpenShift)
    async fn list_namespaces(&self) -> Result<Vec<String>, ClusterError> {
        let query = Query::new(self.flavor().namespace_kind());
        Ok(self
            .list(&query)
            .await?
            .into_iter()
            .map(|summary| summary.name)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrowing_returns_new_query() {
        let base = Query::new(ResourceKind::Deployment);
        let narrowed = base
            .clone()
            .in_namespace("team-a")
            .with_label("app")
            .with_name("web");

        assert_eq!(base, Query::Deployments(Scoped::default()));
        assert_eq!(narrowed.namespace(), Some("team-a"));
        assert_eq!(narrowed.name(), Some("web"));
        assert_eq!(narrowed.labels(), &["app".to_string()]);
    }

    #[test]
    fn test_in_namespace_is_noop_for_cluster_scoped() {
        let query = Query::new(ResourceKind::Namespace).in_namespace("team-a");
        assert_eq!(query, Query::new(ResourceKind::Namespace));
        assert_eq!(query.namespace(), None);
    }

    #[test]
    fn test_label_selector_joins_terms() {
        let query = Query::new(ResourceKind::Service)
            .with_label("app=web")
            .with_label("tier");
        assert_eq!(query.label_selector(), Some("app=web,tier".to_string()));
        assert_eq!(Query::new(ResourceKind::Service).label_selector(), None);
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ResourceKind::Namespace,
            ResourceKind::Project,
            ResourceKind::Deployment,
            ResourceKind::DeploymentConfig,
            ResourceKind::Service,
            ResourceKind::Pod,
        ] {
            assert_eq!(Query::new(kind).kind(), kind);
        }
    }

    #[test]
    fn test_error_message_is_spoken_text() {
        let err = ClusterError::Status {
            code: 403,
            message: "namespaces is forbidden".into(),
        };
        assert_eq!(err.message(), "namespaces is forbidden");
        assert_eq!(err.to_string(), "namespaces is forbidden (HTTP 403)");
    }

    #[test]
    fn test_flavor_kinds() {
        assert_eq!(ClusterFlavor::OpenShift.namespace_kind(), ResourceKind::Project);
        assert_eq!(
            ClusterFlavor::Kubernetes.workload_kind(),
            ResourceKind::Deployment
        );
        assert_eq!(ClusterFlavor::OpenShift.spoken_name(), "Openshift");
    }
}
