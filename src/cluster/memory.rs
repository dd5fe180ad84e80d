//! In-memory cluster backed by a TOML fixture
//!
//! Used by the `chat` command to rehearse conversations without an API
//! server, and by the test suite.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::sync::RwLock;

use super::feedback::deployment_config_pod_selector;
use super::{ClusterApi, ClusterError, ClusterFlavor, Query, ResourceKind, ResourceSummary};
use crate::core::error::{Result, SkillError};

/// One object stored in the fixture
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixtureObject {
    pub name: String,
    pub namespace: Option<String>,
    pub uid: Option<String>,
    pub labels: BTreeMap<String, String>,
    /// Workloads only; defaults to ready
    pub ready: Option<bool>,
    /// Deployments only: `matchLabels` of the pod selector
    pub selector: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixtureEvent {
    pub pod: String,
    pub namespace: Option<String>,
    pub reason: String,
    pub message: String,
}

/// Contents of a fixture file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub flavor: ClusterFlavor,
    pub default_namespace: String,
    /// When set, every call fails with this message
    pub fail_with: Option<String>,
    pub namespaces: Vec<FixtureObject>,
    pub projects: Vec<FixtureObject>,
    pub deployments: Vec<FixtureObject>,
    pub deployment_configs: Vec<FixtureObject>,
    pub services: Vec<FixtureObject>,
    pub pods: Vec<FixtureObject>,
    pub events: Vec<FixtureEvent>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            flavor: ClusterFlavor::Kubernetes,
            default_namespace: "default".into(),
            fail_with: None,
            namespaces: Vec::new(),
            projects: Vec::new(),
            deployments: Vec::new(),
            deployment_configs: Vec::new(),
            services: Vec::new(),
            pods: Vec::new(),
            events: Vec::new(),
        }
    }
}

impl FixtureObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn ready(mut self, ready: bool) -> Self {
        self.ready = Some(ready);
        self
    }

    pub fn selector(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.selector.insert(key.into(), value.into());
        self
    }
}

/// A [`ClusterApi`] serving objects from memory
pub struct InMemoryCluster {
    flavor: ClusterFlavor,
    default_namespace: String,
    fail_with: Option<String>,
    state: RwLock<Fixture>,
}

impl InMemoryCluster {
    pub fn new(fixture: Fixture) -> Self {
        Self {
            flavor: fixture.flavor,
            default_namespace: fixture.default_namespace.clone(),
            fail_with: fixture.fail_with.clone(),
            state: RwLock::new(fixture),
        }
    }

    /// Load a fixture from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let fixture: Fixture = toml::from_str(&content)
            .map_err(|e| SkillError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(Self::new(fixture))
    }

    fn check_failure(&self) -> std::result::Result<(), ClusterError> {
        match &self.fail_with {
            Some(message) => Err(ClusterError::Status {
                code: 500,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn summarize(&self, kind: ResourceKind, object: &FixtureObject) -> ResourceSummary {
        let namespace = if kind.is_namespaced() {
            Some(self.namespace_of(object).to_string())
        } else {
            None
        };
        let pod_selector = match kind {
            ResourceKind::Deployment => Some(
                object
                    .selector
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect(),
            ),
            ResourceKind::DeploymentConfig => Some(deployment_config_pod_selector(&object.name)),
            _ => None,
        };
        ResourceSummary {
            name: object.name.clone(),
            namespace,
            uid: object.uid.clone(),
            ready: object.ready.unwrap_or(true),
            pod_selector,
        }
    }

    fn namespace_of<'a>(&'a self, object: &'a FixtureObject) -> &'a str {
        object
            .namespace
            .as_deref()
            .unwrap_or(&self.default_namespace)
    }
}

fn collection(fixture: &Fixture, kind: ResourceKind) -> &[FixtureObject] {
    match kind {
        ResourceKind::Namespace => &fixture.namespaces,
        ResourceKind::Project => &fixture.projects,
        ResourceKind::Deployment => &fixture.deployments,
        ResourceKind::DeploymentConfig => &fixture.deployment_configs,
        ResourceKind::Service => &fixture.services,
        ResourceKind::Pod => &fixture.pods,
    }
}

fn collection_mut(fixture: &mut Fixture, kind: ResourceKind) -> &mut Vec<FixtureObject> {
    match kind {
        ResourceKind::Namespace => &mut fixture.namespaces,
        ResourceKind::Project => &mut fixture.projects,
        ResourceKind::Deployment => &mut fixture.deployments,
        ResourceKind::DeploymentConfig => &mut fixture.deployment_configs,
        ResourceKind::Service => &mut fixture.services,
        ResourceKind::Pod => &mut fixture.pods,
    }
}

/// Evaluate one label selector term against an object's labels
fn term_matches(term: &str, labels: &BTreeMap<String, String>) -> bool {
    let term = term.trim();

    if let Some((key, values)) = set_term(term, " notin ") {
        return labels.get(key).map_or(true, |v| !values.contains(&v.as_str()));
    }
    if let Some((key, values)) = set_term(term, " in ") {
        return labels.get(key).map_or(false, |v| values.contains(&v.as_str()));
    }
    if let Some((key, value)) = term.split_once("!=") {
        return labels.get(key.trim()).map(String::as_str) != Some(value.trim());
    }
    if let Some((key, value)) = term.split_once("==").or_else(|| term.split_once('=')) {
        return labels.get(key.trim()).map(String::as_str) == Some(value.trim());
    }
    if let Some(key) = term.strip_prefix('!') {
        return !labels.contains_key(key.trim());
    }
    labels.contains_key(term)
}

fn set_term<'a>(term: &'a str, operator: &str) -> Option<(&'a str, Vec<&'a str>)> {
    let (key, rest) = term.split_once(operator)?;
    let inner = rest.trim().strip_prefix('(')?.strip_suffix(')')?;
    Some((key.trim(), inner.split(',').map(str::trim).collect()))
}

#[async_trait]
impl ClusterApi for InMemoryCluster {
    fn flavor(&self) -> ClusterFlavor {
        self.flavor
    }

    fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    async fn list(&self, query: &Query) -> std::result::Result<Vec<ResourceSummary>, ClusterError> {
        self.check_failure()?;
        let kind = query.kind();
        if kind == ResourceKind::Project && self.flavor != ClusterFlavor::OpenShift {
            return Err(ClusterError::Unsupported(
                "Projects are only available on Openshift".into(),
            ));
        }

        let namespace = query.namespace().unwrap_or(&self.default_namespace);
        let state = self.state.read().await;
        Ok(collection(&state, kind)
            .iter()
            .filter(|object| !kind.is_namespaced() || self.namespace_of(object) == namespace)
            .filter(|object| query.name().map_or(true, |name| object.name == name))
            .filter(|object| {
                query
                    .labels()
                    .iter()
                    .all(|term| term_matches(term, &object.labels))
            })
            .map(|object| self.summarize(kind, object))
            .collect())
    }

    async fn create(
        &self,
        kind: ResourceKind,
        manifest: serde_json::Value,
    ) -> std::result::Result<(), ClusterError> {
        self.check_failure()?;
        let name = manifest
            .pointer("/metadata/name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ClusterError::Decode("manifest has no metadata.name".into()))?
            .to_string();
        let namespace = manifest
            .pointer("/metadata/namespace")
            .and_then(|v| v.as_str())
            .map(String::from);

        let target = namespace.as_deref().unwrap_or(&self.default_namespace);
        let mut state = self.state.write().await;
        let exists = collection(&state, kind).iter().any(|object| {
            object.name == name && (!kind.is_namespaced() || self.namespace_of(object) == target)
        });
        if exists {
            return Err(ClusterError::Status {
                code: 409,
                message: format!("{} \"{}\" already exists", kind.plural(), name),
            });
        }

        // OpenShift serves every namespace as a project too
        if kind == ResourceKind::Namespace && self.flavor == ClusterFlavor::OpenShift {
            state.projects.push(FixtureObject::new(name.clone()));
        }
        collection_mut(&mut state, kind).push(FixtureObject {
            name,
            namespace,
            ..FixtureObject::default()
        });
        Ok(())
    }

    async fn failed_events(
        &self,
        pod: &ResourceSummary,
    ) -> std::result::Result<Vec<String>, ClusterError> {
        self.check_failure()?;
        let namespace = pod.namespace.as_deref().unwrap_or(&self.default_namespace);
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .filter(|event| event.reason == "Failed" && event.pod == pod.name)
            .filter(|event| event.namespace.as_deref().unwrap_or(&self.default_namespace) == namespace)
            .map(|event| event.message.clone())
            .collect())
    }
}
