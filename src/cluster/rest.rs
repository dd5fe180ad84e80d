//! Kubernetes/OpenShift REST client
//!
//! Only the handful of list/create endpoints the skill needs. Name
//! constraints are sent as `fieldSelector=metadata.name=...` so a missing
//! object comes back as an empty list rather than a 404.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::feedback::{deployment_config_pod_selector, LabelSelector};
use super::{ClusterApi, ClusterError, ClusterFlavor, Query, ResourceKind, ResourceSummary};
use crate::core::config::ClusterConfig;
use crate::core::error::{Result, SkillError};

const OPENSHIFT_PROJECT_GROUP: &str = "/apis/project.openshift.io/v1";

/// A [`ClusterApi`] talking to a live API server
pub struct RestCluster {
    client: Client,
    api_url: String,
    token: Option<String>,
    namespace: String,
    flavor: ClusterFlavor,
}

impl RestCluster {
    /// Build a client from configuration and detect the cluster flavor
    /// unless it is configured explicitly.
    pub async fn connect(config: &ClusterConfig) -> Result<Self> {
        let api_url = config
            .api_url
            .clone()
            .ok_or_else(|| SkillError::Config("cluster.api_url is not set".into()))?;

        let token = match (&config.token, &config.token_file) {
            (Some(token), _) => Some(token.clone()),
            (None, Some(path)) => Some(std::fs::read_to_string(path)?.trim().to_string()),
            (None, None) => None,
        };

        let mut builder = Client::builder().danger_accept_invalid_certs(config.accept_invalid_certs);
        if let Some(path) = &config.ca_file {
            let pem = std::fs::read(path)?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| SkillError::Config(format!("{}: {}", path.display(), e)))?;
            builder = builder.add_root_certificate(cert);
        }
        let client = builder
            .build()
            .map_err(|e| SkillError::Config(format!("failed to build HTTP client: {}", e)))?;

        let mut cluster = Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            namespace: config.namespace.clone(),
            flavor: ClusterFlavor::Kubernetes,
        };
        cluster.flavor = match config.flavor {
            Some(flavor) => flavor,
            None => cluster.detect_flavor().await,
        };
        tracing::info!(
            "Connected to {} at {} (default namespace {})",
            cluster.flavor.spoken_name(),
            cluster.api_url,
            cluster.namespace
        );
        Ok(cluster)
    }

    /// OpenShift serves the project API group; plain Kubernetes does not
    async fn detect_flavor(&self) -> ClusterFlavor {
        let url = format!("{}{}", self.api_url, OPENSHIFT_PROJECT_GROUP);
        match self.authorized(self.client.get(url)).send().await {
            Ok(response) if response.status().is_success() => ClusterFlavor::OpenShift,
            Ok(_) => ClusterFlavor::Kubernetes,
            Err(e) => {
                tracing::warn!("Flavor detection failed, assuming Kubernetes: {}", e);
                ClusterFlavor::Kubernetes
            }
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<T, ClusterError> {
        let url = format!("{}{}", self.api_url, path);
        let response = self
            .authorized(self.client.get(url).query(params))
            .send()
            .await
            .map_err(|e| ClusterError::Transport(e.to_string()))?;
        decode(response).await
    }
}

/// Collection path for a kind, resolved against a namespace
pub fn collection_path(kind: ResourceKind, namespace: &str) -> String {
    match kind {
        ResourceKind::Namespace => "/api/v1/namespaces".to_string(),
        ResourceKind::Project => format!("{}/projects", OPENSHIFT_PROJECT_GROUP),
        ResourceKind::Deployment => format!("/apis/apps/v1/namespaces/{}/deployments", namespace),
        ResourceKind::DeploymentConfig => format!(
            "/apis/apps.openshift.io/v1/namespaces/{}/deploymentconfigs",
            namespace
        ),
        ResourceKind::Service => format!("/api/v1/namespaces/{}/services", namespace),
        ResourceKind::Pod => format!("/api/v1/namespaces/{}/pods", namespace),
    }
}

/// Query-string parameters for a list call
pub fn list_params(query: &Query) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(selector) = query.label_selector() {
        params.push(("labelSelector", selector));
    }
    if let Some(name) = query.name() {
        params.push(("fieldSelector", format!("metadata.name={}", name)));
    }
    params
}

async fn decode<T: DeserializeOwned>(response: Response) -> std::result::Result<T, ClusterError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| ClusterError::Decode(e.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status.as_u16(), status.canonical_reason(), &body))
}

/// Turn a failed response into a [`ClusterError`], preferring the
/// `Status.message` the API server puts in the body.
fn status_error(code: u16, reason: Option<&str>, body: &str) -> ClusterError {
    #[derive(Deserialize)]
    struct Status {
        message: Option<String>,
    }

    let message = serde_json::from_str::<Status>(body)
        .ok()
        .and_then(|status| status.message)
        .filter(|message| !message.is_empty())
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| reason.unwrap_or("request failed").to_string());
    ClusterError::Status { code, message }
}

#[derive(Deserialize)]
struct ObjectList {
    #[serde(default)]
    items: Vec<Object>,
}

#[derive(Deserialize)]
struct Object {
    metadata: ObjectMeta,
    #[serde(default)]
    spec: serde_json::Value,
    #[serde(default)]
    status: serde_json::Value,
}

#[derive(Deserialize)]
struct ObjectMeta {
    name: String,
    namespace: Option<String>,
    uid: Option<String>,
}

#[derive(Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<EventItem>,
}

#[derive(Deserialize)]
struct EventItem {
    message: Option<String>,
}

fn summarize(kind: ResourceKind, object: Object) -> ResourceSummary {
    let ready = match kind {
        ResourceKind::Deployment | ResourceKind::DeploymentConfig => workload_ready(&object),
        _ => true,
    };
    let pod_selector = match kind {
        ResourceKind::Deployment => Some(
            object
                .spec
                .get("selector")
                .cloned()
                .and_then(|value| serde_json::from_value::<LabelSelector>(value).ok())
                .unwrap_or_default()
                .to_terms(),
        ),
        ResourceKind::DeploymentConfig => Some(deployment_config_pod_selector(&object.metadata.name)),
        _ => None,
    };

    ResourceSummary {
        name: object.metadata.name,
        namespace: object.metadata.namespace,
        uid: object.metadata.uid,
        ready,
        pod_selector,
    }
}

/// A workload is ready once its available replicas reach the desired count
fn workload_ready(object: &Object) -> bool {
    let desired = object
        .spec
        .get("replicas")
        .and_then(|v| v.as_i64())
        .unwrap_or(1);
    let available = object
        .status
        .get("availableReplicas")
        .and_then(|v| v.as_i64())
        .unwrap_or(0);
    available >= desired
}

#[async_trait]
impl ClusterApi for RestCluster {
    fn flavor(&self) -> ClusterFlavor {
        self.flavor
    }

    fn default_namespace(&self) -> &str {
        &self.namespace
    }

    async fn list(&self, query: &Query) -> std::result::Result<Vec<ResourceSummary>, ClusterError> {
        let kind = query.kind();
        let namespace = query.namespace().unwrap_or(&self.namespace);
        let path = collection_path(kind, namespace);
        tracing::debug!("GET {} {:?}", path, query);

        let list: ObjectList = self.get_json(&path, &list_params(query)).await?;
        Ok(list
            .items
            .into_iter()
            .map(|object| summarize(kind, object))
            .collect())
    }

    async fn create(
        &self,
        kind: ResourceKind,
        manifest: serde_json::Value,
    ) -> std::result::Result<(), ClusterError> {
        let namespace = manifest
            .pointer("/metadata/namespace")
            .and_then(|v| v.as_str())
            .unwrap_or(&self.namespace);
        let url = format!("{}{}", self.api_url, collection_path(kind, namespace));
        tracing::debug!("POST {}", url);

        let response = self
            .authorized(self.client.post(url).json(&manifest))
            .send()
            .await
            .map_err(|e| ClusterError::Transport(e.to_string()))?;
        let _: serde_json::Value = decode(response).await?;
        Ok(())
    }

    async fn failed_events(
        &self,
        pod: &ResourceSummary,
    ) -> std::result::Result<Vec<String>, ClusterError> {
        let namespace = pod.namespace.as_deref().unwrap_or(&self.namespace);
        let mut fields = vec![
            format!("involvedObject.name={}", pod.name),
            format!("involvedObject.namespace={}", namespace),
            "reason=Failed".to_string(),
        ];
        if let Some(uid) = &pod.uid {
            fields.insert(0, format!("involvedObject.uid={}", uid));
        }

        let path = format!("/api/v1/namespaces/{}/events", namespace);
        let events: EventList = self
            .get_json(&path, &[("fieldSelector", fields.join(","))])
            .await?;
        Ok(events
            .items
            .into_iter()
            .filter_map(|event| event.message)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(json: serde_json::Value) -> Object {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_collection_paths() {
        assert_eq!(collection_path(ResourceKind::Namespace, "x"), "/api/v1/namespaces");
        assert_eq!(
            collection_path(ResourceKind::Project, "x"),
            "/apis/project.openshift.io/v1/projects"
        );
        assert_eq!(
            collection_path(ResourceKind::Deployment, "team-a"),
            "/apis/apps/v1/namespaces/team-a/deployments"
        );
        assert_eq!(
            collection_path(ResourceKind::DeploymentConfig, "team-a"),
            "/apis/apps.openshift.io/v1/namespaces/team-a/deploymentconfigs"
        );
        assert_eq!(
            collection_path(ResourceKind::Service, "team-a"),
            "/api/v1/namespaces/team-a/services"
        );
    }

    #[test]
    fn test_list_params() {
        let query = Query::new(ResourceKind::Service)
            .with_label("app")
            .with_label("tier=web")
            .with_name("frontend");
        assert_eq!(
            list_params(&query),
            vec![
                ("labelSelector", "app,tier=web".to_string()),
                ("fieldSelector", "metadata.name=frontend".to_string()),
            ]
        );
        assert!(list_params(&Query::new(ResourceKind::Service)).is_empty());
    }

    #[test]
    fn test_deployment_summary() {
        let summary = summarize(
            ResourceKind::Deployment,
            object(serde_json::json!({
                "metadata": {"name": "web", "namespace": "team-a", "uid": "u-1"},
                "spec": {"replicas": 3, "selector": {"matchLabels": {"app": "web"}}},
                "status": {"availableReplicas": 2}
            })),
        );
        assert_eq!(summary.name, "web");
        assert_eq!(summary.namespace.as_deref(), Some("team-a"));
        assert!(!summary.ready);
        assert_eq!(summary.pod_selector, Some(vec!["app=web".to_string()]));
    }

    #[test]
    fn test_deployment_config_summary() {
        let summary = summarize(
            ResourceKind::DeploymentConfig,
            object(serde_json::json!({
                "metadata": {"name": "frontend"},
                "spec": {"replicas": 1},
                "status": {"availableReplicas": 1}
            })),
        );
        assert!(summary.ready);
        assert_eq!(
            summary.pod_selector,
            Some(vec!["deploymentconfig=frontend".to_string()])
        );
    }

    #[test]
    fn test_service_is_always_ready() {
        let summary = summarize(
            ResourceKind::Service,
            object(serde_json::json!({"metadata": {"name": "db"}})),
        );
        assert!(summary.ready);
        assert!(summary.pod_selector.is_none());
    }

    #[test]
    fn test_status_error_prefers_status_message() {
        let err = status_error(
            403,
            Some("Forbidden"),
            r#"{"kind":"Status","message":"namespaces is forbidden","code":403}"#,
        );
        assert_eq!(
            err,
            ClusterError::Status {
                code: 403,
                message: "namespaces is forbidden".into()
            }
        );
    }

    #[test]
    fn test_status_error_falls_back_to_reason() {
        let err = status_error(502, Some("Bad Gateway"), "");
        assert_eq!(err.message(), "Bad Gateway");
        let err = status_error(500, None, "upstream reset");
        assert_eq!(err.message(), "upstream reset");
    }
}
