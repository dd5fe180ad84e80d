//! Failure feedback for workloads that are not ready
//!
//! Finds the pods behind a workload, collects their `Failed` events and
//! trims the event messages into something worth reading aloud.

use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use super::{ClusterApi, ClusterError, Query, ResourceKind, ResourceSummary};

/// A Kubernetes `LabelSelector` as found on Deployments
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSelector {
    #[serde(default)]
    pub match_labels: BTreeMap<String, String>,
    #[serde(default)]
    pub match_expressions: Vec<LabelRequirement>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabelRequirement {
    pub key: String,
    pub operator: String,
    #[serde(default)]
    pub values: Vec<String>,
}

impl LabelSelector {
    /// Convert into label selector terms
    ///
    /// Unknown operators are skipped.
    pub fn to_terms(&self) -> Vec<String> {
        let mut terms: Vec<String> = self
            .match_labels
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();

        for req in &self.match_expressions {
            match req.operator.as_str() {
                "In" => terms.push(format!("{} in ({})", req.key, req.values.join(","))),
                "NotIn" => terms.push(format!("{} notin ({})", req.key, req.values.join(","))),
                "Exists" => terms.push(req.key.clone()),
                "DoesNotExist" => terms.push(format!("!{}", req.key)),
                _ => {}
            }
        }
        terms
    }
}

/// Selector locating the pods rolled out by a DeploymentConfig
pub fn deployment_config_pod_selector(name: &str) -> Vec<String> {
    vec![format!("deploymentconfig={}", name)]
}

/// The pods belonging to a workload
pub async fn pods_of(
    cluster: &dyn ClusterApi,
    workload: &ResourceSummary,
) -> Result<Vec<ResourceSummary>, ClusterError> {
    let Some(terms) = &workload.pod_selector else {
        return Ok(Vec::new());
    };

    let mut query = Query::new(ResourceKind::Pod);
    if let Some(namespace) = &workload.namespace {
        query = query.in_namespace(namespace.clone());
    }
    for term in terms {
        query = query.with_label(term.clone());
    }
    cluster.list(&query).await
}

/// Messages of every `Failed` event on the workload's pods
pub async fn failed_events_of(
    cluster: &dyn ClusterApi,
    workload: &ResourceSummary,
) -> Result<Vec<String>, ClusterError> {
    let mut messages = Vec::new();
    for pod in pods_of(cluster, workload).await? {
        messages.extend(cluster.failed_events(&pod).await?);
    }
    Ok(messages)
}

/// Strip image digests and parenthesised detail from an event message
pub fn normalize(message: &str) -> String {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            Regex::new(r"@sha256:[a-zA-Z0-9]*").expect("digest pattern"),
            Regex::new(r"details: \([^)]*\)").expect("details pattern"),
            Regex::new(r"\([^)]*\)").expect("parenthesis pattern"),
        ]
    });

    let mut result = message.to_string();
    for pattern in patterns {
        result = pattern.replace_all(&result, "").into_owned();
    }
    result
}
