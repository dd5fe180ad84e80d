//! Skill configuration
//!
//! Values come from an optional TOML file and are then overridden by
//! environment variables, so a container can be configured with either.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::cluster::ClusterFlavor;
use crate::core::error::{Result, SkillError};

/// Environment variable holding the accepted application IDs (comma separated)
pub const SKILL_ID_ENV_VAR: &str = "ALEXA_SKILL_ID";

const IN_CLUSTER_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const IN_CLUSTER_CA_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Top-level configuration for the skill process
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SkillConfig {
    // === PLATFORM ===
    /// Application IDs allowed to invoke the skill
    ///
    /// Requests carrying any other ID are rejected before dispatch.
    pub accepted_application_ids: Vec<String>,

    /// Address the HTTP endpoint listens on
    pub bind: String,

    /// `tracing_subscriber` filter directive
    pub log_filter: String,

    // === CLUSTER ===
    pub cluster: ClusterConfig,
}

/// Connection settings for the Kubernetes/OpenShift API server
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Base URL of the API server, e.g. `https://10.0.0.1:6443`
    pub api_url: Option<String>,

    /// Bearer token. Takes precedence over `token_file`.
    pub token: Option<String>,

    pub token_file: Option<PathBuf>,

    /// Namespace used when neither slot nor session names one
    pub namespace: String,

    /// PEM bundle used to verify the API server certificate
    pub ca_file: Option<PathBuf>,

    pub accept_invalid_certs: bool,

    /// Cluster flavor. Detected from the API server when unset.
    pub flavor: Option<ClusterFlavor>,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            accepted_application_ids: Vec::new(),
            bind: "127.0.0.1:8080".into(),
            log_filter: "kube_voice=info".into(),
            cluster: ClusterConfig::default(),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            token: None,
            token_file: None,
            namespace: "default".into(),
            ca_file: None,
            accept_invalid_certs: false,
            flavor: None,
        }
    }
}

impl SkillConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from an optional TOML file, then apply the
    /// process environment on top and validate the result.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate().map_err(SkillError::Config)?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Override fields from environment variables
    ///
    /// The lookup is injected so tests do not touch the process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ids) = lookup(SKILL_ID_ENV_VAR) {
            self.accepted_application_ids = ids
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(bind) = lookup("KUBE_VOICE_BIND") {
            self.bind = bind;
        }
        if let Some(filter) = lookup("KUBE_VOICE_LOG") {
            self.log_filter = filter;
        }

        let cluster = &mut self.cluster;
        if let Some(url) = lookup("KUBERNETES_API_URL") {
            cluster.api_url = Some(url);
        } else if cluster.api_url.is_none() {
            // In-cluster service discovery
            if let (Some(host), Some(port)) = (
                lookup("KUBERNETES_SERVICE_HOST"),
                lookup("KUBERNETES_SERVICE_PORT"),
            ) {
                cluster.api_url = Some(format!("https://{}:{}", host, port));
                if cluster.token_file.is_none() {
                    cluster.token_file = Some(PathBuf::from(IN_CLUSTER_TOKEN_FILE));
                }
                if cluster.ca_file.is_none() {
                    cluster.ca_file = Some(PathBuf::from(IN_CLUSTER_CA_FILE));
                }
            }
        }
        if let Some(token) = lookup("KUBERNETES_TOKEN") {
            cluster.token = Some(token);
        }
        if let Some(namespace) = lookup("KUBERNETES_NAMESPACE") {
            cluster.namespace = namespace;
        }
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.bind
            .parse::<SocketAddr>()
            .map_err(|e| format!("bind ({}) is not a socket address: {}", self.bind, e))?;

        if self.cluster.namespace.trim().is_empty() {
            return Err("cluster.namespace must not be empty".into());
        }

        if let Some(url) = &self.cluster.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(format!("cluster.api_url ({}) must be an http(s) URL", url));
            }
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .map_err(|e| SkillError::Config(format!("invalid bind address {}: {}", self.bind, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = SkillConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.cluster.namespace, "default");
    }

    #[test]
    fn test_skill_ids_split_on_commas() {
        let mut config = SkillConfig::new();
        config.apply_env(env(&[(SKILL_ID_ENV_VAR, "amzn1.ask.skill.a, amzn1.ask.skill.b,")]));
        assert_eq!(
            config.accepted_application_ids,
            vec!["amzn1.ask.skill.a".to_string(), "amzn1.ask.skill.b".to_string()]
        );
    }

    #[test]
    fn test_in_cluster_discovery() {
        let mut config = SkillConfig::new();
        config.apply_env(env(&[
            ("KUBERNETES_SERVICE_HOST", "10.0.0.1"),
            ("KUBERNETES_SERVICE_PORT", "443"),
        ]));
        assert_eq!(config.cluster.api_url.as_deref(), Some("https://10.0.0.1:443"));
        assert_eq!(
            config.cluster.token_file.as_deref(),
            Some(Path::new(IN_CLUSTER_TOKEN_FILE))
        );
    }

    #[test]
    fn test_explicit_api_url_wins_over_discovery() {
        let mut config = SkillConfig::new();
        config.apply_env(env(&[
            ("KUBERNETES_API_URL", "https://api.example.com:6443"),
            ("KUBERNETES_SERVICE_HOST", "10.0.0.1"),
            ("KUBERNETES_SERVICE_PORT", "443"),
        ]));
        assert_eq!(
            config.cluster.api_url.as_deref(),
            Some("https://api.example.com:6443")
        );
        assert!(config.cluster.token_file.is_none());
    }

    #[test]
    fn test_toml_parsing_with_partial_tables() {
        let config: SkillConfig = toml::from_str(
            r#"
            accepted_application_ids = ["amzn1.ask.skill.x"]

            [cluster]
            api_url = "https://api.example.com:6443"
            namespace = "team-a"
            flavor = "openshift"
            "#,
        )
        .unwrap();
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.cluster.namespace, "team-a");
        assert_eq!(config.cluster.flavor, Some(ClusterFlavor::OpenShift));
    }

    #[test]
    fn test_validate_rejects_bad_bind() {
        let config = SkillConfig {
            bind: "not-an-address".into(),
            ..SkillConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let mut config = SkillConfig::new();
        config.cluster.api_url = Some("ftp://cluster".into());
        assert!(config.validate().is_err());
    }
}
