use thiserror::Error;

use crate::cluster::ClusterError;

#[derive(Error, Debug)]
pub enum SkillError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No handler registered for reserved intent: {0}")]
    MissingHandler(String),

    #[error("Application ID not accepted: {0}")]
    UnknownApplication(String),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SkillError>;
