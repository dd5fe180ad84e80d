//! Voice platform boundary
//!
//! Decodes Alexa skill requests, rejects callers whose application ID is
//! not accepted, and serves the dispatcher over HTTP.

pub mod envelope;
pub mod server;

use std::collections::HashSet;

use crate::core::error::{Result, SkillError};

pub use envelope::{SkillRequest, SkillResponse};
pub use server::{router, AppState};

/// Accepts requests only from the configured application IDs
#[derive(Debug, Clone, Default)]
pub struct ApplicationGate {
    accepted: HashSet<String>,
}

impl ApplicationGate {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// A missing ID is never accepted
    pub fn verify(&self, application_id: Option<&str>) -> Result<()> {
        match application_id {
            Some(id) if self.accepted.contains(id) => Ok(()),
            other => {
                let id = other.unwrap_or("<missing>").to_string();
                tracing::warn!("Rejecting request from application {}", id);
                Err(SkillError::UnknownApplication(id))
            }
        }
    }
}
