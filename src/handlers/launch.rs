//! Launch handler - greets the user and reports workload readiness

use async_trait::async_trait;
use std::sync::Arc;

use super::response::CARD_TITLE;
use super::{IntentHandler, SpeechResponse};
use crate::cluster::feedback::{failed_events_of, normalize};
use crate::cluster::{ClusterApi, ClusterError, Query, ResourceSummary};
use crate::command::VariableResolver;
use crate::core::types::{SessionState, Slots, Variable};

pub const LAUNCH: &str = "Launch";

const WELCOME_CARD: &str = "Welcome to Kubernetes skill";

/// Answers the no-intent launch event
pub struct Launch {
    cluster: Arc<dyn ClusterApi>,
}

impl Launch {
    pub fn create(cluster: Arc<dyn ClusterApi>) -> Box<dyn IntentHandler> {
        Box::new(Self { cluster })
    }

    /// Readiness report for the workloads in `namespace`
    ///
    /// Only a failed workload listing drops the report. A failed event
    /// lookup leaves that workload without a reason.
    async fn report(&self, namespace: &str) -> Result<String, ClusterError> {
        let kind = self.cluster.flavor().workload_kind();
        let all = self
            .cluster
            .list(&Query::new(kind).in_namespace(namespace))
            .await?;
        let pending: Vec<&ResourceSummary> = all.iter().filter(|w| !w.ready).collect();

        let mut report = readiness_summary(all.len(), all.len() - pending.len());
        if pending.is_empty() {
            return Ok(report);
        }

        report.push_str(&format!("Failed {} are: ", kind.plural()));
        for workload in pending {
            report.push_str(&workload.name);
            match failed_events_of(self.cluster.as_ref(), workload).await {
                Ok(events) => {
                    if let Some(first) = events.first() {
                        report.push_str(&format!(", due to {}", normalize(first).trim()));
                    }
                }
                Err(e) => {
                    tracing::warn!("No failure reason for {}: {}", workload.name, e);
                }
            }
            report.push_str(". ");
        }
        Ok(report)
    }
}

/// "Your namespace has T deployments. " plus how many are in desired state
fn readiness_summary(total: usize, ready: usize) -> String {
    let state = if ready == 0 {
        "None in desired state. ".to_string()
    } else if ready == total {
        "All in desired state. ".to_string()
    } else {
        format!("{} in desired state and {} pending. ", ready, total - ready)
    };
    format!("Your namespace has {} deployments. {}", total, state)
}

#[async_trait]
impl IntentHandler for Launch {
    fn intent_name(&self) -> &'static str {
        LAUNCH
    }

    async fn handle(&self, slots: &Slots, session: &mut SessionState) -> SpeechResponse {
        let namespace = VariableResolver::new(slots, session)
            .resolve_or(Variable::Namespace, self.cluster.default_namespace())
            .to_string();

        let welcome = format!(
            "Welcome to {}. You are currently using namespace {}.",
            self.cluster.flavor().spoken_name(),
            namespace
        );

        let report = match self.report(&namespace).await {
            Ok(report) => report,
            Err(e) => {
                tracing::warn!("Skipping workload report for {}: {}", namespace, e);
                String::new()
            }
        };

        SpeechResponse {
            spoken_text: format!("{} {}", welcome, report).trim_end().to_string(),
            reprompt_text: Some(welcome),
            card_title: Some(CARD_TITLE.to_string()),
            card_body: Some(WELCOME_CARD.to_string()),
            should_end_session: false,
        }
    }
}
