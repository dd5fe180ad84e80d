//! Handlers that list a namespaced resource collection

use async_trait::async_trait;
use std::sync::Arc;

use super::{spoken_list, ClusterHandler, IntentHandler, SpeechResponse};
use crate::cluster::{ClusterApi, ClusterFlavor, ResourceKind};
use crate::command::{FilterSet, OperationContext};
use crate::core::types::{SessionState, Slots, Variable};

pub const GET_DEPLOYMENTS: &str = "GetDeployments";
pub const GET_DEPLOYMENT_CONFIGS: &str = "GetDeploymentConfigs";
pub const GET_SERVICES: &str = "GetServices";

/// Lists one kind of namespaced resource, or describes a single one when
/// the user names it.
pub struct ListResources {
    intent: &'static str,
    base: ClusterHandler,
    openshift_only: bool,
    mention_namespace: bool,
}

impl ListResources {
    fn new(
        intent: &'static str,
        cluster: Arc<dyn ClusterApi>,
        kind: ResourceKind,
    ) -> Self {
        Self {
            intent,
            base: ClusterHandler::new(cluster, kind, FilterSet::NAMESPACED),
            openshift_only: false,
            mention_namespace: false,
        }
    }

    pub fn deployments(cluster: Arc<dyn ClusterApi>) -> Box<dyn IntentHandler> {
        Box::new(Self::new(GET_DEPLOYMENTS, cluster, ResourceKind::Deployment))
    }

    pub fn deployment_configs(cluster: Arc<dyn ClusterApi>) -> Box<dyn IntentHandler> {
        Box::new(Self {
            openshift_only: true,
            ..Self::new(GET_DEPLOYMENT_CONFIGS, cluster, ResourceKind::DeploymentConfig)
        })
    }

    pub fn services(cluster: Arc<dyn ClusterApi>) -> Box<dyn IntentHandler> {
        Box::new(Self {
            mention_namespace: true,
            ..Self::new(GET_SERVICES, cluster, ResourceKind::Service)
        })
    }

    async fn describe(&self, ctx: OperationContext<'_>, spoken: &str) -> SpeechResponse {
        let action = self.action();
        let kind = self.base.kind();
        tracing::info!("Describing {} {}", kind.singular(), spoken);

        match self.base.get(ctx).await {
            Ok(Some(item)) => {
                let namespace = item
                    .namespace
                    .as_deref()
                    .unwrap_or(self.base.cluster().default_namespace());
                let text = match kind {
                    ResourceKind::Deployment | ResourceKind::DeploymentConfig => format!(
                        "The {} {} in namespace {} is {}.",
                        kind.singular(),
                        item.name,
                        namespace,
                        if item.ready { "ready" } else { "not ready" }
                    ),
                    _ => format!(
                        "The {} {} exists in namespace {}.",
                        kind.singular(),
                        item.name,
                        namespace
                    ),
                };
                SpeechResponse::reply(&action, text)
            }
            Ok(None) => SpeechResponse::reply(
                &action,
                format!("No {} named {} found.", kind.singular(), spoken),
            ),
            Err(e) => {
                tracing::warn!("{} failed: {}", self.intent, e);
                SpeechResponse::failure(&action, e.message())
            }
        }
    }
}

#[async_trait]
impl IntentHandler for ListResources {
    fn intent_name(&self) -> &'static str {
        self.intent
    }

    async fn handle(&self, slots: &Slots, session: &mut SessionState) -> SpeechResponse {
        let action = self.action();
        let cluster = self.base.cluster();
        if self.openshift_only && cluster.flavor() != ClusterFlavor::OpenShift {
            return SpeechResponse::failure(&action, "Your cluster is not Openshift!");
        }

        let ctx = self.base.context(slots, session);
        if let Some(spoken) = ctx.spoken(Variable::Name) {
            return self.describe(ctx, spoken).await;
        }

        let plural = self.base.kind().plural();
        tracing::info!(
            "Listing all {} for namespace: {}",
            plural,
            ctx.variable_or(Variable::Namespace, cluster.default_namespace())
        );

        match self.base.list(ctx).await {
            Ok((query, items)) => {
                let namespace = query.namespace().unwrap_or(cluster.default_namespace());
                let text = match (items.is_empty(), self.mention_namespace) {
                    (true, false) => format!("No {} found.", plural),
                    (true, true) => format!("No {} found in namespace {}", plural, namespace),
                    (false, false) => {
                        format!("The available {} are: {}", plural, spoken_list(&items))
                    }
                    (false, true) => format!(
                        "The available {} in namespace {} are: {}",
                        plural,
                        namespace,
                        spoken_list(&items)
                    ),
                };
                SpeechResponse::reply(&action, text)
            }
            Err(e) => {
                tracing::warn!("{} failed: {}", self.intent, e);
                SpeechResponse::failure(&action, e.message())
            }
        }
    }
}
