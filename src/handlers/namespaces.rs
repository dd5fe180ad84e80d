//! Namespace handlers: list, create, and switch the conversation's namespace

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use super::{spoken_list, ClusterHandler, IntentHandler, SpeechResponse};
use crate::cluster::{ClusterApi, ResourceKind};
use crate::command::resolver::resolve;
use crate::command::{select_best_match, FilterSet};
use crate::core::types::{SessionState, Slots, Variable};

pub const GET_NAMESPACES: &str = "GetNamespaces";
pub const CREATE_NAMESPACE: &str = "CreateNamespace";
pub const SWITCH_TO_NAMESPACE: &str = "SwitchToNamespace";

fn namespace_handler(cluster: Arc<dyn ClusterApi>) -> ClusterHandler {
    let kind = cluster.flavor().namespace_kind();
    ClusterHandler::new(cluster, kind, FilterSet::CLUSTER_SCOPED)
}

/// Lists namespaces (projects on OpenShift)
pub struct GetNamespaces {
    base: ClusterHandler,
}

impl GetNamespaces {
    pub fn create(cluster: Arc<dyn ClusterApi>) -> Box<dyn IntentHandler> {
        Box::new(Self {
            base: namespace_handler(cluster),
        })
    }
}

#[async_trait]
impl IntentHandler for GetNamespaces {
    fn intent_name(&self) -> &'static str {
        GET_NAMESPACES
    }

    async fn handle(&self, slots: &Slots, session: &mut SessionState) -> SpeechResponse {
        let action = self.action();
        let ctx = self.base.context(slots, session);

        if let Some(spoken) = ctx.spoken(Variable::Name) {
            tracing::info!("Looking up namespace {}", spoken);
            return match self.base.get(ctx).await {
                Ok(Some(namespace)) => {
                    SpeechResponse::reply(&action, format!("Namespace {} exists.", namespace.name))
                }
                Ok(None) => {
                    SpeechResponse::reply(&action, format!("No namespace named {} found.", spoken))
                }
                Err(e) => SpeechResponse::failure(&action, e.message()),
            };
        }

        tracing::info!("Listing all namespaces.");
        match self.base.list(ctx).await {
            Ok((_, items)) if items.is_empty() => {
                SpeechResponse::reply(&action, "No namespaces found.")
            }
            Ok((_, items)) => SpeechResponse::reply(
                &action,
                format!("The available namespaces are: {}", spoken_list(&items)),
            ),
            Err(e) => {
                tracing::warn!("Listing namespaces failed: {}", e);
                SpeechResponse::failure(&action, e.message())
            }
        }
    }
}

/// Creates the namespace named by slot or session
pub struct CreateNamespace {
    cluster: Arc<dyn ClusterApi>,
}

impl CreateNamespace {
    pub fn create(cluster: Arc<dyn ClusterApi>) -> Box<dyn IntentHandler> {
        Box::new(Self { cluster })
    }
}

#[async_trait]
impl IntentHandler for CreateNamespace {
    fn intent_name(&self) -> &'static str {
        CREATE_NAMESPACE
    }

    async fn handle(&self, slots: &Slots, session: &mut SessionState) -> SpeechResponse {
        let action = self.action();
        let namespace = match resolve(Variable::Namespace, slots, session, None) {
            Some(namespace) => namespace.to_string(),
            None => {
                return SpeechResponse::failure(
                    &action,
                    "Namespace needs to be specified either via intent slots, or via session attributes.",
                )
            }
        };

        tracing::info!("Create namespace: {}", namespace);
        let manifest = json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": namespace },
        });
        match self.cluster.create(ResourceKind::Namespace, manifest).await {
            Ok(()) => SpeechResponse::reply(
                &action,
                format!("Successfully created namespace {}", namespace),
            ),
            Err(e) => {
                tracing::warn!("Creating namespace {} failed: {}", namespace, e);
                SpeechResponse::failure(&action, e.message())
            }
        }
    }
}

/// Remembers a namespace in the session for the following turns
pub struct SwitchToNamespace {
    cluster: Arc<dyn ClusterApi>,
}

impl SwitchToNamespace {
    pub fn create(cluster: Arc<dyn ClusterApi>) -> Box<dyn IntentHandler> {
        Box::new(Self { cluster })
    }
}

#[async_trait]
impl IntentHandler for SwitchToNamespace {
    fn intent_name(&self) -> &'static str {
        SWITCH_TO_NAMESPACE
    }

    async fn handle(&self, slots: &Slots, session: &mut SessionState) -> SpeechResponse {
        let action = self.action();
        // The namespace as it was heard
        let Some(spoken) = resolve(Variable::Namespace, slots, session, None).map(String::from) else {
            return SpeechResponse::failure(
                &action,
                "Sorry, didn't understand which namespace you want me to use.",
            );
        };

        let namespaces = match self.cluster.list_namespaces().await {
            Ok(namespaces) => namespaces,
            Err(e) => {
                tracing::warn!("Listing namespaces failed: {}", e);
                return SpeechResponse::failure(&action, e.message());
            }
        };

        // The namespace as it exists on the cluster
        match select_best_match(&namespaces, &spoken) {
            Some(namespace) => {
                tracing::info!("Switching to namespace: {}", namespace);
                session.set(Variable::Namespace.key(), namespace);
                SpeechResponse::reply(&action, format!("Now using namespace {}", namespace))
            }
            None => {
                tracing::info!("No namespace resembles {}", spoken);
                SpeechResponse::reply(&action, "No namespaces found.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::memory::{Fixture, FixtureObject, InMemoryCluster};
    use crate::cluster::ClusterFlavor;

    fn cluster() -> Arc<dyn ClusterApi> {
        Arc::new(InMemoryCluster::new(Fixture {
            namespaces: vec![
                FixtureObject::new("default"),
                FixtureObject::new("payments").label("team", "fin"),
                FixtureObject::new("monitoring"),
            ],
            ..Fixture::default()
        }))
    }

    #[tokio::test]
    async fn test_get_namespaces_lists_all() {
        let handler = GetNamespaces::create(cluster());
        let response = handler.handle(&Slots::new(), &mut SessionState::new()).await;
        assert_eq!(
            response.spoken_text,
            "The available namespaces are: default,payments,monitoring"
        );
    }

    #[tokio::test]
    async fn test_get_namespaces_honours_session_labels() {
        let handler = GetNamespaces::create(cluster());
        let mut session: SessionState = [("Labels", "team")].into_iter().collect();
        let response = handler.handle(&Slots::new(), &mut session).await;
        assert_eq!(response.spoken_text, "The available namespaces are: payments");
    }

    #[tokio::test]
    async fn test_get_namespaces_describes_spoken_name_only() {
        let handler = GetNamespaces::create(cluster());
        let slots: Slots = [("Name", "payment")].into_iter().collect();
        let response = handler.handle(&slots, &mut SessionState::new()).await;
        assert_eq!(response.spoken_text, "Namespace payments exists.");

        let mut session: SessionState = [("Name", "payments")].into_iter().collect();
        let response = handler.handle(&Slots::new(), &mut session).await;
        assert_eq!(
            response.spoken_text,
            "The available namespaces are: default,payments,monitoring"
        );
    }

    #[tokio::test]
    async fn test_get_namespaces_on_openshift_lists_projects() {
        let cluster: Arc<dyn ClusterApi> = Arc::new(InMemoryCluster::new(Fixture {
            flavor: ClusterFlavor::OpenShift,
            projects: vec![FixtureObject::new("myproject")],
            ..Fixture::default()
        }));
        let response = GetNamespaces::create(cluster)
            .handle(&Slots::new(), &mut SessionState::new())
            .await;
        assert_eq!(response.spoken_text, "The available namespaces are: myproject");
    }

    #[tokio::test]
    async fn test_create_namespace_requires_a_name() {
        let handler = CreateNamespace::create(cluster());
        let response = handler.handle(&Slots::new(), &mut SessionState::new()).await;
        assert!(response.spoken_text.starts_with("Failed to Create Namespace!"));
    }

    #[tokio::test]
    async fn test_create_namespace_uses_exact_spoken_name() {
        let cluster = cluster();
        let handler = CreateNamespace::create(cluster.clone());
        let slots: Slots = [("Namespace", "paymentz")].into_iter().collect();
        let response = handler.handle(&slots, &mut SessionState::new()).await;
        assert_eq!(response.spoken_text, "Successfully created namespace paymentz");
        assert!(cluster
            .list_namespaces()
            .await
            .unwrap()
            .contains(&"paymentz".to_string()));
    }

    #[tokio::test]
    async fn test_create_existing_namespace_reports_failure() {
        let handler = CreateNamespace::create(cluster());
        let slots: Slots = [("Namespace", "payments")].into_iter().collect();
        let response = handler.handle(&slots, &mut SessionState::new()).await;
        assert_eq!(
            response.spoken_text,
            "Failed to Create Namespace! namespaces \"payments\" already exists"
        );
    }

    #[tokio::test]
    async fn test_switch_records_matched_namespace() {
        let handler = SwitchToNamespace::create(cluster());
        let slots: Slots = [("Namespace", "monitorin")].into_iter().collect();
        let mut session = SessionState::new();
        let response = handler.handle(&slots, &mut session).await;
        assert_eq!(response.spoken_text, "Now using namespace monitoring");
        assert_eq!(session.get("Namespace"), Some("monitoring"));
    }

    #[tokio::test]
    async fn test_switch_without_match_leaves_session() {
        let handler = SwitchToNamespace::create(cluster());
        let slots: Slots = [("Namespace", "kube-system")].into_iter().collect();
        let mut session: SessionState = [("Namespace", "payments")].into_iter().collect();
        let response = handler.handle(&slots, &mut session).await;
        assert_eq!(response.spoken_text, "No namespaces found.");
        assert_eq!(session.get("Namespace"), Some("payments"));
    }

    #[tokio::test]
    async fn test_create_then_switch_on_openshift() {
        let cluster: Arc<dyn ClusterApi> = Arc::new(InMemoryCluster::new(Fixture {
            flavor: ClusterFlavor::OpenShift,
            default_namespace: "myproject".into(),
            projects: vec![FixtureObject::new("myproject")],
            ..Fixture::default()
        }));
        let slots: Slots = [("Namespace", "staging")].into_iter().collect();
        let mut session = SessionState::new();

        let response = CreateNamespace::create(cluster.clone())
            .handle(&slots, &mut session)
            .await;
        assert_eq!(response.spoken_text, "Successfully created namespace staging");

        let response = SwitchToNamespace::create(cluster)
            .handle(&slots, &mut session)
            .await;
        assert_eq!(response.spoken_text, "Now using namespace staging");
        assert_eq!(session.get("Namespace"), Some("staging"));
    }

    #[tokio::test]
    async fn test_switch_without_namespace() {
        let handler = SwitchToNamespace::create(cluster());
        let response = handler.handle(&Slots::new(), &mut SessionState::new()).await;
        assert_eq!(
            response.spoken_text,
            "Failed to Switch To Namespace! Sorry, didn't understand which namespace you want me to use."
        );
    }
}
