//! Intent handlers
//!
//! One handler per recognized intent. Every handler ends in a
//! [`SpeechResponse`]: backing-system failures become spoken failure
//! notices here and never travel further up.

pub mod launch;
pub mod namespaces;
pub mod resources;
pub mod response;

use async_trait::async_trait;
use std::sync::Arc;

use crate::cluster::{ClusterApi, ClusterError, Query, ResourceKind, ResourceSummary};
use crate::command::{FilterSet, OperationContext};
use crate::core::types::{SessionState, Slots};

pub use launch::Launch;
pub use namespaces::{CreateNamespace, GetNamespaces, SwitchToNamespace};
pub use resources::ListResources;
pub use response::{action_phrase, SpeechResponse};

/// Turns one recognized intent into a spoken response
#[async_trait]
pub trait IntentHandler: Send + Sync {
    fn intent_name(&self) -> &'static str;

    /// Handle the turn. May record values in `session` for later turns.
    async fn handle(&self, slots: &Slots, session: &mut SessionState) -> SpeechResponse;

    /// Action wording used on cards and in failure notices
    fn action(&self) -> String {
        action_phrase(self.intent_name())
    }
}

/// Builds a handler bound to the shared cluster handle
pub type HandlerFactory = fn(Arc<dyn ClusterApi>) -> Box<dyn IntentHandler>;

/// State shared by handlers that query one resource collection
pub struct ClusterHandler {
    cluster: Arc<dyn ClusterApi>,
    kind: ResourceKind,
    filters: FilterSet,
}

impl ClusterHandler {
    pub fn new(cluster: Arc<dyn ClusterApi>, kind: ResourceKind, filters: FilterSet) -> Self {
        Self {
            cluster,
            kind,
            filters,
        }
    }

    pub fn cluster(&self) -> &dyn ClusterApi {
        self.cluster.as_ref()
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// A fresh context over the unfiltered collection
    pub fn context<'a>(&'a self, slots: &'a Slots, session: &'a SessionState) -> OperationContext<'a> {
        OperationContext::new(slots, session, Query::new(self.kind), self.cluster())
    }

    /// List through the handler's list filters
    pub async fn list(
        &self,
        ctx: OperationContext<'_>,
    ) -> Result<(Query, Vec<ResourceSummary>), ClusterError> {
        let query = ctx.narrowed(self.filters.list).await?;
        let items = self.cluster.list(&query).await?;
        Ok((query, items))
    }

    /// Fetch a single object through the handler's get filters
    ///
    /// Returns `None` unless the filters pinned an exact name.
    pub async fn get(
        &self,
        ctx: OperationContext<'_>,
    ) -> Result<Option<ResourceSummary>, ClusterError> {
        let query = ctx.narrowed(self.filters.get).await?;
        if query.name().is_none() {
            return Ok(None);
        }
        Ok(self.cluster.list(&query).await?.into_iter().next())
    }
}

/// Names joined the way they are read out
pub(crate) fn spoken_list(items: &[ResourceSummary]) -> String {
    items
        .iter()
        .map(|item| item.name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}
