//! Filters that narrow an operation's query from resolved variables
//!
//! Each filter resolves one variable; when it has no value (or nothing on
//! the cluster is close enough) the context passes through untouched.

use crate::cluster::ClusterError;
use crate::command::context::OperationContext;
use crate::command::fuzzy::select_best_match;
use crate::core::types::Variable;

/// One narrowing step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Fuzzy-match the spoken name against what the current query lists
    Name,
    /// Fuzzy-match the spoken namespace against the cluster's namespaces
    Namespace,
    /// Require every label key remembered in the session
    Label,
}

/// Filter sequences a handler applies to its get and list operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSet {
    pub get: &'static [Filter],
    pub list: &'static [Filter],
}

impl FilterSet {
    /// Namespaced resources. Namespace runs before Name so the name
    /// candidates come from the narrowed collection.
    pub const NAMESPACED: FilterSet = FilterSet {
        get: &[Filter::Namespace, Filter::Name],
        list: &[Filter::Namespace, Filter::Label],
    };

    /// Namespaces (or projects) themselves
    pub const CLUSTER_SCOPED: FilterSet = FilterSet {
        get: &[Filter::Name],
        list: &[Filter::Label],
    };
}

impl Filter {
    pub async fn apply<'a>(
        self,
        ctx: OperationContext<'a>,
    ) -> Result<OperationContext<'a>, ClusterError> {
        match self {
            Filter::Name => name_filter(ctx).await,
            Filter::Namespace => namespace_filter(ctx).await,
            Filter::Label => Ok(label_filter(ctx)),
        }
    }
}

/// Left fold of `filters` over `ctx`
pub async fn apply_filters<'a>(
    ctx: OperationContext<'a>,
    filters: &[Filter],
) -> Result<OperationContext<'a>, ClusterError> {
    let mut ctx = ctx;
    for filter in filters {
        ctx = filter.apply(ctx).await?;
    }
    Ok(ctx)
}

async fn name_filter(ctx: OperationContext<'_>) -> Result<OperationContext<'_>, ClusterError> {
    let Some(spoken) = ctx.variable(Variable::Name) else {
        return Ok(ctx);
    };

    let names: Vec<String> = ctx
        .cluster()
        .list(ctx.query())
        .await?
        .into_iter()
        .map(|summary| summary.name)
        .collect();

    match select_best_match(&names, spoken) {
        Some(name) => {
            let query = ctx.query().clone().with_name(name);
            Ok(ctx.with_query(query))
        }
        None => Ok(ctx),
    }
}

async fn namespace_filter(
    ctx: OperationContext<'_>,
) -> Result<OperationContext<'_>, ClusterError> {
    let Some(spoken) = ctx.variable(Variable::Namespace) else {
        return Ok(ctx);
    };

    let namespaces = ctx.cluster().list_namespaces().await?;
    match select_best_match(&namespaces, spoken) {
        Some(namespace) => {
            let query = ctx.query().clone().in_namespace(namespace);
            Ok(ctx.with_query(query))
        }
        None => Ok(ctx),
    }
}

/// Labels are exact keys, read from the session only
fn label_filter(ctx: OperationContext<'_>) -> OperationContext<'_> {
    let Some(labels) = ctx.session().get(Variable::Labels.key()) else {
        return ctx;
    };

    let mut query = ctx.query().clone();
    for label in labels.split(',').map(str::trim).filter(|l| !l.is_empty()) {
        query = query.with_label(label);
    }
    ctx.with_query(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::memory::{Fixture, FixtureObject, InMemoryCluster};
    use crate::cluster::{Query, ResourceKind};
    use crate::core::types::{SessionState, Slots};

    fn cluster() -> InMemoryCluster {
        InMemoryCluster::new(Fixture {
            namespaces: vec![
                FixtureObject::new("default"),
                FixtureObject::new("team-alpha"),
            ],
            services: vec![
                FixtureObject::new("frontend"),
                FixtureObject::new("database").in_namespace("team-alpha"),
            ],
            ..Fixture::default()
        })
    }

    #[tokio::test]
    async fn test_name_filter_identity_without_name() {
        let cluster = cluster();
        let (slots, session) = (Slots::new(), SessionState::new());
        let query = Query::new(ResourceKind::Service);
        let ctx = OperationContext::new(&slots, &session, query.clone(), &cluster);

        let ctx = Filter::Name.apply(ctx).await.unwrap();
        assert_eq!(ctx.query(), &query);
    }

    #[tokio::test]
    async fn test_namespace_filter_identity_without_namespace() {
        let cluster = cluster();
        let (slots, session) = (Slots::new(), SessionState::new());
        let query = Query::new(ResourceKind::Service).with_label("app");
        let ctx = OperationContext::new(&slots, &session, query.clone(), &cluster);

        let ctx = Filter::Namespace.apply(ctx).await.unwrap();
        assert_eq!(ctx.query(), &query);
    }

    #[tokio::test]
    async fn test_name_filter_narrows_to_matched_name() {
        let cluster = cluster();
        let slots: Slots = [("Name", "frontent")].into_iter().collect();
        let session = SessionState::new();
        let ctx = OperationContext::new(&slots, &session, Query::new(ResourceKind::Service), &cluster);

        let ctx = Filter::Name.apply(ctx).await.unwrap();
        assert_eq!(ctx.query().name(), Some("frontend"));
    }

    #[tokio::test]
    async fn test_name_filter_without_match_is_identity() {
        let cluster = cluster();
        let slots: Slots = [("Name", "zookeeper")].into_iter().collect();
        let session = SessionState::new();
        let query = Query::new(ResourceKind::Service);
        let ctx = OperationContext::new(&slots, &session, query.clone(), &cluster);

        let ctx = Filter::Name.apply(ctx).await.unwrap();
        assert_eq!(ctx.query(), &query);
    }

    #[tokio::test]
    async fn test_namespace_then_name_uses_narrowed_candidates() {
        let cluster = cluster();
        let slots: Slots = [("Namespace", "team-alfa"), ("Name", "databse")]
            .into_iter()
            .collect();
        let session = SessionState::new();
        let ctx = OperationContext::new(&slots, &session, Query::new(ResourceKind::Service), &cluster);

        let query = ctx.narrowed(FilterSet::NAMESPACED.get).await.unwrap();
        assert_eq!(query.namespace(), Some("team-alpha"));
        assert_eq!(query.name(), Some("database"));
    }

    #[tokio::test]
    async fn test_label_filter_reads_session_only() {
        let cluster = cluster();
        let slots: Slots = [("Labels", "ignored")].into_iter().collect();
        let session: SessionState = [("Labels", "app, tier,,")].into_iter().collect();
        let ctx = OperationContext::new(&slots, &session, Query::new(ResourceKind::Service), &cluster);

        let ctx = Filter::Label.apply(ctx).await.unwrap();
        assert_eq!(ctx.query().labels(), &["app".to_string(), "tier".to_string()]);
    }

    #[tokio::test]
    async fn test_filter_propagates_cluster_failure() {
        let cluster = InMemoryCluster::new(Fixture {
            fail_with: Some("connection refused".into()),
            ..Fixture::default()
        });
        let slots: Slots = [("Namespace", "team-a")].into_iter().collect();
        let session = SessionState::new();
        let ctx = OperationContext::new(&slots, &session, Query::new(ResourceKind::Service), &cluster);

        let err = apply_filters(ctx, &[Filter::Namespace]).await.err().unwrap();
        assert_eq!(err.message(), "connection refused");
    }
}
