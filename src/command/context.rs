//! Operation context - the inputs a filter may consult plus the query so far

use crate::cluster::{ClusterApi, ClusterError, Query};
use crate::command::filter::{apply_filters, Filter};
use crate::command::resolver::VariableResolver;
use crate::core::types::{SessionState, Slots, Variable};

/// Slots, session and cluster handle bundled with the query being narrowed
///
/// Filters consume a context and return a new one; the only thing that
/// ever changes between contexts is the query.
#[derive(Clone)]
pub struct OperationContext<'a> {
    slots: &'a Slots,
    session: &'a SessionState,
    query: Query,
    cluster: &'a dyn ClusterApi,
}

impl<'a> OperationContext<'a> {
    pub fn new(
        slots: &'a Slots,
        session: &'a SessionState,
        query: Query,
        cluster: &'a dyn ClusterApi,
    ) -> Self {
        Self {
            slots,
            session,
            query,
            cluster,
        }
    }

    pub fn slots(&self) -> &'a Slots {
        self.slots
    }

    pub fn session(&self) -> &'a SessionState {
        self.session
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn cluster(&self) -> &'a dyn ClusterApi {
        self.cluster
    }

    pub fn resolver(&self) -> VariableResolver<'a> {
        VariableResolver::new(self.slots, self.session)
    }

    /// The slot value if present, else the session attribute
    pub fn variable(&self, variable: Variable) -> Option<&'a str> {
        self.resolver().resolve(variable)
    }

    /// The slot value only; empty slots count as absent
    pub fn spoken(&self, variable: Variable) -> Option<&'a str> {
        self.slots.get(variable.key()).filter(|value| !value.is_empty())
    }

    pub fn variable_or<'b>(&self, variable: Variable, fallback: &'b str) -> &'b str
    where
        'a: 'b,
    {
        self.resolver().resolve_or(variable, fallback)
    }

    /// Same inputs, different query
    pub fn with_query(self, query: Query) -> Self {
        Self { query, ..self }
    }

    pub fn into_query(self) -> Query {
        self.query
    }

    /// Apply `filters` left to right and return the narrowed query
    pub async fn narrowed(self, filters: &[Filter]) -> Result<Query, ClusterError> {
        Ok(apply_filters(self, filters).await?.into_query())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::memory::{Fixture, InMemoryCluster};
    use crate::cluster::ResourceKind;

    #[test]
    fn test_with_query_keeps_inputs() {
        let cluster = InMemoryCluster::new(Fixture::default());
        let slots: Slots = [("Name", "web")].into_iter().collect();
        let session: SessionState = [("Namespace", "team-a")].into_iter().collect();

        let ctx = OperationContext::new(
            &slots,
            &session,
            Query::new(ResourceKind::Service),
            &cluster,
        );
        let narrowed = ctx
            .clone()
            .with_query(ctx.query().clone().in_namespace("team-a"));

        assert_eq!(ctx.query(), &Query::new(ResourceKind::Service));
        assert_eq!(narrowed.query().namespace(), Some("team-a"));
        assert_eq!(narrowed.variable(Variable::Name), Some("web"));
        assert_eq!(narrowed.variable(Variable::Namespace), Some("team-a"));
        assert_eq!(narrowed.variable_or(Variable::Labels, "none"), "none");
    }
}
