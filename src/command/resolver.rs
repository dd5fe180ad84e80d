//! Variable resolution - reconciles spoken slots with remembered session values

use crate::core::types::{SessionState, Slots, Variable};

/// Looks up variables from the current turn's slots, then the session
///
/// A value spoken this turn always wins over one remembered from an
/// earlier turn. Empty strings count as absent at every step.
#[derive(Debug, Clone, Copy)]
pub struct VariableResolver<'a> {
    slots: &'a Slots,
    session: &'a SessionState,
}

impl<'a> VariableResolver<'a> {
    pub fn new(slots: &'a Slots, session: &'a SessionState) -> Self {
        Self { slots, session }
    }

    /// Resolve a variable with no fallback
    pub fn resolve(&self, variable: Variable) -> Option<&'a str> {
        self.resolve_with(variable, None)
    }

    /// Resolve a variable, falling back to `fallback`
    pub fn resolve_or<'b>(&self, variable: Variable, fallback: &'b str) -> &'b str
    where
        'a: 'b,
    {
        self.resolve(variable).unwrap_or(fallback)
    }

    pub fn resolve_with<'b>(&self, variable: Variable, fallback: Option<&'b str>) -> Option<&'b str>
    where
        'a: 'b,
    {
        let key = variable.key();
        tracing::debug!(
            "Getting variable: [{}], from slots: [{}] and session: [{}]",
            key,
            self.slots.keys().collect::<Vec<_>>().join(" "),
            self.session.keys().collect::<Vec<_>>().join(" ")
        );

        non_empty(self.slots.get(key))
            .or_else(|| non_empty(self.session.get(key)))
            .or_else(|| non_empty(fallback))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Resolve `variable` from slots, then session, then `fallback`
pub fn resolve<'a>(
    variable: Variable,
    slots: &'a Slots,
    session: &'a SessionState,
    fallback: Option<&'a str>,
) -> Option<&'a str> {
    VariableResolver::new(slots, session).resolve_with(variable, fallback)
}
