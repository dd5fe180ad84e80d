//! Intent resolution pipeline
//!
//! Turns slots and session state into a narrowed cluster query:
//! Slots + Session -> VariableResolver -> OperationContext -> Filters -> Query

pub mod context;
pub mod filter;
pub mod fuzzy;
pub mod resolver;

pub use context::OperationContext;
pub use filter::{apply_filters, Filter, FilterSet};
pub use fuzzy::{rank_candidates, select_best_match, NameMatch};
pub use resolver::VariableResolver;
