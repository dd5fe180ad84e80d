//! Kube Voice - voice commands for Kubernetes and OpenShift clusters
//!
//! Resolves spoken intents against a live cluster: slot and session values
//! are reconciled, fuzzily matched to real resource names, folded into a
//! query, and the result is turned back into speech.

pub mod cluster;
pub mod command;
pub mod core;
pub mod dispatch;
pub mod handlers;
pub mod platform;
