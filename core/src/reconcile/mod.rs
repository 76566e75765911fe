//! Reconcilers: one per resource kind, each converging a single spec.
//!
//! All of them take a dry-run flag and return a `ReconcileResult`; no
//! error escapes a reconciler call.

pub mod connection_string;
pub mod database;
pub mod healthcheck;
pub mod index;
pub mod node;

pub use connection_string::ConnectionStringReconciler;
pub use database::DatabaseReconciler;
pub use healthcheck::{effective_validate_certificate, HealthCheckRunner};
pub use index::IndexReconciler;
pub use node::NodeReconciler;
