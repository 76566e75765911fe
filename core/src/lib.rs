//! Converge: drives a document-database cluster toward a declared state.
//!
//! Every operation reads the current cluster state, computes the minimal
//! delta, applies it (unless in dry-run), and polls until multi-node effects
//! become visible. Results are reported as a uniform [`ReconcileResult`].
//!
//! # Modules
//!
//! - [`convergence`]: Poll/retry loop, topology extraction, desired-vs-actual diffs
//! - [`infrastructure`]: Cluster API traits, HTTP client, in-memory mock cluster
//! - [`monitor`]: Health predicates and bounded waits
//! - [`reconcile`]: Node, database, connection-string, index reconcilers and the health-check runner
//! - [`types`]: Specs, normalized records, the YAML manifest
//!
//! [`ReconcileResult`]: types::result::ReconcileResult

pub mod convergence;
pub mod error;
pub mod infrastructure;
pub mod messages;
pub mod monitor;
pub mod reconcile;
pub mod secrets;
pub mod types;
pub mod validation;
