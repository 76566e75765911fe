//! Convergence engine: diffs desired vs actual state and polls until the
//! cluster reflects it.
//!
//! `topology` normalizes server topology shapes and computes membership
//! deltas, `planner` diffs settings and index definitions, and `retry`
//! provides the bounded-time poll loop every wait is built on.

pub mod planner;
pub mod retry;
pub mod topology;
