//! Node health monitoring.
//!
//! The `health` module holds the poll predicates (node alive, peer
//! connectivity, databases online) and their bounded waits.

pub mod health;
