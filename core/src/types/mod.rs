//! Typed desired-state specs, normalized remote records and the uniform
//! reconcile result.

pub mod config;
pub mod connection_string;
pub mod database;
pub mod health;
pub mod index;
pub mod node;
pub mod result;
pub mod tls;
pub mod topology;
