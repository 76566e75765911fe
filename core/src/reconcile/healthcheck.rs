//! Sequenced node health checks.
//!
//! The runner executes the selected waits in a fixed order and stops at the
//! first failure. It never mutates anything, so results always carry
//! `changed = false`.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::convergence::retry::{RetryOutcome, RetryPolicy};
use crate::infrastructure::{ClusterApi, NodeProbe};
use crate::monitor::health;
use crate::types::health::{HealthCheck, HealthCheckSpec, OnTimeout};
use crate::types::result::ReconcileResult;
use crate::validation::is_ip_host;

const IP_CERT_WARNING: &str =
    "validate_certificate automatically disabled for IP host (NodeAlive/ClusterConnectivity).";

/// Certificate validation to use for the alive and connectivity probes.
/// An IP-literal host cannot match a hostname certificate, so validation is
/// switched off there and a warning returned.
pub fn effective_validate_certificate(spec: &HealthCheckSpec) -> (bool, Vec<String>) {
    if spec.validate_certificate && is_ip_host(&spec.url) {
        (false, vec![IP_CERT_WARNING.to_string()])
    } else {
        (spec.validate_certificate, Vec::new())
    }
}

pub struct HealthCheckRunner<'a> {
    probe: &'a dyn NodeProbe,
    cluster: &'a dyn ClusterApi,
}

impl<'a> HealthCheckRunner<'a> {
    /// `probe` talks to the node under test; `cluster` is only read to find
    /// that node's tag.
    pub fn new(probe: &'a dyn NodeProbe, cluster: &'a dyn ClusterApi) -> Self {
        HealthCheckRunner { probe, cluster }
    }

    pub fn run(&self, spec: &HealthCheckSpec) -> ReconcileResult {
        let (_, warnings) = effective_validate_certificate(spec);
        for w in &warnings {
            warn!(url = %spec.url, "{}", w);
        }

        if spec.wants(HealthCheck::NodeDatabasesOnline) && is_ip_host(&spec.url) {
            return ReconcileResult::error("db_online requires a node hostname URL (not an IP).");
        }

        let policy = match RetryPolicy::new(spec.max_wait, spec.retry_interval) {
            Ok(p) => p,
            Err(e) => return e.into(),
        };

        let mut results = Map::new();
        let mut summary: Vec<String> = Vec::new();

        let finish = |result: ReconcileResult, results: Map<String, Value>| {
            let result = result.with_extra("results", Value::Object(results));
            if warnings.is_empty() {
                result
            } else {
                result.with_extra("warnings", warnings.clone())
            }
        };

        if spec.wants(HealthCheck::NodeAlive) {
            let outcome = health::wait_for_node_alive(self.probe, &policy);
            record(&mut results, HealthCheck::NodeAlive, &outcome);
            if !outcome.ok {
                let msg = format!("node_alive failed: {}", outcome.error_text());
                return finish(ReconcileResult::error(msg), results);
            }
            summary.push(ok_line(HealthCheck::NodeAlive, &outcome));
        }

        if spec.wants(HealthCheck::ClusterConnectivity) {
            let outcome = health::wait_for_cluster_connectivity(self.probe, &policy, None, None);
            record(&mut results, HealthCheck::ClusterConnectivity, &outcome);
            if !outcome.ok {
                let msg = format!("cluster_connectivity failed: {}", outcome.error_text());
                return finish(ReconcileResult::error(msg), results);
            }
            summary.push(ok_line(HealthCheck::ClusterConnectivity, &outcome));
        }

        if spec.wants(HealthCheck::NodeDatabasesOnline) {
            let db_policy = match RetryPolicy::new(spec.max_wait, spec.db_retry_interval) {
                Ok(p) => p,
                Err(e) => return finish(e.into(), results),
            };
            let excluded = self
                .cluster
                .cluster_topology()
                .ok()
                .and_then(|t| t.tag_for_url(&spec.url));
            let outcome =
                health::wait_for_node_databases_online(self.probe, &db_policy, excluded.as_deref());
            record(&mut results, HealthCheck::NodeDatabasesOnline, &outcome);

            if outcome.ok {
                summary.push(ok_line(HealthCheck::NodeDatabasesOnline, &outcome));
            } else if outcome.is_timeout() && spec.on_db_timeout == OnTimeout::Continue {
                warn!(url = %spec.url, attempts = outcome.attempts, "databases not online in time; continuing");
                summary.push(format!(
                    "node_databases_online TIMEOUT (excluded:{} attempts:{})",
                    excluded.as_deref().unwrap_or("?"),
                    outcome.attempts
                ));
            } else {
                let reason = if outcome.is_timeout() { "timeout" } else { outcome.error_text() };
                let msg = format!("node_databases_online failed: {}", reason);
                return finish(ReconcileResult::error(msg), results);
            }
        }

        let msg = if summary.is_empty() {
            "No checks selected.".to_string()
        } else {
            summary.join("; ")
        };
        info!(url = %spec.url, summary = %msg, "health checks passed");
        finish(ReconcileResult::ok(msg, false), results)
    }
}

fn record(results: &mut Map<String, Value>, check: HealthCheck, outcome: &RetryOutcome) {
    results.insert(
        check.key().to_string(),
        serde_json::to_value(outcome).unwrap_or(Value::Null),
    );
}

fn ok_line(check: HealthCheck, outcome: &RetryOutcome) -> String {
    format!("{} OK (attempts:{})", check.key(), outcome.attempts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
