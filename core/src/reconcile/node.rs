//! Cluster membership of a single node.

use serde_json::json;
use tracing::{info, warn};

use crate::convergence::retry::{retry_until, Poll, RetryPolicy};
use crate::error::ErrorClass;
use crate::infrastructure::ClusterApi;
use crate::messages as msg;
use crate::types::node::NodeSpec;
use crate::types::result::ReconcileResult;

/// Adds nodes to the cluster the `api` (the leader) belongs to.
pub struct NodeReconciler<'a> {
    api: &'a mut dyn ClusterApi,
    confirm: Option<RetryPolicy>,
}

impl<'a> NodeReconciler<'a> {
    pub fn new(api: &'a mut dyn ClusterApi) -> Self {
        NodeReconciler { api, confirm: None }
    }

    /// After a successful add, poll the topology until the node shows up.
    pub fn with_confirmation(mut self, policy: RetryPolicy) -> Self {
        self.confirm = Some(policy);
        self
    }

    pub fn ensure_present(&mut self, spec: &NodeSpec, check_mode: bool) -> ReconcileResult {
        let topology = match self.api.cluster_topology() {
            Ok(t) => t,
            Err(e) => return ReconcileResult::error(format!("Failed to fetch cluster topology: {}", e)),
        };

        if let Some(node) = topology.find(spec.tag(), spec.url()) {
            return ReconcileResult::ok(msg::node_already_present(&node.tag, node.role, &node.url), false)
                .with_extra("role", node.role.to_string())
                .with_extra("url", node.url.clone());
        }

        if check_mode {
            return ReconcileResult::ok(msg::node_would_add(spec.tag(), spec.node_type()), true);
        }

        if let Err(e) = self.api.add_node(spec.tag(), spec.url(), spec.node_type()) {
            if e.class() == ErrorClass::BenignConflict {
                warn!(tag = spec.tag(), error = %e, "node already in topology");
                return ReconcileResult::ok(msg::node_already_member(spec.tag()), false);
            }
            return ReconcileResult::error(msg::failed_add_node(spec.tag(), &e.to_string()));
        }
        info!(tag = spec.tag(), url = spec.url(), node_type = %spec.node_type(), "node added");

        if let Some(policy) = self.confirm {
            let api = &*self.api;
            let outcome = retry_until(&policy, || match api.cluster_topology() {
                Ok(t) if t.find(spec.tag(), spec.url()).is_some() => Poll::Ready(json!({"tag": spec.tag()})),
                Ok(_) => Poll::pending(format!("node '{}' not yet in topology", spec.tag())),
                Err(e) => Poll::pending(e.to_string()),
            });
            if !outcome.ok {
                return ReconcileResult::partial_error(
                    msg::node_not_confirmed(spec.tag(), outcome.error_text()),
                    true,
                )
                .with_extra("wait", serde_json::to_value(&outcome).unwrap_or_default());
            }
        }

        ReconcileResult::ok(msg::node_added(spec.tag(), spec.node_type()), true)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::infrastructure::mock::MockCluster;
    use crate::types::node::NodeType;

    fn spec(tag: &str, url: &str, node_type: NodeType) -> NodeSpec {
        NodeSpec::new(tag, url, "http://a:8080", node_type).unwrap()
    }

    #[test]
    fn adds_watcher_then_idempotent() {
        let mut cluster = MockCluster::new("http://a:8080");
        let spec = spec("B", "http://b:8080", NodeType::Watcher);

        let first = NodeReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(first.changed && !first.failed);
        assert_eq!(first.msg, "Node 'B' added as Watcher.");

        let second = NodeReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(!second.changed && !second.failed);
        assert_eq!(second.msg, "Node 'B' already present as Watcher at http://b:8080.");
        assert_eq!(cluster.calls, vec!["add_node:B:Watcher"]);
    }

    #[test]
    fn matches_by_url_under_another_tag() {
        let mut cluster = MockCluster::with_members("http://a:8080", &["A", "C"]);
        let spec = spec("B", "http://c:8080/", NodeType::Member);
        let result = NodeReconciler::new(&mut cluster).ensure_present(&spec, false);
        assert!(!result.changed);
        assert_eq!(result.msg, "Node 'C' already present as Member at http://c:8080.");
        assert_eq!(result.extra("role"), Some(&json!("Member")));
        assert_eq!(result.extra("url"), Some(&json!("http://c:8080")));
        assert!(!cluster.mutated());
    }

    #[test]
    fn dry_run_reports_without_mutation() {
        let mut cluster = MockCluster::new("http://a:8080");
        let result = NodeReconciler::new(&mut cluster)
            .ensure_present(&spec("B", "http://b:8080", NodeType::Member), true);
        assert!(result.changed);
        assert_eq!(result.msg, "Node 'B' would be added as Member.");
        assert!(!cluster.mutated());
    }

    #[test]
    fn already_member_race_is_noop() {
        let mut cluster = MockCluster::new("http://a:8080");
        cluster.fail_on("add_node", "Node B is already part of the topology");
        let result = NodeReconciler::new(&mut cluster)
            .ensure_present(&spec("B", "http://b:8080", NodeType::Member), false);
        assert!(!result.failed && !result.changed);
    }

    #[test]
    fn other_add_errors_fail() {
        let mut cluster = MockCluster::new("http://a:8080");
        cluster.fail_on("add_node", "Unauthorized");
        let result = NodeReconciler::new(&mut cluster)
            .ensure_present(&spec("B", "http://b:8080", NodeType::Member), false);
        assert!(result.failed);
        assert_eq!(result.msg, "Failed to add node 'B': HTTP 400 (Unauthorized)");
    }

    #[test]
    fn topology_read_failure_is_reported() {
        let mut cluster = MockCluster::new("http://a:8080");
        cluster.fail_on("cluster_topology", "leader unavailable");
        let result = NodeReconciler::new(&mut cluster)
            .ensure_present(&spec("B", "http://b:8080", NodeType::Member), false);
        assert!(result.failed);
        assert!(result.msg.starts_with("Failed to fetch cluster topology"));
    }

    #[test]
    fn confirmation_wait_succeeds_when_visible() {
        let mut cluster = MockCluster::new("http://a:8080");
        let policy = RetryPolicy::new(Duration::from_millis(50), Duration::from_millis(5)).unwrap();
        let result = NodeReconciler::new(&mut cluster)
            .with_confirmation(policy)
            .ensure_present(&spec("B", "http://b:8080", NodeType::Member), false);
        assert!(result.changed && !result.failed);
    }
}
