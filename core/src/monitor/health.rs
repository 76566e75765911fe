//! Health predicates over a node's diagnostic endpoints.
//!
//! Each `check_*` function is one poll attempt returning a [`Poll`]; the
//! matching `wait_for_*` drives it through [`retry_until`]. Probe errors are
//! pending, never fatal: a node that refuses connections may simply be
//! starting. The only fatal signal is a database that failed to load.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::convergence::retry::{retry_until, Poll, RetryOutcome, RetryPolicy};
use crate::error::{classify_load_error, ErrorClass};
use crate::infrastructure::NodeProbe;
use crate::types::health::DatabaseInfo;

pub const DATABASE_LOAD_ERROR: &str = "database_load_error";

// ---------------------------------------------------------------------------
// Node alive
// ---------------------------------------------------------------------------

pub fn check_node_alive(probe: &dyn NodeProbe) -> Poll {
    match probe.setup_alive() {
        Ok(()) => Poll::Ready(json!({"alive": true})),
        Err(e) => Poll::pending(e.to_string()),
    }
}

pub fn wait_for_node_alive(probe: &dyn NodeProbe, policy: &RetryPolicy) -> RetryOutcome {
    retry_until(policy, || check_node_alive(probe))
}

// ---------------------------------------------------------------------------
// Cluster connectivity
// ---------------------------------------------------------------------------

/// Every peer in the ping report must be reachable; an empty report fails.
pub fn check_cluster_connectivity(
    probe: &dyn NodeProbe,
    peer_url: Option<&str>,
    node_tag: Option<&str>,
) -> Poll {
    let peers = match probe.node_ping(peer_url, node_tag) {
        Ok(peers) => peers,
        Err(e) => return Poll::pending(e.to_string()),
    };
    if peers.is_empty() {
        return Poll::pending("missing/empty 'Result'");
    }
    if let Some(bad) = peers.iter().find(|p| p.has_error()) {
        return Poll::Pending(json!({
            "peer": bad.url,
            "setup_alive_error": bad.setup_alive_error,
            "tcp_info_error": bad.tcp_info_error,
        }));
    }
    Poll::Ready(json!({"peers": peers.len()}))
}

pub fn wait_for_cluster_connectivity(
    probe: &dyn NodeProbe,
    policy: &RetryPolicy,
    peer_url: Option<&str>,
    node_tag: Option<&str>,
) -> RetryOutcome {
    retry_until(policy, || check_cluster_connectivity(probe, peer_url, node_tag))
}

// ---------------------------------------------------------------------------
// Databases online
// ---------------------------------------------------------------------------

/// Whether one database has a usable copy on some node other than `excluded`.
///
/// Disabled and single-replica databases are skipped (ready). A load error
/// outside the loading/not-responding allow-list on any node is fatal.
pub fn database_online(info: &DatabaseInfo, excluded: Option<&str>) -> Poll {
    if info.disabled {
        return Poll::Ready(json!({"skipped": "disabled"}));
    }
    if info.replication_factor == Some(1) {
        return Poll::Ready(json!({"skipped": "rf=1"}));
    }

    let tags: BTreeSet<String> = info.topology.all_tags();
    if tags.is_empty() {
        return Poll::Ready(json!({
            "members": [],
            "excluded": excluded,
            "note": "no members/promotables/rehabs",
        }));
    }

    for (node, status) in &info.topology.status {
        if let Some(error) = &status.last_error {
            if classify_load_error(error) == ErrorClass::Fatal {
                warn!(db = %info.name, node = %node, error = %error, "database failed to load");
                return Poll::fatal(
                    DATABASE_LOAD_ERROR,
                    json!({"db": info.name, "node": node, "error": error}),
                );
            }
        }
    }

    let ok_on: Vec<&String> = tags
        .iter()
        .filter(|t| Some(t.as_str()) != excluded)
        .filter(|t| info.topology.status.get(*t).is_some_and(|s| s.is_ok()))
        .collect();

    if ok_on.is_empty() {
        Poll::Pending(json!({
            "members": tags,
            "excluded": excluded,
            "reason": "no usable member with LastStatus==Ok (or only excluded tag)",
        }))
    } else {
        Poll::Ready(json!({"members": tags, "excluded": excluded, "ok_on": ok_on}))
    }
}

/// One pass over the node's inventory. Fatal on the first load error.
pub fn check_databases_online(probe: &dyn NodeProbe, excluded: Option<&str>) -> Poll {
    let inventory = match probe.database_inventory() {
        Ok(inventory) => inventory,
        Err(e) => return Poll::pending(format!("failed to list databases: {}", e)),
    };

    let mut failing = Map::new();
    for info in &inventory {
        match database_online(info, excluded) {
            Poll::Ready(_) => {}
            Poll::Pending(detail) => {
                failing.insert(info.name.clone(), detail);
            }
            fatal @ Poll::Fatal { .. } => return fatal,
        }
    }

    if failing.is_empty() {
        Poll::Ready(json!({"checked": inventory.len()}))
    } else {
        debug!(failing = failing.len(), "databases not yet online");
        Poll::Pending(json!({ "failing": Value::Object(failing) }))
    }
}

pub fn wait_for_node_databases_online(
    probe: &dyn NodeProbe,
    policy: &RetryPolicy,
    excluded: Option<&str>,
) -> RetryOutcome {
    retry_until(policy, || check_databases_online(probe, excluded))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::error::ConvergeError;
    use crate::infrastructure::mock::MockCluster;
    use crate::types::health::PeerPing;
    use crate::types::topology::{NodeStatus, TopologySnapshot};

    fn fast(max_wait_ms: u64) -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(max_wait_ms), Duration::from_millis(5)).unwrap()
    }

    fn status(last: &str, err: Option<&str>) -> NodeStatus {
        NodeStatus {
            last_status: last.into(),
            last_error: err.map(String::from),
        }
    }

    fn info(name: &str, rf: Option<u32>, nodes: &[(&str, NodeStatus)]) -> DatabaseInfo {
        let mut topology = TopologySnapshot::default();
        for (tag, st) in nodes {
            topology.members.insert(tag.to_string());
            topology.status.insert(tag.to_string(), st.clone());
        }
        DatabaseInfo {
            name: name.into(),
            disabled: false,
            replication_factor: rf,
            topology,
        }
    }

    #[test]
    fn alive_after_transient_failure() {
        let mock = MockCluster::new("http://a:8080");
        mock.script_alive(vec![
            Err(ConvergeError::Http { status: 503, body: "starting".into() }),
            Ok(()),
        ]);
        let out = wait_for_node_alive(&mock, &fast(1000));
        assert!(out.ok);
        assert_eq!(out.attempts, 2);
    }

    #[test]
    fn alive_timeout_reports_http_detail() {
        let mock = MockCluster::new("http://a:8080");
        let down = || Err(ConvergeError::Http { status: 503, body: "x".repeat(300) });
        mock.script_alive((0..50).map(|_| down()).collect());
        let out = wait_for_node_alive(&mock, &fast(20));
        assert!(out.is_timeout());
        let text = out.error_text();
        assert!(text.starts_with("HTTP 503 ("));
        assert_eq!(text.len(), "HTTP 503 ()".len() + 200);
    }

    #[test]
    fn connectivity_empty_result_is_pending() {
        let mock = MockCluster::new("http://a:8080");
        mock.script_ping(vec![Ok(vec![])]);
        assert_eq!(
            check_cluster_connectivity(&mock, None, None),
            Poll::pending("missing/empty 'Result'")
        );
    }

    #[test]
    fn connectivity_peer_error_is_pending_with_detail() {
        let mock = MockCluster::new("http://a:8080");
        mock.script_ping(vec![Ok(vec![
            PeerPing { url: "http://b:8080".into(), ..Default::default() },
            PeerPing {
                url: "http://c:8080".into(),
                setup_alive_error: None,
                tcp_info_error: Some("connection reset".into()),
            },
        ])]);
        match check_cluster_connectivity(&mock, Some("http://c:8080"), Some("C")) {
            Poll::Pending(d) => {
                assert_eq!(d["peer"], "http://c:8080");
                assert_eq!(d["tcp_info_error"], "connection reset");
            }
            other => panic!("expected pending, got {:?}", other),
        }
    }

    #[test]
    fn connectivity_ready_counts_peers() {
        let mock = MockCluster::new("http://a:8080");
        assert_eq!(
            check_cluster_connectivity(&mock, None, None),
            Poll::Ready(json!({"peers": 1}))
        );
    }

    #[test]
    fn skips_disabled_and_single_replica() {
        let mut db = info("orders", Some(2), &[("A", status("Loading", None))]);
        db.disabled = true;
        assert_eq!(database_online(&db, None), Poll::Ready(json!({"skipped": "disabled"})));
        let single = info("orders", Some(1), &[("A", status("Error", Some("boom")))]);
        assert_eq!(database_online(&single, None), Poll::Ready(json!({"skipped": "rf=1"})));
    }

    #[test]
    fn no_members_counts_as_online() {
        assert!(matches!(database_online(&info("empty", Some(2), &[]), Some("A")), Poll::Ready(_)));
    }

    #[test]
    fn excluded_tag_does_not_count() {
        let db = info("orders", Some(2), &[("A", status("Ok", None)), ("B", status("Loading", None))]);
        assert!(matches!(database_online(&db, Some("A")), Poll::Pending(_)));
        assert!(matches!(database_online(&db, Some("B")), Poll::Ready(_)));
        assert!(matches!(database_online(&db, None), Poll::Ready(_)));
    }

    #[test]
    fn loading_errors_are_not_fatal() {
        let db = info(
            "orders",
            Some(2),
            &[
                ("A", status("Ok", None)),
                ("B", status("Error", Some("Database 'orders' (Status: Loading)"))),
                ("C", status("Error", Some("Node C not responding"))),
            ],
        );
        assert!(matches!(database_online(&db, Some("C")), Poll::Ready(_)));
    }

    #[test]
    fn real_load_error_is_fatal() {
        let db = info(
            "orders",
            Some(2),
            &[("A", status("Ok", None)), ("B", status("Error", Some("Unable to open journal")))],
        );
        match database_online(&db, None) {
            Poll::Fatal { reason, detail } => {
                assert_eq!(reason, DATABASE_LOAD_ERROR);
                assert_eq!(detail, json!({"db": "orders", "node": "B", "error": "Unable to open journal"}));
            }
            other => panic!("expected fatal, got {:?}", other),
        }
    }

    #[test]
    fn aggregate_collects_failing() {
        let mock = MockCluster::new("http://a:8080");
        mock.script_inventory(vec![Ok(vec![
            info("ok", Some(2), &[("A", status("Ok", None)), ("B", status("Ok", None))]),
            info("pending", Some(2), &[("B", status("Loading", None))]),
        ])]);
        match check_databases_online(&mock, Some("A")) {
            Poll::Pending(d) => {
                let failing = d["failing"].as_object().unwrap();
                assert_eq!(failing.keys().collect::<Vec<_>>(), vec!["pending"]);
            }
            other => panic!("expected pending, got {:?}", other),
        }
    }

    #[test]
    fn aggregate_ready_reports_count() {
        let mock = MockCluster::new("http://a:8080");
        mock.script_inventory(vec![Ok(vec![
            info("one", Some(1), &[]),
            info("two", Some(2), &[("B", status("ok", None))]),
        ])]);
        assert_eq!(check_databases_online(&mock, Some("A")), Poll::Ready(json!({"checked": 2})));
    }

    #[test]
    fn inventory_error_is_pending() {
        let mock = MockCluster::new("http://a:8080");
        mock.script_inventory(vec![Err(ConvergeError::Http { status: 500, body: String::new() })]);
        assert_eq!(
            check_databases_online(&mock, None),
            Poll::pending("failed to list databases: HTTP 500")
        );
    }

    #[test]
    fn fatal_short_circuits_wait() {
        let mock = MockCluster::new("http://a:8080");
        let broken = info("orders", Some(2), &[("A", status("Error", Some("corrupted file")))]);
        mock.script_inventory(vec![Ok(vec![broken])]);
        let policy = RetryPolicy::new(Duration::from_secs(30), Duration::from_secs(10)).unwrap();
        let started = Instant::now();
        let out = wait_for_node_databases_online(&mock, &policy, Some("B"));
        assert!(out.fatal);
        assert_eq!(out.attempts, 1);
        assert_eq!(out.error_text(), DATABASE_LOAD_ERROR);
        assert_eq!(mock.probe_calls(), 1);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
