use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::topology::TopologySnapshot;

/// One peer entry of the node ping diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PeerPing {
    pub url: String,
    pub setup_alive_error: Option<String>,
    pub tcp_info_error: Option<String>,
}

impl PeerPing {
    pub fn has_error(&self) -> bool {
        let set = |e: &Option<String>| e.as_deref().is_some_and(|s| !s.trim().is_empty());
        set(&self.setup_alive_error) || set(&self.tcp_info_error)
    }
}

/// One database entry of the server inventory.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatabaseInfo {
    pub name: String,
    pub disabled: bool,
    pub replication_factor: Option<u32>,
    pub topology: TopologySnapshot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthCheck {
    NodeAlive,
    ClusterConnectivity,
    NodeDatabasesOnline,
}

impl HealthCheck {
    pub fn key(&self) -> &'static str {
        match self {
            HealthCheck::NodeAlive => "node_alive",
            HealthCheck::ClusterConnectivity => "cluster_connectivity",
            HealthCheck::NodeDatabasesOnline => "node_databases_online",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnTimeout {
    #[default]
    Fail,
    Continue,
}

/// What the health-check runner should verify against one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckSpec {
    pub url: String,
    pub checks: Vec<HealthCheck>,
    pub max_wait: Duration,
    pub retry_interval: Duration,
    pub db_retry_interval: Duration,
    pub on_db_timeout: OnTimeout,
    pub validate_certificate: bool,
}

impl HealthCheckSpec {
    pub fn new(url: &str, checks: Vec<HealthCheck>) -> Self {
        HealthCheckSpec {
            url: url.to_string(),
            checks,
            max_wait: Duration::from_secs(300),
            retry_interval: Duration::from_secs(5),
            db_retry_interval: Duration::from_secs(5),
            on_db_timeout: OnTimeout::Fail,
            validate_certificate: true,
        }
    }

    pub fn wants(&self, check: HealthCheck) -> bool {
        self.checks.contains(&check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_error_detection() {
        let clean = PeerPing { url: "http://b".into(), ..Default::default() };
        assert!(!clean.has_error());
        let blank = PeerPing { setup_alive_error: Some(" ".into()), ..clean.clone() };
        assert!(!blank.has_error());
        let tcp = PeerPing { tcp_info_error: Some("refused".into()), ..clean };
        assert!(tcp.has_error());
    }

    #[test]
    fn check_keys_match_serde_names() {
        for check in [
            HealthCheck::NodeAlive,
            HealthCheck::ClusterConnectivity,
            HealthCheck::NodeDatabasesOnline,
        ] {
            let json = serde_json::to_string(&check).unwrap();
            assert_eq!(json, format!("\"{}\"", check.key()));
        }
    }
}
