//! Remote cluster backends.
//!
//! `ClusterApi` is the admin surface the reconcilers mutate through;
//! `NodeProbe` is the read-only diagnostic surface the health checks poll.
//! `http::HttpClient` implements both against a live server, and
//! `mock::MockCluster` is an in-memory cluster for tests. Responses are
//! normalized into typed records inside the implementations, so callers
//! never see the server's shape variations.

pub mod http;
pub mod mock;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::Result;
use crate::types::connection_string::{ConnectionStringInventory, ConnectionStringKind};
use crate::types::database::{CreateDatabase, DatabaseRecord, DeleteOptions};
use crate::types::health::{DatabaseInfo, PeerPing};
use crate::types::index::{IndexDefinition, IndexRunningStatus, IndexState, IndexStatusChange};
use crate::types::node::NodeType;
use crate::types::topology::ClusterTopology;

/// Admin operations against one server (usually the leader).
pub trait ClusterApi {
    // --- cluster ---

    fn cluster_topology(&self) -> Result<ClusterTopology>;

    fn add_node(&mut self, tag: &str, url: &str, node_type: NodeType) -> Result<()>;

    // --- databases ---

    fn list_databases(&self) -> Result<Vec<String>>;

    fn database_record(&self, name: &str) -> Result<DatabaseRecord>;

    fn create_database(&mut self, request: &CreateDatabase) -> Result<()>;

    fn delete_database(&mut self, name: &str, options: &DeleteOptions) -> Result<()>;

    fn add_database_node(&mut self, name: &str, tag: &str) -> Result<()>;

    fn database_settings(&self, name: &str) -> Result<BTreeMap<String, String>>;

    fn put_database_settings(&mut self, name: &str, settings: &BTreeMap<String, String>) -> Result<()>;

    fn set_database_disabled(&mut self, name: &str, disabled: bool) -> Result<()>;

    // --- encryption keys ---

    fn generate_secret(&self) -> Result<String>;

    fn distribute_secret(&mut self, name: &str, key: &str, tags: &[String]) -> Result<()>;

    // --- indexes ---

    fn index_definitions(&self, db: &str) -> Result<Vec<IndexDefinition>>;

    fn put_index(&mut self, db: &str, definition: &IndexDefinition) -> Result<()>;

    fn delete_index(&mut self, db: &str, name: &str) -> Result<()>;

    fn index_state(&self, db: &str, name: &str) -> Result<IndexState>;

    fn index_running_status(&self, db: &str, name: &str) -> Result<IndexRunningStatus>;

    fn set_index_status(
        &mut self,
        db: &str,
        name: &str,
        change: IndexStatusChange,
        cluster_wide: bool,
    ) -> Result<()>;

    // --- connection strings ---

    /// Product version string, e.g. `"7.1.2"`.
    fn server_version(&self) -> Result<String>;

    fn connection_strings(&self, db: &str) -> Result<ConnectionStringInventory>;

    /// `payload` is the full server object, `Name` and `Type` included.
    fn put_connection_string(&mut self, db: &str, kind: ConnectionStringKind, payload: &Value) -> Result<()>;

    fn remove_connection_string(&mut self, db: &str, kind: ConnectionStringKind, name: &str) -> Result<()>;
}

/// Diagnostic endpoints of a single node.
pub trait NodeProbe {
    /// `Ok` on a 2xx from the liveness endpoint.
    fn setup_alive(&self) -> Result<()>;

    fn node_ping(&self, peer_url: Option<&str>, node_tag: Option<&str>) -> Result<Vec<PeerPing>>;

    fn database_inventory(&self) -> Result<Vec<DatabaseInfo>>;
}
