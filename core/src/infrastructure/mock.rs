//! In-memory cluster for testing.
//!
//! Keeps just enough server behaviour to exercise the reconcilers: a cluster
//! topology, databases with records/settings/indexes/connection strings,
//! encryption-key bookkeeping, and scripted diagnostic responses. Every mutating call is
//! recorded in `calls`, so a test can assert that dry-run issued none.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::error::{ConvergeError, Result};
use crate::types::connection_string::{ConnectionStringInventory, ConnectionStringKind};
use crate::types::database::{CreateDatabase, DatabaseRecord, DeleteOptions};
use crate::types::health::{DatabaseInfo, PeerPing};
use crate::types::index::{IndexDefinition, IndexRunningStatus, IndexState, IndexStatusChange};
use crate::types::node::NodeType;
use crate::types::topology::{ClusterTopology, NodeStatus};

use super::{ClusterApi, NodeProbe};

pub const GENERATED_KEY: &str = "bW9jay1nZW5lcmF0ZWQta2V5";

#[derive(Debug, Clone)]
pub struct MockIndex {
    pub definition: IndexDefinition,
    pub state: IndexState,
    pub running: IndexRunningStatus,
}

#[derive(Debug, Clone)]
pub struct MockDatabase {
    pub record: DatabaseRecord,
    pub replication_factor: u32,
    pub settings: BTreeMap<String, String>,
    pub indexes: BTreeMap<String, MockIndex>,
    /// Tags that hold this database's encryption key.
    pub key_holders: Vec<String>,
    /// Stored put bodies by kind, then name.
    pub connection_strings: BTreeMap<ConnectionStringKind, BTreeMap<String, Value>>,
}

/// A test-double cluster.
pub struct MockCluster {
    url: String,
    pub topology: ClusterTopology,
    pub databases: BTreeMap<String, MockDatabase>,
    pub server_version: String,
    /// Connection-string kinds this server lists.
    pub connection_string_kinds: BTreeSet<ConnectionStringKind>,
    /// Mutating calls, in order.
    pub calls: Vec<String>,
    /// Keys distributed for databases that don't exist yet.
    pending_keys: BTreeMap<String, Vec<String>>,
    /// Operation name → error body returned by every call of that operation.
    failures: BTreeMap<String, String>,
    alive_responses: RefCell<Vec<Result<()>>>,
    ping_responses: RefCell<Vec<Result<Vec<PeerPing>>>>,
    inventory_responses: RefCell<Vec<Result<Vec<DatabaseInfo>>>>,
    probe_calls: Cell<u32>,
}

impl MockCluster {
    pub fn new(url: &str) -> Self {
        MockCluster {
            url: url.to_string(),
            topology: ClusterTopology::default(),
            databases: BTreeMap::new(),
            server_version: "7.1.2".into(),
            connection_string_kinds: ConnectionStringKind::ALL.into_iter().collect(),
            calls: Vec::new(),
            pending_keys: BTreeMap::new(),
            failures: BTreeMap::new(),
            alive_responses: RefCell::new(Vec::new()),
            ping_responses: RefCell::new(Vec::new()),
            inventory_responses: RefCell::new(Vec::new()),
            probe_calls: Cell::new(0),
        }
    }

    /// A cluster whose members are `tags`, each at `http://<tag>:8080`.
    pub fn with_members(url: &str, tags: &[&str]) -> Self {
        let mut cluster = Self::new(url);
        for tag in tags {
            cluster
                .topology
                .members
                .insert(tag.to_string(), format!("http://{}:8080", tag.to_lowercase()));
        }
        cluster
    }

    /// Seed a database directly, bypassing `calls`.
    pub fn seed_database(&mut self, name: &str, members: &[&str], encrypted: bool) -> &mut MockDatabase {
        let mut record = DatabaseRecord {
            name: name.to_string(),
            encrypted,
            ..Default::default()
        };
        for tag in members {
            record.topology.members.insert(tag.to_string());
            record.topology.status.insert(
                tag.to_string(),
                NodeStatus { last_status: "Ok".into(), last_error: None },
            );
        }
        let key_holders = if encrypted {
            members.iter().map(|t| t.to_string()).collect()
        } else {
            Vec::new()
        };
        let db = MockDatabase {
            record,
            replication_factor: members.len().max(1) as u32,
            settings: BTreeMap::new(),
            indexes: BTreeMap::new(),
            key_holders,
            connection_strings: BTreeMap::new(),
        };
        match self.databases.entry(name.to_string()) {
            std::collections::btree_map::Entry::Occupied(mut e) => {
                e.insert(db);
                e.into_mut()
            }
            std::collections::btree_map::Entry::Vacant(e) => e.insert(db),
        }
    }

    /// Make every call of `operation` fail with `body`.
    pub fn fail_on(&mut self, operation: &str, body: &str) {
        self.failures.insert(operation.to_string(), body.to_string());
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    pub fn script_alive(&self, responses: Vec<Result<()>>) {
        *self.alive_responses.borrow_mut() = reversed(responses);
    }

    pub fn script_ping(&self, responses: Vec<Result<Vec<PeerPing>>>) {
        *self.ping_responses.borrow_mut() = reversed(responses);
    }

    pub fn script_inventory(&self, responses: Vec<Result<Vec<DatabaseInfo>>>) {
        *self.inventory_responses.borrow_mut() = reversed(responses);
    }

    pub fn probe_calls(&self) -> u32 {
        self.probe_calls.get()
    }

    pub fn mutated(&self) -> bool {
        !self.calls.is_empty()
    }

    fn check(&self, operation: &str) -> Result<()> {
        match self.failures.get(operation) {
            Some(body) => Err(ConvergeError::Http {
                status: 400,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }

    fn record(&mut self, call: String) {
        self.calls.push(call);
    }

    fn db(&self, name: &str) -> Result<&MockDatabase> {
        self.databases
            .get(name)
            .ok_or_else(|| ConvergeError::NotFound(format!("database '{}'", name)))
    }

    fn db_mut(&mut self, name: &str) -> Result<&mut MockDatabase> {
        self.databases
            .get_mut(name)
            .ok_or_else(|| ConvergeError::NotFound(format!("database '{}'", name)))
    }

    fn index_mut(&mut self, db: &str, name: &str) -> Result<&mut MockIndex> {
        self.db_mut(db)?
            .indexes
            .get_mut(name)
            .ok_or_else(|| ConvergeError::NotFound(format!("index '{}'", name)))
    }

    fn index(&self, db: &str, name: &str) -> Result<&MockIndex> {
        self.db(db)?
            .indexes
            .get(name)
            .ok_or_else(|| ConvergeError::NotFound(format!("index '{}'", name)))
    }
}

fn reversed<T>(mut v: Vec<T>) -> Vec<T> {
    v.reverse();
    v
}

impl ClusterApi for MockCluster {
    fn cluster_topology(&self) -> Result<ClusterTopology> {
        self.check("cluster_topology")?;
        Ok(self.topology.clone())
    }

    fn add_node(&mut self, tag: &str, url: &str, node_type: NodeType) -> Result<()> {
        self.check("add_node")?;
        if self.topology.find(tag, url).is_some() {
            return Err(ConvergeError::Http {
                status: 400,
                body: format!("Node '{}' is already part of the topology", tag),
            });
        }
        let group = match node_type {
            NodeType::Member => &mut self.topology.members,
            NodeType::Watcher => &mut self.topology.watchers,
        };
        group.insert(tag.to_string(), url.to_string());
        self.record(format!("add_node:{}:{}", tag, node_type));
        Ok(())
    }

    fn list_databases(&self) -> Result<Vec<String>> {
        self.check("list_databases")?;
        Ok(self.databases.keys().cloned().collect())
    }

    fn database_record(&self, name: &str) -> Result<DatabaseRecord> {
        self.check("database_record")?;
        Ok(self.db(name)?.record.clone())
    }

    fn create_database(&mut self, request: &CreateDatabase) -> Result<()> {
        self.check("create_database")?;
        if self.databases.contains_key(&request.name) {
            return Err(ConvergeError::Http {
                status: 409,
                body: format!("Database '{}' already exists!", request.name),
            });
        }
        let members: Vec<String> = if request.members.is_empty() {
            let mut tags = self.topology.all_tags();
            if tags.is_empty() {
                tags.push("A".into());
            }
            tags.into_iter().take(request.replication_factor as usize).collect()
        } else {
            request.members.clone()
        };
        if request.encrypted {
            let pending = self.pending_keys.get(&request.name).cloned().unwrap_or_default();
            if let Some(missing) = members.iter().find(|t| !pending.contains(t)) {
                return Err(ConvergeError::Http {
                    status: 400,
                    body: format!("Node {} has no encryption key for '{}'", missing, request.name),
                });
            }
        }
        let tag_refs: Vec<&str> = members.iter().map(String::as_str).collect();
        let key_holders = self.pending_keys.remove(&request.name).unwrap_or_default();
        let db = self.seed_database(&request.name, &tag_refs, request.encrypted);
        db.replication_factor = request.replication_factor;
        db.key_holders = key_holders;
        self.record(format!("create_database:{}", request.name));
        Ok(())
    }

    fn delete_database(&mut self, name: &str, options: &DeleteOptions) -> Result<()> {
        self.check("delete_database")?;
        if options.from_nodes.is_empty() {
            self.databases.remove(name);
        } else {
            let db = self.db_mut(name)?;
            let topology = &mut db.record.topology;
            for tag in &options.from_nodes {
                topology.members.remove(tag);
                topology.promotables.remove(tag);
                topology.rehabs.remove(tag);
                topology.status.remove(tag);
            }
            if topology.all_tags().is_empty() {
                self.databases.remove(name);
            }
        }
        self.record(format!("delete_database:{}:{}", name, options.from_nodes.join(",")));
        Ok(())
    }

    fn add_database_node(&mut self, name: &str, tag: &str) -> Result<()> {
        self.check("add_database_node")?;
        let db = self.db_mut(name)?;
        if db.record.topology.contains(tag) {
            return Err(ConvergeError::Http {
                status: 400,
                body: format!(
                    "Can't add node {} to database '{}' topology because it is already part of it",
                    tag, name
                ),
            });
        }
        if db.record.encrypted && !db.key_holders.iter().any(|t| t == tag) {
            return Err(ConvergeError::Http {
                status: 400,
                body: format!("Node {} has no encryption key for '{}'", tag, name),
            });
        }
        db.record.topology.promotables.insert(tag.to_string());
        self.record(format!("add_database_node:{}:{}", name, tag));
        Ok(())
    }

    fn database_settings(&self, name: &str) -> Result<BTreeMap<String, String>> {
        self.check("database_settings")?;
        Ok(self.db(name)?.settings.clone())
    }

    fn put_database_settings(&mut self, name: &str, settings: &BTreeMap<String, String>) -> Result<()> {
        self.check("put_database_settings")?;
        let db = self.db_mut(name)?;
        for (k, v) in settings {
            db.settings.insert(k.clone(), v.clone());
        }
        self.record(format!("put_database_settings:{}", name));
        Ok(())
    }

    fn set_database_disabled(&mut self, name: &str, disabled: bool) -> Result<()> {
        self.check("set_database_disabled")?;
        self.db_mut(name)?.record.disabled = disabled;
        let verb = if disabled { "disable" } else { "enable" };
        self.record(format!("{}_database:{}", verb, name));
        Ok(())
    }

    fn generate_secret(&self) -> Result<String> {
        self.check("generate_secret")?;
        Ok(GENERATED_KEY.to_string())
    }

    fn distribute_secret(&mut self, name: &str, key: &str, tags: &[String]) -> Result<()> {
        self.check("distribute_secret")?;
        if key.trim().is_empty() {
            return Err(ConvergeError::Http {
                status: 400,
                body: "empty key".into(),
            });
        }
        match self.databases.get_mut(name) {
            Some(db) => {
                for tag in tags {
                    if !db.key_holders.contains(tag) {
                        db.key_holders.push(tag.clone());
                    }
                }
            }
            None => {
                let pending = self.pending_keys.entry(name.to_string()).or_default();
                for tag in tags {
                    if !pending.contains(tag) {
                        pending.push(tag.clone());
                    }
                }
            }
        }
        self.record(format!("distribute_secret:{}:{}", name, tags.join(",")));
        Ok(())
    }

    fn index_definitions(&self, db: &str) -> Result<Vec<IndexDefinition>> {
        self.check("index_definitions")?;
        Ok(self
            .db(db)?
            .indexes
            .values()
            .map(|i| i.definition.clone())
            .collect())
    }

    fn put_index(&mut self, db: &str, definition: &IndexDefinition) -> Result<()> {
        self.check("put_index")?;
        let database = self.db_mut(db)?;
        let entry = MockIndex {
            definition: definition.clone(),
            state: IndexState::Normal,
            running: IndexRunningStatus::Running,
        };
        database.indexes.insert(definition.name.clone(), entry);
        self.record(format!("put_index:{}:{}", db, definition.name));
        Ok(())
    }

    fn delete_index(&mut self, db: &str, name: &str) -> Result<()> {
        self.check("delete_index")?;
        if self.db_mut(db)?.indexes.remove(name).is_none() {
            return Err(ConvergeError::NotFound(format!("index '{}'", name)));
        }
        self.record(format!("delete_index:{}:{}", db, name));
        Ok(())
    }

    fn index_state(&self, db: &str, name: &str) -> Result<IndexState> {
        self.check("index_state")?;
        Ok(self.index(db, name)?.state)
    }

    fn index_running_status(&self, db: &str, name: &str) -> Result<IndexRunningStatus> {
        self.check("index_running_status")?;
        Ok(self.index(db, name)?.running)
    }

    fn set_index_status(
        &mut self,
        db: &str,
        name: &str,
        change: IndexStatusChange,
        cluster_wide: bool,
    ) -> Result<()> {
        self.check("set_index_status")?;
        let index = self.index_mut(db, name)?;
        match change {
            IndexStatusChange::Enable => {
                index.state = IndexState::Normal;
                index.running = IndexRunningStatus::Running;
            }
            IndexStatusChange::Disable => {
                index.state = IndexState::Disabled;
                index.running = IndexRunningStatus::Disabled;
            }
            IndexStatusChange::Resume => index.running = IndexRunningStatus::Running,
            IndexStatusChange::Pause => index.running = IndexRunningStatus::Paused,
            IndexStatusChange::Reset => {}
        }
        let scope = if cluster_wide { "cluster" } else { "node" };
        self.record(format!("set_index_status:{}:{}:{:?}:{}", db, name, change, scope));
        Ok(())
    }

    fn server_version(&self) -> Result<String> {
        self.check("server_version")?;
        Ok(self.server_version.clone())
    }

    fn connection_strings(&self, db: &str) -> Result<ConnectionStringInventory> {
        self.check("connection_strings")?;
        let database = self.db(db)?;
        let buckets: BTreeMap<ConnectionStringKind, BTreeSet<String>> = self
            .connection_string_kinds
            .iter()
            .map(|kind| {
                let names: BTreeSet<String> = database
                    .connection_strings
                    .get(kind)
                    .map(|by_name| by_name.keys().cloned().collect())
                    .unwrap_or_default();
                (*kind, names)
            })
            .collect();
        Ok(ConnectionStringInventory { buckets })
    }

    fn put_connection_string(&mut self, db: &str, kind: ConnectionStringKind, payload: &Value) -> Result<()> {
        self.check("put_connection_string")?;
        let name = payload
            .get("Name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.db_mut(db)?
            .connection_strings
            .entry(kind)
            .or_default()
            .insert(name.clone(), payload.clone());
        self.record(format!("put_connection_string:{}:{}:{}", db, kind, name));
        Ok(())
    }

    fn remove_connection_string(&mut self, db: &str, kind: ConnectionStringKind, name: &str) -> Result<()> {
        self.check("remove_connection_string")?;
        if let Some(by_name) = self.db_mut(db)?.connection_strings.get_mut(&kind) {
            by_name.remove(name);
        }
        self.record(format!("remove_connection_string:{}:{}:{}", db, kind, name));
        Ok(())
    }
}

impl NodeProbe for MockCluster {
    fn setup_alive(&self) -> Result<()> {
        self.probe_calls.set(self.probe_calls.get() + 1);
        self.alive_responses.borrow_mut().pop().unwrap_or(Ok(()))
    }

    fn node_ping(&self, _peer_url: Option<&str>, _node_tag: Option<&str>) -> Result<Vec<PeerPing>> {
        self.probe_calls.set(self.probe_calls.get() + 1);
        match self.ping_responses.borrow_mut().pop() {
            Some(response) => response,
            None => Ok(vec![PeerPing {
                url: self.url.clone(),
                ..Default::default()
            }]),
        }
    }

    fn database_inventory(&self) -> Result<Vec<DatabaseInfo>> {
        self.probe_calls.set(self.probe_calls.get() + 1);
        if let Some(response) = self.inventory_responses.borrow_mut().pop() {
            return response;
        }
        Ok(self
            .databases
            .values()
            .map(|db| DatabaseInfo {
                name: db.record.name.clone(),
                disabled: db.record.disabled,
                replication_factor: Some(db.replication_factor),
                topology: db.record.topology.clone(),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
