//! YAML desired-state manifest.
//!
//! A manifest names the server to talk to, how long to wait for
//! multi-node effects, and the nodes, databases, connection strings,
//! indexes and health check to converge. [`ConvergeConfig::plan`] turns it into validated specs
//! before any remote call is made.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::convergence::retry::RetryPolicy;
use crate::error::{ConvergeError, Result};
use crate::types::connection_string::{ConnectionStringKind, ConnectionStringSpec};
use crate::types::database::{DatabaseSpec, DeleteOptions, EncryptionSpec};
use crate::types::health::{HealthCheck, HealthCheckSpec, OnTimeout};
use crate::types::index::{IndexDefinitionSpec, IndexMode, IndexSpec};
use crate::types::node::{NodeSpec, NodeType};
use crate::types::tls::TlsConfig;
use crate::validation;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConvergeConfig {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub wait: WaitConfig,
    #[serde(default)]
    pub nodes: Vec<NodeEntry>,
    #[serde(default)]
    pub databases: Vec<DatabaseEntry>,
    #[serde(default)]
    pub connection_strings: Vec<ConnectionStringEntry>,
    #[serde(default)]
    pub indexes: Vec<IndexEntry>,
    #[serde(default)]
    pub healthcheck: Option<HealthCheckEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Leader (or any node) URL all admin calls go to.
    pub url: String,
    #[serde(default)]
    pub certificate_path: Option<PathBuf>,
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WaitConfig {
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        WaitConfig {
            max_wait_secs: default_max_wait_secs(),
            interval_secs: default_interval_secs(),
        }
    }
}

fn default_max_wait_secs() -> u64 {
    120
}

fn default_interval_secs() -> u64 {
    2
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    Present,
    Absent,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NodeEntry {
    pub tag: String,
    pub url: String,
    #[serde(default)]
    pub node_type: NodeType,
    /// Node that performs the add; defaults to the connection URL.
    #[serde(default)]
    pub leader_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseEntry {
    pub name: String,
    #[serde(default)]
    pub state: State,
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u32,
    #[serde(default, deserialize_with = "scalar_map")]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub encryption: EncryptionSpec,
    /// Only used with `state: absent`.
    #[serde(default)]
    pub delete: DeleteOptions,
}

fn default_replication_factor() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConnectionStringEntry {
    pub db: String,
    pub name: String,
    #[serde(default)]
    pub kind: ConnectionStringKind,
    #[serde(default)]
    pub state: State,
    /// snake_case fields of the connection string; secret fields take the
    /// secret itself or a path to a file holding it.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IndexEntry {
    pub db: String,
    pub name: String,
    #[serde(default)]
    pub state: State,
    #[serde(default)]
    pub definition: Option<IndexDefinitionSpec>,
    #[serde(default)]
    pub mode: Option<IndexMode>,
    #[serde(default)]
    pub cluster_wide: bool,
    #[serde(default, deserialize_with = "scalar_map")]
    pub configuration: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HealthCheckEntry {
    /// Node under test; defaults to the connection URL.
    #[serde(default)]
    pub url: Option<String>,
    pub checks: Vec<HealthCheck>,
    #[serde(default = "default_health_max_wait")]
    pub max_wait_secs: u64,
    #[serde(default = "default_health_interval")]
    pub retry_interval_secs: u64,
    #[serde(default = "default_health_interval")]
    pub db_retry_interval_secs: u64,
    #[serde(default)]
    pub on_db_timeout: OnTimeout,
    #[serde(default = "default_true")]
    pub validate_certificate: bool,
}

fn default_health_max_wait() -> u64 {
    300
}

fn default_health_interval() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

/// Settings values are strings on the server; accept any YAML scalar so
/// `Indexing.MapBatchSize: 128` does not need quoting.
fn scalar_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, serde_yaml::Value> = BTreeMap::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(k, v)| {
            let s = match v {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "setting '{}' must be a scalar, got {:?}",
                        k, other
                    )))
                }
            };
            Ok((k, s))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseTask {
    Present(DatabaseSpec),
    Absent { name: String, options: DeleteOptions },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStringTask {
    Present(ConnectionStringSpec),
    Absent {
        db: String,
        kind: ConnectionStringKind,
        name: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum IndexTask {
    Present(IndexSpec),
    Absent { db: String, name: String },
}

/// Validated work derived from a manifest, in apply order.
#[derive(Debug, Clone)]
pub struct Plan {
    pub url: String,
    pub tls: TlsConfig,
    pub wait: RetryPolicy,
    pub nodes: Vec<NodeSpec>,
    pub databases: Vec<DatabaseTask>,
    pub connection_strings: Vec<ConnectionStringTask>,
    pub indexes: Vec<IndexTask>,
    pub healthcheck: Option<HealthCheckSpec>,
}

fn located<T>(section: &str, i: usize, result: Result<T>) -> Result<T> {
    result.map_err(|e| ConvergeError::Validation(format!("{}[{}]: {}", section, i, e)))
}

impl ConvergeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConvergeError::InvalidConfig(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn tls(&self) -> TlsConfig {
        TlsConfig::new(
            self.connection.certificate_path.clone(),
            self.connection.ca_cert_path.clone(),
        )
    }

    /// Validate every entry, local files included. The first invalid entry
    /// aborts the plan with its section and position.
    pub fn plan(&self) -> Result<Plan> {
        let url = self.connection.url.trim_end_matches('/').to_string();
        validation::collect(vec![
            validation::validate_url(&url),
            validation::validate_path_exists(self.connection.certificate_path.as_deref()),
            validation::validate_path_exists(self.connection.ca_cert_path.as_deref()),
        ])?;
        let wait = RetryPolicy::from_secs(self.wait.max_wait_secs, self.wait.interval_secs)?;

        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (i, entry) in self.nodes.iter().enumerate() {
            let leader = entry
                .leader_url
                .as_deref()
                .map(|u| u.trim_end_matches('/'))
                .unwrap_or(url.as_str());
            nodes.push(located(
                "nodes",
                i,
                NodeSpec::new(&entry.tag, &entry.url, leader, entry.node_type),
            )?);
        }

        let mut databases = Vec::with_capacity(self.databases.len());
        for (i, entry) in self.databases.iter().enumerate() {
            databases.push(located("databases", i, self.database_task(&url, entry))?);
        }

        let mut connection_strings = Vec::with_capacity(self.connection_strings.len());
        for (i, entry) in self.connection_strings.iter().enumerate() {
            connection_strings.push(located("connection_strings", i, connection_string_task(entry))?);
        }

        let mut indexes = Vec::with_capacity(self.indexes.len());
        for (i, entry) in self.indexes.iter().enumerate() {
            indexes.push(located("indexes", i, index_task(entry))?);
        }

        let healthcheck = match &self.healthcheck {
            Some(entry) => Some(located("healthcheck", 0, health_spec(&url, entry))?),
            None => None,
        };

        Ok(Plan {
            url,
            tls: self.tls(),
            wait,
            nodes,
            databases,
            connection_strings,
            indexes,
            healthcheck,
        })
    }

    fn database_task(&self, url: &str, entry: &DatabaseEntry) -> Result<DatabaseTask> {
        if entry.state == State::Absent {
            validation::collect(vec![validation::validate_database_name(&entry.name)])?;
            return Ok(DatabaseTask::Absent {
                name: entry.name.clone(),
                options: entry.delete.clone(),
            });
        }
        // Every admin call, key distribution included, goes through the
        // connection's client, so an encrypted entry may only restate the
        // connection's certificate and CA.
        let connection = &self.connection;
        let mut encryption = entry.encryption.clone();
        if encryption.enabled {
            validation::collect(vec![
                same_credential(
                    "certificate_path",
                    encryption.certificate_path.as_deref(),
                    connection.certificate_path.as_deref(),
                ),
                same_credential(
                    "ca_cert_path",
                    encryption.ca_cert_path.as_deref(),
                    connection.ca_cert_path.as_deref(),
                ),
            ])?;
            encryption.certificate_path = connection.certificate_path.clone();
            encryption.ca_cert_path = connection.ca_cert_path.clone();
        }
        validation::collect(vec![
            validation::validate_path_exists(encryption.certificate_path.as_deref()),
            validation::validate_path_exists(encryption.ca_cert_path.as_deref()),
            validation::validate_path_exists(encryption.key_path.as_deref()),
        ])?;
        let spec = DatabaseSpec::new(url, &entry.name, entry.replication_factor)?
            .with_settings(entry.settings.clone())
            .with_members(entry.members.clone())?
            .with_encryption(encryption)?;
        Ok(DatabaseTask::Present(spec))
    }
}

fn same_credential(field: &str, own: Option<&Path>, shared: Option<&Path>) -> validation::Check {
    match own {
        Some(path) if Some(path) != shared => Err(format!(
            "encryption.{} ({}) must match connection.{}: admin calls use the connection's client certificate.",
            field,
            path.display(),
            field
        )),
        _ => Ok(()),
    }
}

fn connection_string_task(entry: &ConnectionStringEntry) -> Result<ConnectionStringTask> {
    if entry.state == State::Absent {
        validation::collect(vec![validation::validate_database_name(&entry.db)])?;
        return Ok(ConnectionStringTask::Absent {
            db: entry.db.clone(),
            kind: entry.kind,
            name: entry.name.trim().to_string(),
        });
    }
    let spec = ConnectionStringSpec::new(&entry.db, &entry.name, entry.kind, entry.properties.clone())?;
    Ok(ConnectionStringTask::Present(spec))
}

fn index_task(entry: &IndexEntry) -> Result<IndexTask> {
    if entry.state == State::Absent {
        validation::collect(vec![
            validation::validate_database_name(&entry.db),
            validation::validate_index_name(&entry.name),
        ])?;
        return Ok(IndexTask::Absent {
            db: entry.db.clone(),
            name: entry.name.clone(),
        });
    }
    let mut spec = IndexSpec::new(&entry.db, &entry.name)?.with_configuration(entry.configuration.clone());
    if let Some(definition) = &entry.definition {
        // Re-run construction so YAML input gets the same normalization.
        let definition = IndexDefinitionSpec::new(
            definition.maps.clone(),
            definition.reduce.clone(),
            definition.deployment_mode.as_deref(),
        )?;
        spec = spec.with_definition(definition);
    }
    if let Some(mode) = entry.mode {
        spec = spec.with_mode(mode, entry.cluster_wide);
    }
    Ok(IndexTask::Present(spec))
}

fn health_spec(default_url: &str, entry: &HealthCheckEntry) -> Result<HealthCheckSpec> {
    let url = entry.url.as_deref().unwrap_or(default_url);
    validation::collect(vec![validation::validate_url(url)])?;
    // Constructing the policies here surfaces a zero interval before any check runs.
    RetryPolicy::from_secs(entry.max_wait_secs, entry.retry_interval_secs)?;
    RetryPolicy::from_secs(entry.max_wait_secs, entry.db_retry_interval_secs)?;
    Ok(HealthCheckSpec {
        max_wait: Duration::from_secs(entry.max_wait_secs),
        retry_interval: Duration::from_secs(entry.retry_interval_secs),
        db_retry_interval: Duration::from_secs(entry.db_retry_interval_secs),
        on_db_timeout: entry.on_db_timeout,
        validate_certificate: entry.validate_certificate,
        ..HealthCheckSpec::new(url, entry.checks.clone())
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
