//! Blocking HTTP backend for a live cluster.
//!
//! One `reqwest::blocking::Client` per `HttpClient`, configured once from
//! [`TlsConfig`]. Every response is parsed into the typed records of
//! `crate::types` right here; the `parse_*` functions are pure so the shape
//! handling is testable without a server.

use std::collections::BTreeMap;
use std::fs;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Certificate, Identity, Method};
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::convergence::topology::{field, field_bool, field_str};
use crate::error::{ConvergeError, Result};
use crate::types::connection_string::{ConnectionStringInventory, ConnectionStringKind};
use crate::types::database::{CreateDatabase, DatabaseRecord, DeleteOptions};
use crate::types::health::{DatabaseInfo, PeerPing};
use crate::types::index::{IndexDefinition, IndexRunningStatus, IndexState, IndexStatusChange};
use crate::types::node::NodeType;
use crate::types::tls::{ServerTrust, TlsConfig};
use crate::types::topology::{ClusterTopology, TopologySnapshot};

use super::{ClusterApi, NodeProbe};

const USER_AGENT: &str = concat!("converge/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub struct HttpClientBuilder {
    url: String,
    tls: TlsConfig,
    validate_certificate: bool,
    timeout: Duration,
}

impl HttpClientBuilder {
    /// Skip server certificate validation regardless of the trust anchor.
    pub fn validate_certificate(mut self, validate: bool) -> Self {
        self.validate_certificate = validate;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let base = Url::parse(self.url.trim_end_matches('/'))
            .map_err(|e| ConvergeError::InvalidConfig(format!("invalid url '{}': {}", self.url, e)))?;

        let mut builder = Client::builder().user_agent(USER_AGENT).timeout(self.timeout);

        if let Some(cert_path) = self.tls.client_certificate() {
            let pem = fs::read(cert_path)?;
            builder = builder.identity(Identity::from_pem(&pem)?);
        }
        match self.tls.server_trust() {
            ServerTrust::CustomCa(ca_path) => {
                let pem = fs::read(&ca_path)?;
                builder = builder
                    .tls_built_in_root_certs(false)
                    .add_root_certificate(Certificate::from_pem(&pem)?);
            }
            ServerTrust::Nothing => builder = builder.danger_accept_invalid_certs(true),
            ServerTrust::SystemDefaults => {}
        }
        if !self.validate_certificate {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(HttpClient {
            url: self.url.trim_end_matches('/').to_string(),
            base,
            client: builder.build()?,
        })
    }
}

// ---------------------------------------------------------------------------
// HttpClient
// ---------------------------------------------------------------------------

pub struct HttpClient {
    url: String,
    base: Url,
    client: Client,
}

impl HttpClient {
    pub fn new(url: &str, tls: &TlsConfig) -> Result<Self> {
        Self::builder(url, tls).build()
    }

    pub fn builder(url: &str, tls: &TlsConfig) -> HttpClientBuilder {
        HttpClientBuilder {
            url: url.to_string(),
            tls: tls.clone(),
            validate_certificate: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ConvergeError::InvalidConfig(format!("'{}' cannot be a base url", self.url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        debug!(method = %method, url = %url, "request");
        Ok(self.client.request(method, url))
    }

    fn send_text(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send()?;
        let status = response.status();
        let text = response.text()?;
        if !status.is_success() {
            return Err(ConvergeError::Http {
                status: status.as_u16(),
                body: error_message(&text),
            });
        }
        Ok(text)
    }

    fn send_json(&self, request: RequestBuilder) -> Result<Value> {
        let text = self.send_text(request)?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn get(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Value> {
        self.send_json(self.request(Method::GET, segments)?.query(query))
    }
}

/// The server's `Message` field when the body is a JSON error object,
/// otherwise the raw body.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| field_str(&v, "message").or_else(|| field_str(&v, "error")))
        .unwrap_or_else(|| body.trim().to_string())
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

fn array<'a>(v: &'a Value, name: &str) -> &'a [Value] {
    field(v, name).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn string_map(v: Option<&Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(map)) = v else {
        return BTreeMap::new();
    };
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), s)
        })
        .collect()
}

pub fn parse_database_names(response: &Value) -> Vec<String> {
    array(response, "databases")
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            other => field_str(other, "name"),
        })
        .filter(|n| !n.is_empty())
        .collect()
}

pub fn parse_record(name: &str, response: &Value) -> DatabaseRecord {
    DatabaseRecord {
        name: field_str(response, "database_name").unwrap_or_else(|| name.to_string()),
        encrypted: field_bool(response, "encrypted"),
        disabled: field_bool(response, "disabled"),
        topology: TopologySnapshot::from_raw(response),
    }
}

pub fn parse_settings(response: &Value) -> BTreeMap<String, String> {
    string_map(field(response, "settings"))
}

pub fn parse_index_definitions(response: &Value) -> Vec<IndexDefinition> {
    array(response, "results")
        .iter()
        .filter_map(|item| {
            let name = field_str(item, "name")?;
            let maps = array(item, "maps")
                .iter()
                .filter_map(|m| m.as_str().map(String::from))
                .collect();
            Some(IndexDefinition {
                name,
                maps,
                reduce: field_str(item, "reduce").filter(|r| !r.trim().is_empty()),
                deployment_mode: field_str(item, "deployment_mode"),
                configuration: string_map(field(item, "configuration")),
            })
        })
        .collect()
}

pub fn parse_index_state(name: &str, response: &Value) -> Result<IndexState> {
    let entry = array(response, "results").first().unwrap_or(response);
    let state = field_str(entry, "state")
        .ok_or_else(|| ConvergeError::NotFound(format!("index '{}' stats", name)))?;
    Ok(match state.to_lowercase().as_str() {
        "disabled" => IndexState::Disabled,
        "idle" => IndexState::Idle,
        "error" => IndexState::Error,
        _ => IndexState::Normal,
    })
}

pub fn parse_running_status(name: &str, response: &Value) -> Result<IndexRunningStatus> {
    let entry = array(response, "indexes")
        .iter()
        .find(|i| field_str(i, "name").as_deref() == Some(name))
        .ok_or_else(|| ConvergeError::NotFound(format!("index '{}' status", name)))?;
    Ok(match field_str(entry, "status").unwrap_or_default().to_lowercase().as_str() {
        "paused" => IndexRunningStatus::Paused,
        "disabled" => IndexRunningStatus::Disabled,
        _ => IndexRunningStatus::Running,
    })
}

pub fn parse_ping(response: &Value) -> Vec<PeerPing> {
    let nested_error = |item: &Value, name: &str| {
        field(item, name)
            .and_then(|v| field_str(v, "error"))
            .filter(|e| !e.trim().is_empty())
    };
    array(response, "result")
        .iter()
        .map(|item| PeerPing {
            url: field_str(item, "url").unwrap_or_else(|| "unknown".into()),
            setup_alive_error: nested_error(item, "setup_alive"),
            tcp_info_error: nested_error(item, "tcp_info"),
        })
        .collect()
}

pub fn parse_inventory(response: &Value) -> Vec<DatabaseInfo> {
    array(response, "databases")
        .iter()
        .filter_map(|item| {
            let name = field_str(item, "name").filter(|n| !n.is_empty())?;
            let replication_factor = field_str(item, "replication_factor").and_then(|rf| rf.parse().ok());
            Some(DatabaseInfo {
                name,
                disabled: field_bool(item, "disabled"),
                replication_factor,
                topology: TopologySnapshot::from_raw(item),
            })
        })
        .collect()
}

pub fn parse_connection_strings(response: &Value) -> ConnectionStringInventory {
    let mut inventory = ConnectionStringInventory::default();
    for kind in ConnectionStringKind::ALL {
        let Some(Value::Object(bucket)) = response.get(kind.bucket()) else {
            continue;
        };
        inventory.buckets.insert(kind, bucket.keys().cloned().collect());
    }
    inventory
}

pub fn parse_product_version(response: &Value, raw: &str) -> String {
    field_str(response, "product_version")
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

fn definition_body(definition: &IndexDefinition) -> Value {
    let mut body = Map::new();
    body.insert("Name".into(), json!(definition.name));
    body.insert("Maps".into(), json!(definition.maps));
    if let Some(reduce) = &definition.reduce {
        body.insert("Reduce".into(), json!(reduce));
    }
    if let Some(mode) = &definition.deployment_mode {
        body.insert("DeploymentMode".into(), json!(capitalize(mode)));
    }
    body.insert("Configuration".into(), json!(definition.configuration));
    Value::Object(body)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `HH:MM:SS` time span.
fn timespan(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

// ---------------------------------------------------------------------------
// ClusterApi
// ---------------------------------------------------------------------------

impl ClusterApi for HttpClient {
    fn cluster_topology(&self) -> Result<ClusterTopology> {
        Ok(ClusterTopology::from_raw(&self.get(&["cluster", "topology"], &[])?))
    }

    fn add_node(&mut self, tag: &str, url: &str, node_type: NodeType) -> Result<()> {
        let mut query = vec![("url", url), ("tag", tag)];
        if node_type == NodeType::Watcher {
            query.push(("watcher", "true"));
        }
        info!(tag, url, %node_type, "adding node to cluster");
        self.send_json(self.request(Method::PUT, &["admin", "cluster", "node"])?.query(&query))?;
        Ok(())
    }

    fn list_databases(&self) -> Result<Vec<String>> {
        let response = self.get(&["databases"], &[("namesOnly", "true")])?;
        Ok(parse_database_names(&response))
    }

    fn database_record(&self, name: &str) -> Result<DatabaseRecord> {
        let response = self.get(&["admin", "databases"], &[("name", name)])?;
        if response.is_null() {
            return Err(ConvergeError::NotFound(format!("database '{}'", name)));
        }
        Ok(parse_record(name, &response))
    }

    fn create_database(&mut self, request: &CreateDatabase) -> Result<()> {
        info!(db = %request.name, rf = request.replication_factor, encrypted = request.encrypted, "creating database");
        let builder = if request.members.is_empty() {
            let rf = request.replication_factor.to_string();
            self.request(Method::PUT, &["admin", "databases"])?
                .query(&[("name", request.name.as_str()), ("replicationFactor", rf.as_str())])
                .json(&json!({
                    "DatabaseName": request.name,
                    "Encrypted": request.encrypted,
                }))
        } else {
            let rf = request.members.len();
            self.request(Method::PUT, &["admin", "databases"])?.json(&json!({
                "DatabaseName": request.name,
                "ReplicationFactor": rf,
                "Encrypted": request.encrypted,
                "DisableDynamicNodesDistribution": true,
                "Topology": {
                    "Members": request.members,
                    "ReplicationFactor": rf,
                    "DynamicNodesDistribution": false,
                },
            }))
        };
        self.send_json(builder)?;
        Ok(())
    }

    fn delete_database(&mut self, name: &str, options: &DeleteOptions) -> Result<()> {
        let mut body = Map::new();
        body.insert("DatabaseNames".into(), json!([name]));
        body.insert("HardDelete".into(), json!(options.hard_delete.unwrap_or(false)));
        if !options.from_nodes.is_empty() {
            body.insert("FromNodes".into(), json!(options.from_nodes));
        }
        if let Some(secs) = options.wait_secs {
            body.insert("TimeToWaitForConfirmation".into(), json!(timespan(secs)));
        }
        info!(db = name, from = ?options.from_nodes, "deleting database");
        self.send_json(self.request(Method::DELETE, &["admin", "databases"])?.json(&Value::Object(body)))?;
        Ok(())
    }

    fn add_database_node(&mut self, name: &str, tag: &str) -> Result<()> {
        info!(db = name, tag, "adding database node");
        self.send_json(
            self.request(Method::PUT, &["admin", "databases", "node"])?
                .query(&[("name", name), ("node", tag)]),
        )?;
        Ok(())
    }

    fn database_settings(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let response = self.get(&["databases", name, "admin", "configuration", "settings"], &[])?;
        Ok(parse_settings(&response))
    }

    fn put_database_settings(&mut self, name: &str, settings: &BTreeMap<String, String>) -> Result<()> {
        self.send_json(
            self.request(Method::PUT, &["databases", name, "admin", "configuration", "settings"])?
                .json(settings),
        )?;
        Ok(())
    }

    fn set_database_disabled(&mut self, name: &str, disabled: bool) -> Result<()> {
        let action = if disabled { "disable" } else { "enable" };
        self.send_json(
            self.request(Method::POST, &["admin", "databases", action])?
                .json(&json!({ "DatabaseNames": [name] })),
        )?;
        Ok(())
    }

    fn generate_secret(&self) -> Result<String> {
        let text = self.send_text(self.request(Method::GET, &["admin", "secrets", "generate"])?)?;
        let key = text.trim().to_string();
        if key.is_empty() {
            return Err(ConvergeError::Policy("server returned an empty encryption key".into()));
        }
        Ok(key)
    }

    fn distribute_secret(&mut self, name: &str, key: &str, tags: &[String]) -> Result<()> {
        let mut query = vec![("name", name)];
        query.extend(tags.iter().map(|t| ("node", t.as_str())));
        info!(db = name, nodes = ?tags, "distributing encryption key");
        self.send_text(
            self.request(Method::POST, &["admin", "secrets", "distribute"])?
                .query(&query)
                .header(reqwest::header::CONTENT_TYPE, "text/plain")
                .body(key.to_string()),
        )?;
        Ok(())
    }

    fn index_definitions(&self, db: &str) -> Result<Vec<IndexDefinition>> {
        let response = self.get(&["databases", db, "indexes"], &[])?;
        Ok(parse_index_definitions(&response))
    }

    fn put_index(&mut self, db: &str, definition: &IndexDefinition) -> Result<()> {
        info!(db, index = %definition.name, "putting index definition");
        self.send_json(
            self.request(Method::PUT, &["databases", db, "admin", "indexes"])?
                .json(&json!({ "Indexes": [definition_body(definition)] })),
        )?;
        Ok(())
    }

    fn delete_index(&mut self, db: &str, name: &str) -> Result<()> {
        info!(db, index = name, "deleting index");
        self.send_json(
            self.request(Method::DELETE, &["databases", db, "indexes"])?
                .query(&[("name", name)]),
        )?;
        Ok(())
    }

    fn index_state(&self, db: &str, name: &str) -> Result<IndexState> {
        let response = self.get(&["databases", db, "indexes", "stats"], &[("name", name)])?;
        parse_index_state(name, &response)
    }

    fn index_running_status(&self, db: &str, name: &str) -> Result<IndexRunningStatus> {
        let response = self.get(&["databases", db, "indexes", "status"], &[])?;
        parse_running_status(name, &response)
    }

    fn set_index_status(
        &mut self,
        db: &str,
        name: &str,
        change: IndexStatusChange,
        cluster_wide: bool,
    ) -> Result<()> {
        let cluster_wide = if cluster_wide { "true" } else { "false" };
        let builder = match change {
            IndexStatusChange::Reset => {
                let reset = Method::from_bytes(b"RESET")
                    .map_err(|e| ConvergeError::InvalidConfig(e.to_string()))?;
                self.request(reset, &["databases", db, "indexes"])?
                    .query(&[("name", name)])
            }
            other => {
                let action = match other {
                    IndexStatusChange::Enable => "enable",
                    IndexStatusChange::Disable => "disable",
                    IndexStatusChange::Resume => "start",
                    _ => "stop",
                };
                self.request(Method::POST, &["databases", db, "admin", "indexes", action])?
                    .query(&[("name", name), ("clusterWide", cluster_wide)])
            }
        };
        info!(db, index = name, change = ?change, "changing index status");
        self.send_json(builder)?;
        Ok(())
    }

    fn server_version(&self) -> Result<String> {
        let text = self.send_text(self.request(Method::GET, &["build", "version"])?)?;
        let response = serde_json::from_str::<Value>(&text).unwrap_or(Value::Null);
        Ok(parse_product_version(&response, &text))
    }

    fn connection_strings(&self, db: &str) -> Result<ConnectionStringInventory> {
        let response = self.get(&["databases", db, "admin", "connection-strings"], &[])?;
        Ok(parse_connection_strings(&response))
    }

    fn put_connection_string(&mut self, db: &str, kind: ConnectionStringKind, payload: &Value) -> Result<()> {
        info!(db, kind = %kind, name = ?payload.get("Name"), "putting connection string");
        self.send_json(
            self.request(Method::PUT, &["databases", db, "admin", "connection-strings"])?
                .json(payload),
        )?;
        Ok(())
    }

    fn remove_connection_string(&mut self, db: &str, kind: ConnectionStringKind, name: &str) -> Result<()> {
        info!(db, kind = %kind, name, "removing connection string");
        self.send_json(
            self.request(Method::DELETE, &["databases", db, "admin", "connection-strings"])?
                .query(&[("connectionString", name), ("type", kind.server_type())]),
        )?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// NodeProbe
// ---------------------------------------------------------------------------

impl NodeProbe for HttpClient {
    fn setup_alive(&self) -> Result<()> {
        self.send_text(self.request(Method::GET, &["setup", "alive"])?)?;
        Ok(())
    }

    fn node_ping(&self, peer_url: Option<&str>, node_tag: Option<&str>) -> Result<Vec<PeerPing>> {
        let mut query = Vec::new();
        if let Some(url) = peer_url {
            query.push(("url", url));
        }
        if let Some(tag) = node_tag {
            query.push(("node", tag));
        }
        let response = self.get(&["admin", "debug", "node", "ping"], &query)?;
        Ok(parse_ping(&response))
    }

    fn database_inventory(&self) -> Result<Vec<DatabaseInfo>> {
        Ok(parse_inventory(&self.get(&["databases"], &[])?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_encodes_segments() {
        let client = HttpClient::new("http://a:8080/", &TlsConfig::default()).unwrap();
        assert_eq!(client.url, "http://a:8080");
        let url = client.endpoint(&["databases", "my db", "indexes"]).unwrap();
        assert_eq!(url.as_str(), "http://a:8080/databases/my%20db/indexes");
    }

    #[test]
    fn rejects_unparseable_url() {
        assert!(matches!(
            HttpClient::new("not a url", &TlsConfig::default()),
            Err(ConvergeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_certificate_file_is_io_error() {
        let tls = TlsConfig::new(Some("/nonexistent/client.pem".into()), None);
        assert!(matches!(HttpClient::new("https://a:443", &tls), Err(ConvergeError::Io(_))));
    }

    #[test]
    fn error_message_prefers_server_message() {
        assert_eq!(error_message(r#"{"Message":"Database 'x' already exists"}"#), "Database 'x' already exists");
        assert_eq!(error_message("  plain failure "), "plain failure");
    }

    #[test]
    fn database_names_both_shapes() {
        let v = json!({"Databases": [{"Name": "orders"}, "users", {"Name": ""}]});
        assert_eq!(parse_database_names(&v), vec!["orders", "users"]);
        assert!(parse_database_names(&json!({})).is_empty());
    }

    #[test]
    fn record_parsing() {
        let v = json!({
            "DatabaseName": "orders",
            "Encrypted": true,
            "Disabled": false,
            "Topology": {"Members": ["A"], "Promotables": ["B"]}
        });
        let r = parse_record("orders", &v);
        assert!(r.encrypted);
        assert!(!r.disabled);
        assert!(r.topology.contains("B"));
    }

    #[test]
    fn settings_stringified() {
        let v = json!({"Settings": {"Indexing.MapBatchSize": 128, "Flag": "x", "Null": null}});
        let s = parse_settings(&v);
        assert_eq!(s["Indexing.MapBatchSize"], "128");
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn index_definitions_parsing() {
        let v = json!({"Results": [{
            "Name": "by_name",
            "Maps": ["from o in docs.Orders select new { o.Name }"],
            "Reduce": "",
            "DeploymentMode": "Rolling",
            "Configuration": {"Indexing.MapBatchSize": "64"}
        }]});
        let defs = parse_index_definitions(&v);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].reduce, None);
        assert_eq!(defs[0].deployment_mode.as_deref(), Some("Rolling"));
        assert_eq!(defs[0].configuration["Indexing.MapBatchSize"], "64");
    }

    #[test]
    fn index_state_and_status() {
        let stats = json!({"Results": [{"Name": "i", "State": "Disabled"}]});
        assert_eq!(parse_index_state("i", &stats).unwrap(), IndexState::Disabled);
        assert!(parse_index_state("i", &json!({"Results": []})).is_err());

        let status = json!({"Indexes": [{"Name": "i", "Status": "Paused"}, {"Name": "j", "Status": "Running"}]});
        assert_eq!(parse_running_status("i", &status).unwrap(), IndexRunningStatus::Paused);
        assert!(parse_running_status("k", &status).is_err());
    }

    #[test]
    fn ping_parsing() {
        let v = json!({"Result": [
            {"Url": "http://b:8080", "SetupAlive": {"Error": null}, "TcpInfo": {}},
            {"Url": "http://c:8080", "SetupAlive": {"Error": "refused"}, "TcpInfo": null},
            {}
        ]});
        let peers = parse_ping(&v);
        assert_eq!(peers.len(), 3);
        assert!(!peers[0].has_error());
        assert_eq!(peers[1].setup_alive_error.as_deref(), Some("refused"));
        assert_eq!(peers[2].url, "unknown");
    }

    #[test]
    fn inventory_parsing() {
        let v = json!({"Databases": [{
            "Name": "orders",
            "Disabled": false,
            "ReplicationFactor": 2,
            "NodesTopology": {
                "Members": [{"NodeTag": "A"}],
                "Status": {"A": {"LastStatus": "Ok"}}
            }
        }]});
        let inv = parse_inventory(&v);
        assert_eq!(inv[0].replication_factor, Some(2));
        assert!(inv[0].topology.status["A"].is_ok());
    }

    #[test]
    fn definition_body_shape() {
        let def = IndexDefinition {
            name: "by_name".into(),
            maps: vec!["m".into()],
            reduce: None,
            deployment_mode: Some("rolling".into()),
            configuration: BTreeMap::new(),
        };
        let body = definition_body(&def);
        assert_eq!(body["DeploymentMode"], "Rolling");
        assert!(body.get("Reduce").is_none());
    }

    #[test]
    fn connection_string_listing() {
        let v = json!({
            "RavenConnectionStrings": {"replica": {"Database": "target"}},
            "SqlConnectionStrings": {},
            "AiConnectionStrings": null
        });
        let inv = parse_connection_strings(&v);
        assert!(inv.contains(ConnectionStringKind::Raven, "replica"));
        assert!(inv.supports(ConnectionStringKind::Sql));
        assert!(!inv.supports(ConnectionStringKind::Ai));
        assert!(!inv.supports(ConnectionStringKind::Queue));
    }

    #[test]
    fn version_from_json_or_text() {
        assert_eq!(parse_product_version(&json!({"ProductVersion": "7.1.2 "}), ""), "7.1.2");
        assert_eq!(parse_product_version(&Value::Null, " 6.0.105\n"), "6.0.105");
    }

    #[test]
    fn timespan_format() {
        assert_eq!(timespan(30), "00:00:30");
        assert_eq!(timespan(3725), "01:02:05");
    }
}
