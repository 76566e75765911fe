//! Named connection strings a database's ETL and AI tasks refer to.
//!
//! Operators describe a connection string with snake_case `properties`; the
//! admin API wants PascalCase objects with secrets inlined. [`ConnectionStringSpec::payload`]
//! does that translation, reading secret values from files when the value
//! names one.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConvergeError, Result};
use crate::secrets;
use crate::validation;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStringKind {
    #[default]
    Raven,
    Sql,
    Olap,
    ElasticSearch,
    Queue,
    Snowflake,
    Ai,
}

impl ConnectionStringKind {
    pub const ALL: [ConnectionStringKind; 7] = [
        ConnectionStringKind::Raven,
        ConnectionStringKind::Sql,
        ConnectionStringKind::Olap,
        ConnectionStringKind::ElasticSearch,
        ConnectionStringKind::Queue,
        ConnectionStringKind::Snowflake,
        ConnectionStringKind::Ai,
    ];

    /// Value of the `Type` field and the `type` query parameter.
    pub fn server_type(self) -> &'static str {
        match self {
            ConnectionStringKind::Raven => "Raven",
            ConnectionStringKind::Sql => "Sql",
            ConnectionStringKind::Olap => "Olap",
            ConnectionStringKind::ElasticSearch => "ElasticSearch",
            ConnectionStringKind::Queue => "Queue",
            ConnectionStringKind::Snowflake => "Snowflake",
            ConnectionStringKind::Ai => "Ai",
        }
    }

    /// Key of this kind's section in the connection-strings listing. A
    /// server that predates the kind omits the section.
    pub fn bucket(self) -> &'static str {
        match self {
            ConnectionStringKind::Raven => "RavenConnectionStrings",
            ConnectionStringKind::Sql => "SqlConnectionStrings",
            ConnectionStringKind::Olap => "OlapConnectionStrings",
            ConnectionStringKind::ElasticSearch => "ElasticSearchConnectionStrings",
            ConnectionStringKind::Queue => "QueueConnectionStrings",
            ConnectionStringKind::Snowflake => "SnowflakeConnectionStrings",
            ConnectionStringKind::Ai => "AiConnectionStrings",
        }
    }
}

impl fmt::Display for ConnectionStringKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStringKind::Raven => "RAVEN",
            ConnectionStringKind::Sql => "SQL",
            ConnectionStringKind::Olap => "OLAP",
            ConnectionStringKind::ElasticSearch => "ELASTIC_SEARCH",
            ConnectionStringKind::Queue => "QUEUE",
            ConnectionStringKind::Snowflake => "SNOWFLAKE",
            ConnectionStringKind::Ai => "AI",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Server version gate
// ---------------------------------------------------------------------------

/// `(major, minor, patch)` of a product version string such as
/// `"7.1.2-nightly"`. Anything unparseable is `(0, 0, 0)`.
pub fn parse_version(version: &str) -> (u32, u32, u32) {
    let numeric: String = version
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let mut parts = numeric.split('.').map(|p| p.parse::<u32>());
    let mut next = || match parts.next() {
        Some(Ok(n)) => Some(n),
        Some(Err(_)) => None,
        None => Some(0),
    };
    match (next(), next(), next()) {
        (Some(a), Some(b), Some(c)) => (a, b, c),
        _ => (0, 0, 0),
    }
}

const AI_ERA: (u32, u32, u32) = (7, 1, 0);
const AZURE_QUEUE_ERA: (u32, u32, u32) = (6, 2, 0);

// ---------------------------------------------------------------------------
// Spec
// ---------------------------------------------------------------------------

const AI_PROVIDERS: [&str; 7] = [
    "openai_settings",
    "azure_openai_settings",
    "ollama_settings",
    "embedded_settings",
    "google_settings",
    "huggingface_settings",
    "mistral_ai_settings",
];

/// Properties whose value is either the secret itself or a file holding it.
const SECRET_KEYS: [&str; 15] = [
    "connection_string",
    "aws_access_key",
    "aws_secret_key",
    "aws_session_token",
    "account_key",
    "sas_token",
    "google_credentials_json",
    "password",
    "certificate_as_base64",
    "certificates_base64",
    "api_key",
    "encoded_api_key",
    "client_secret",
    "access_key",
    "secret_key",
];

/// Desired connection string on one database.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStringSpec {
    pub db_name: String,
    pub name: String,
    pub kind: ConnectionStringKind,
    pub properties: Map<String, Value>,
}

impl ConnectionStringSpec {
    pub fn new(db_name: &str, name: &str, kind: ConnectionStringKind, properties: Map<String, Value>) -> Result<Self> {
        let name = name.trim();
        let mut checks = vec![validation::validate_database_name(db_name)];
        if name.is_empty() {
            checks.push(Err("connection string name must not be empty.".into()));
        }
        if kind == ConnectionStringKind::Ai {
            let present = AI_PROVIDERS.iter().filter(|p| properties.contains_key(**p)).count();
            if present != 1 {
                checks.push(Err(format!(
                    "AI connection string '{}' must contain exactly one provider block",
                    name
                )));
            }
        }
        validation::collect(checks)?;
        Ok(ConnectionStringSpec {
            db_name: db_name.to_string(),
            name: name.to_string(),
            kind,
            properties,
        })
    }

    fn broker(&self) -> String {
        self.properties
            .get("broker_type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_uppercase()
    }

    /// Oldest server version that accepts this connection string, when
    /// the kind (or queue broker) is newer than the base feature set.
    pub fn min_server_version(&self) -> Option<((u32, u32, u32), String)> {
        match self.kind {
            ConnectionStringKind::Ai | ConnectionStringKind::Snowflake => Some((AI_ERA, self.kind.to_string())),
            ConnectionStringKind::Queue => match self.broker().as_str() {
                "AMAZONSQS" => Some((AI_ERA, format!("{} (AmazonSqs)", self.kind))),
                "AZUREQUEUESTORAGE" => Some((AZURE_QUEUE_ERA, format!("{} (AzureQueueStorage)", self.kind))),
                _ => None,
            },
            _ => None,
        }
    }

    /// Body of the put call: `Name`, `Type` and the PascalCased properties
    /// with secrets resolved.
    pub fn payload(&self) -> Result<Value> {
        let mut body = Map::new();
        body.insert("Name".into(), Value::String(self.name.clone()));
        body.insert("Type".into(), Value::String(self.kind.server_type().into()));
        for (key, value) in &self.properties {
            let value = match key.as_str() {
                "broker_type" => Value::String(broker_type(value)?),
                "model_type" => Value::String(model_type(value)?),
                // Raven accepts either spelling for its discovery URLs.
                "urls" if self.kind == ConnectionStringKind::Raven => {
                    body.entry("TopologyDiscoveryUrls").or_insert(resolve(key, value)?);
                    continue;
                }
                _ => resolve(key, value)?,
            };
            body.insert(pascal_key(key), value);
        }
        Ok(Value::Object(body))
    }
}

/// PascalCase property name, with the handful of names the server spells
/// differently from a plain conversion.
pub fn pascal_key(key: &str) -> String {
    match key {
        "openai_settings" => "OpenAiSettings".into(),
        "azure_openai_settings" => "AzureOpenAiSettings".into(),
        "huggingface_settings" => "HuggingFaceSettings".into(),
        "overriding_external_script" => "GetBackupConfigurationScript".into(),
        _ => key
            .split('_')
            .filter(|p| !p.is_empty())
            .map(|p| {
                let mut chars = p.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect(),
    }
}

fn resolve(key: &str, value: &Value) -> Result<Value> {
    if SECRET_KEYS.contains(&key) {
        return match value {
            Value::String(s) => Ok(Value::String(secrets::read_secret(s)?)),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(Value::String(secrets::read_secret(s)?)),
                    other => Ok(other.clone()),
                })
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            other => Ok(other.clone()),
        };
    }
    match value {
        Value::Object(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(pascal_key(k), resolve(k, v)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => items.iter().map(|v| resolve(key, v)).collect::<Result<Vec<_>>>().map(Value::Array),
        other => Ok(other.clone()),
    }
}

fn broker_type(value: &Value) -> Result<String> {
    let raw = value.as_str().unwrap_or_default().to_uppercase();
    let name = match raw.as_str() {
        "KAFKA" => "Kafka",
        "RABBITMQ" => "RabbitMq",
        "AZUREQUEUESTORAGE" => "AzureQueueStorage",
        "AMAZONSQS" => "AmazonSqs",
        "" | "NONE" => "None",
        _ => return Err(ConvergeError::Validation(format!("unknown queue broker_type: {}", value))),
    };
    Ok(name.to_string())
}

fn model_type(value: &Value) -> Result<String> {
    match value.as_str().unwrap_or("CHAT").to_uppercase().as_str() {
        "CHAT" => Ok("Chat".into()),
        "TEXT_EMBEDDINGS" => Ok("TextEmbeddings".into()),
        _ => Err(ConvergeError::Validation(format!("unknown AI model_type: {}", value))),
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Connection-string names per kind the server reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStringInventory {
    pub buckets: BTreeMap<ConnectionStringKind, BTreeSet<String>>,
}

impl ConnectionStringInventory {
    /// Whether the server knows the kind at all.
    pub fn supports(&self, kind: ConnectionStringKind) -> bool {
        self.buckets.contains_key(&kind)
    }

    pub fn contains(&self, kind: ConnectionStringKind, name: &str) -> bool {
        self.buckets.get(&kind).is_some_and(|names| names.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use serde_json::json;

    fn props(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn kind_spellings() {
        let kind: ConnectionStringKind = serde_json::from_str("\"ELASTIC_SEARCH\"").unwrap();
        assert_eq!(kind, ConnectionStringKind::ElasticSearch);
        assert_eq!(kind.to_string(), "ELASTIC_SEARCH");
        assert_eq!(kind.server_type(), "ElasticSearch");
        assert_eq!(kind.bucket(), "ElasticSearchConnectionStrings");
    }

    #[test]
    fn version_parsing() {
        assert_eq!(parse_version("7.1.2"), (7, 1, 2));
        assert_eq!(parse_version("6.2-nightly"), (6, 2, 0));
        assert_eq!(parse_version(" 5 "), (5, 0, 0));
        assert_eq!(parse_version("garbage"), (0, 0, 0));
        assert!(parse_version("7.0.9") < AI_ERA);
    }

    #[test]
    fn spec_validation() {
        assert!(ConnectionStringSpec::new("etl", "  ", ConnectionStringKind::Raven, Map::new()).is_err());
        assert!(ConnectionStringSpec::new("bad db", "x", ConnectionStringKind::Raven, Map::new()).is_err());

        let none = ConnectionStringSpec::new("ai_db", "llm", ConnectionStringKind::Ai, Map::new());
        assert!(none.unwrap_err().to_string().contains("exactly one provider block"));
        let two = props(json!({"ollama_settings": {}, "embedded_settings": {}}));
        assert!(ConnectionStringSpec::new("ai_db", "llm", ConnectionStringKind::Ai, two).is_err());
        let one = props(json!({"embedded_settings": {}}));
        let spec = ConnectionStringSpec::new("ai_db", " llm ", ConnectionStringKind::Ai, one).unwrap();
        assert_eq!(spec.name, "llm");
    }

    #[test]
    fn version_gate_by_kind_and_broker() {
        let raven = ConnectionStringSpec::new("db", "r", ConnectionStringKind::Raven, Map::new()).unwrap();
        assert_eq!(raven.min_server_version(), None);

        let sqs = props(json!({"broker_type": "AmazonSqs"}));
        let queue = ConnectionStringSpec::new("db", "q", ConnectionStringKind::Queue, sqs).unwrap();
        assert_eq!(queue.min_server_version(), Some((AI_ERA, "QUEUE (AmazonSqs)".to_string())));

        let kafka = props(json!({"broker_type": "kafka"}));
        let queue = ConnectionStringSpec::new("db", "q", ConnectionStringKind::Queue, kafka).unwrap();
        assert_eq!(queue.min_server_version(), None);
    }

    #[test]
    fn raven_payload_accepts_urls_alias() {
        let p = props(json!({"database": "target", "urls": ["http://b:8080"]}));
        let spec = ConnectionStringSpec::new("db", "replica", ConnectionStringKind::Raven, p).unwrap();
        let body = spec.payload().unwrap();
        assert_eq!(
            body,
            json!({
                "Name": "replica",
                "Type": "Raven",
                "Database": "target",
                "TopologyDiscoveryUrls": ["http://b:8080"]
            })
        );
    }

    #[test]
    fn secrets_read_from_files_and_nested_keys_cased() {
        let dir = tempfile::tempdir().unwrap();
        let secret = dir.path().join("sql.secret");
        fs::write(&secret, "Server=db;Password=hunter2\n").unwrap();

        let p = props(json!({
            "connection_string": secret.to_str().unwrap(),
            "factory_name": "System.Data.SqlClient"
        }));
        let spec = ConnectionStringSpec::new("db", "warehouse", ConnectionStringKind::Sql, p).unwrap();
        let body = spec.payload().unwrap();
        assert_eq!(body["ConnectionString"], "Server=db;Password=hunter2");
        assert_eq!(body["FactoryName"], "System.Data.SqlClient");

        let p = props(json!({
            "s3_settings": {
                "bucket_name": "lake",
                "aws_secret_key": "inline-key",
                "overriding_external_script": {"exec": "creds.sh", "timeout_in_ms": 1000}
            }
        }));
        let spec = ConnectionStringSpec::new("db", "lake", ConnectionStringKind::Olap, p).unwrap();
        let body = spec.payload().unwrap();
        let s3 = &body["S3Settings"];
        assert_eq!(s3["BucketName"], "lake");
        assert_eq!(s3["AwsSecretKey"], "inline-key");
        assert_eq!(s3["GetBackupConfigurationScript"]["TimeoutInMs"], 1000);
    }

    #[test]
    fn enum_properties_normalized() {
        let p = props(json!({"broker_type": "rabbitmq", "rabbit_mq_settings": {"connection_string": "amqp://q"}}));
        let spec = ConnectionStringSpec::new("db", "bus", ConnectionStringKind::Queue, p).unwrap();
        let body = spec.payload().unwrap();
        assert_eq!(body["BrokerType"], "RabbitMq");
        assert_eq!(body["RabbitMqSettings"]["ConnectionString"], "amqp://q");

        let p = props(json!({"broker_type": "carrier-pigeon"}));
        let spec = ConnectionStringSpec::new("db", "bus", ConnectionStringKind::Queue, p).unwrap();
        assert!(spec.payload().is_err());

        let p = props(json!({"model_type": "text_embeddings", "openai_settings": {"model": "small"}}));
        let spec = ConnectionStringSpec::new("db", "emb", ConnectionStringKind::Ai, p).unwrap();
        let body = spec.payload().unwrap();
        assert_eq!(body["ModelType"], "TextEmbeddings");
        assert_eq!(body["OpenAiSettings"]["Model"], "small");
    }

    #[test]
    fn inventory_lookup() {
        let mut inv = ConnectionStringInventory::default();
        inv.buckets.insert(ConnectionStringKind::Raven, ["replica".to_string()].into_iter().collect());
        inv.buckets.insert(ConnectionStringKind::Sql, BTreeSet::new());
        assert!(inv.supports(ConnectionStringKind::Sql));
        assert!(!inv.supports(ConnectionStringKind::Ai));
        assert!(inv.contains(ConnectionStringKind::Raven, "replica"));
        assert!(!inv.contains(ConnectionStringKind::Sql, "replica"));
    }
}
