use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::topology::TopologySnapshot;
use crate::validation;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct EncryptionSpec {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub certificate_path: Option<PathBuf>,
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,
    #[serde(default)]
    pub generate_key: bool,
    #[serde(default)]
    pub key_path: Option<PathBuf>,
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

impl EncryptionSpec {
    /// Rules for creating an encrypted database. Only checked when encryption
    /// is enabled; a plain database ignores the key fields.
    pub fn validate(&self) -> validation::Check {
        if !self.enabled {
            return Ok(());
        }
        if self.certificate_path.is_none() {
            return Err("encrypted=true requires certificate_path for admin endpoints.".into());
        }
        if !self.generate_key && self.key_path.is_none() {
            return Err(
                "encrypted=true requires either generate_key=true or key_path=<path>.".into(),
            );
        }
        if self.generate_key && self.key_path.is_some() {
            return Err("generate_key and key_path are mutually exclusive.".into());
        }
        if self.output_path.is_some() && !self.generate_key {
            return Err("output_path can only be used when generate_key=true.".into());
        }
        Ok(())
    }
}

/// Desired state of one database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSpec {
    pub url: String,
    pub name: String,
    pub replication_factor: u32,
    pub settings: BTreeMap<String, String>,
    pub encryption: EncryptionSpec,
    pub members: Vec<String>,
}

impl DatabaseSpec {
    pub fn new(url: &str, name: &str, replication_factor: u32) -> Result<Self> {
        let spec = DatabaseSpec {
            url: url.to_string(),
            name: name.to_string(),
            replication_factor,
            settings: BTreeMap::new(),
            encryption: EncryptionSpec::default(),
            members: Vec::new(),
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn with_settings(mut self, settings: BTreeMap<String, String>) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_members(mut self, members: Vec<String>) -> Result<Self> {
        self.members = members;
        self.validate()?;
        Ok(self)
    }

    pub fn with_encryption(mut self, encryption: EncryptionSpec) -> Result<Self> {
        self.encryption = encryption;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        validation::collect(vec![
            validation::validate_url(&self.url),
            validation::validate_database_name(&self.name),
            validation::validate_replication_factor(self.replication_factor),
            validation::validate_members(&self.unique_members(), self.replication_factor),
            self.encryption.validate(),
        ])
    }

    /// Member tags in declared order with duplicates dropped.
    pub fn unique_members(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(self.members.len());
        for tag in &self.members {
            let tag = tag.trim();
            if !tag.is_empty() && !out.iter().any(|t| t == tag) {
                out.push(tag.to_string());
            }
        }
        out
    }
}

/// Parameters of a create call. `members` selects the explicit-topology path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDatabase {
    pub name: String,
    pub replication_factor: u32,
    pub encrypted: bool,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteOptions {
    #[serde(default)]
    pub hard_delete: Option<bool>,
    #[serde(default)]
    pub from_nodes: Vec<String>,
    #[serde(default)]
    pub wait_secs: Option<u64>,
}

impl DeleteOptions {
    pub fn soft_from(nodes: &[String], wait_secs: u64) -> Self {
        DeleteOptions {
            hard_delete: Some(false),
            from_nodes: nodes.to_vec(),
            wait_secs: Some(wait_secs),
        }
    }
}

/// Normalized database record as read back from the cluster.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatabaseRecord {
    pub name: String,
    pub encrypted: bool,
    pub disabled: bool,
    pub topology: TopologySnapshot,
}
