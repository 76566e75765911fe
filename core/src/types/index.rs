use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ConvergeError, Result};
use crate::validation;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    Enabled,
    Disabled,
    Paused,
    Resumed,
    Reset,
}

impl fmt::Display for IndexMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndexMode::Enabled => "enabled",
            IndexMode::Disabled => "disabled",
            IndexMode::Paused => "paused",
            IndexMode::Resumed => "resumed",
            IndexMode::Reset => "reset",
        };
        write!(f, "{}", s)
    }
}

/// Lower-cases a deployment mode and folds vendor spellings
/// (`"Rolling"`, `"IndexDeploymentMode.PARALLEL"`) onto `rolling`/`parallel`.
pub fn normalize_deployment_mode(value: &str) -> Option<String> {
    let s = value.trim().to_lowercase();
    if s.is_empty() {
        None
    } else if s.contains("rolling") {
        Some("rolling".into())
    } else if s.contains("parallel") {
        Some("parallel".into())
    } else {
        Some(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexDefinitionSpec {
    #[serde(rename = "map")]
    pub maps: Vec<String>,
    #[serde(default)]
    pub reduce: Option<String>,
    #[serde(default)]
    pub deployment_mode: Option<String>,
}

impl IndexDefinitionSpec {
    pub fn new(maps: Vec<String>, reduce: Option<String>, deployment_mode: Option<&str>) -> Result<Self> {
        if maps.iter().all(|m| m.trim().is_empty()) {
            return Err(ConvergeError::Validation(
                "index definition requires at least one map function.".into(),
            ));
        }
        Ok(IndexDefinitionSpec {
            maps,
            reduce: reduce.filter(|r| !r.trim().is_empty()),
            deployment_mode: deployment_mode.and_then(normalize_deployment_mode),
        })
    }
}

/// Desired state of one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub db_name: String,
    pub name: String,
    pub definition: Option<IndexDefinitionSpec>,
    pub mode: Option<IndexMode>,
    pub cluster_wide: bool,
    pub configuration: BTreeMap<String, String>,
}

impl IndexSpec {
    pub fn new(db_name: &str, name: &str) -> Result<Self> {
        validation::collect(vec![
            validation::validate_database_name(db_name),
            validation::validate_index_name(name),
        ])?;
        Ok(IndexSpec {
            db_name: db_name.to_string(),
            name: name.to_string(),
            definition: None,
            mode: None,
            cluster_wide: false,
            configuration: BTreeMap::new(),
        })
    }

    pub fn with_definition(mut self, definition: IndexDefinitionSpec) -> Self {
        self.definition = Some(definition);
        self
    }

    pub fn with_mode(mut self, mode: IndexMode, cluster_wide: bool) -> Self {
        self.mode = Some(mode);
        self.cluster_wide = cluster_wide;
        self
    }

    pub fn with_configuration(mut self, configuration: BTreeMap<String, String>) -> Self {
        self.configuration = configuration;
        self
    }
}

/// Index definition as stored on the server.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexDefinition {
    pub name: String,
    pub maps: Vec<String>,
    pub reduce: Option<String>,
    pub deployment_mode: Option<String>,
    pub configuration: BTreeMap<String, String>,
}

impl IndexDefinition {
    pub fn from_spec(name: &str, spec: &IndexDefinitionSpec) -> Self {
        IndexDefinition {
            name: name.to_string(),
            maps: spec.maps.clone(),
            reduce: spec.reduce.clone(),
            deployment_mode: spec.deployment_mode.clone(),
            configuration: BTreeMap::new(),
        }
    }
}

/// Logical index state (enabled/disabled axis).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Normal,
    Disabled,
    Idle,
    Error,
}

/// Running status (running/paused axis).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRunningStatus {
    Running,
    Paused,
    Disabled,
}

/// Remote status transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatusChange {
    Enable,
    Disable,
    Resume,
    Pause,
    Reset,
}
