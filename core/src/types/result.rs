use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ConvergeError;

/// Uniform outcome of every reconciler operation.
///
/// `failed` is reserved for unrecoverable errors; `changed` reports whether
/// cluster state was (or, in dry-run, would be) mutated.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ReconcileResult {
    pub changed: bool,
    pub failed: bool,
    pub msg: String,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl ReconcileResult {
    pub fn ok(msg: impl Into<String>, changed: bool) -> Self {
        ReconcileResult {
            changed,
            failed: false,
            msg: msg.into(),
            extras: Map::new(),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        ReconcileResult {
            changed: false,
            failed: true,
            msg: msg.into(),
            extras: Map::new(),
        }
    }

    /// A failure after earlier sub-steps already mutated the cluster.
    pub fn partial_error(msg: impl Into<String>, changed: bool) -> Self {
        ReconcileResult {
            changed,
            ..ReconcileResult::error(msg)
        }
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extras.insert(key.to_string(), value.into());
        self
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl From<ConvergeError> for ReconcileResult {
    fn from(err: ConvergeError) -> Self {
        ReconcileResult::error(err.to_string())
    }
}
