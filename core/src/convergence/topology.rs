//! Topology extraction and membership deltas.
//!
//! The server reports topology in several shapes: nested under `Topology`
//! or `NodesTopology` or inline, with PascalCase or snake_case keys, and with
//! each group as a tag-keyed object, a list of tags, a list of node objects,
//! or a single tag. Everything is normalized here into [`TopologySnapshot`]
//! / [`ClusterTopology`] right after the remote call. Malformed input yields
//! an empty topology, never an error.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use crate::types::topology::{ClusterTopology, NodeStatus, TopologySnapshot};

// ---------------------------------------------------------------------------
// Field access helpers
// ---------------------------------------------------------------------------

/// Look up `name` trying PascalCase, the given spelling, and snake_case.
pub(crate) fn field<'a>(obj: &'a Value, name: &str) -> Option<&'a Value> {
    let map = obj.as_object()?;
    let pascal = pascal_case(name);
    let snake = snake_case(name);
    let found = [pascal.as_str(), name, snake.as_str()]
        .into_iter()
        .filter_map(|k| map.get(k))
        .find(|v| !v.is_null());
    found
}

fn pascal_case(name: &str) -> String {
    name.split('_')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

pub(crate) fn field_str(obj: &Value, name: &str) -> Option<String> {
    match field(obj, name)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub(crate) fn field_bool(obj: &Value, name: &str) -> bool {
    match field(obj, name) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn topology_root(record: &Value) -> &Value {
    field(record, "topology")
        .or_else(|| field(record, "nodes_topology"))
        .unwrap_or(record)
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Tags of one topology group, in first-seen order without duplicates.
pub fn pluck_tags(group: &Value) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |t: &str| {
        let t = t.trim();
        if !t.is_empty() && !out.iter().any(|x| x == t) {
            out.push(t.to_string());
        }
    };
    match group {
        Value::Object(map) => map.keys().for_each(|k| push(k)),
        Value::String(s) => push(s),
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(s) => push(s),
                    Value::Object(_) => {
                        if let Some(t) = field_str(item, "node_tag") {
                            push(&t);
                        }
                    }
                    _ => {}
                }
            }
        }
        _ => {}
    }
    out
}

fn group_tags(topology: &Value, name: &str) -> BTreeSet<String> {
    field(topology, name)
        .map(pluck_tags)
        .unwrap_or_default()
        .into_iter()
        .collect()
}

fn status_map(topology: &Value) -> BTreeMap<String, NodeStatus> {
    let Some(Value::Object(map)) = field(topology, "status") else {
        return BTreeMap::new();
    };
    map.iter()
        .map(|(tag, st)| {
            let status = NodeStatus {
                last_status: field_str(st, "last_status").unwrap_or_default(),
                last_error: field_str(st, "last_error").filter(|e| !e.trim().is_empty()),
            };
            (tag.trim().to_string(), status)
        })
        .collect()
}

impl TopologySnapshot {
    /// Normalize a raw database record (or a bare topology object).
    pub fn from_raw(record: &Value) -> Self {
        let topology = topology_root(record);
        TopologySnapshot {
            members: group_tags(topology, "members"),
            promotables: group_tags(topology, "promotables"),
            rehabs: group_tags(topology, "rehabs"),
            status: status_map(topology),
        }
    }
}

impl ClusterTopology {
    /// Normalize a `/cluster/topology` response.
    pub fn from_raw(response: &Value) -> Self {
        let topology = topology_root(response);
        let group = |name: &str| -> BTreeMap<String, String> {
            match field(topology, name) {
                Some(Value::Object(map)) => map
                    .iter()
                    .map(|(tag, url)| {
                        let url = match url {
                            Value::String(s) => s.clone(),
                            Value::Null => String::new(),
                            other => other.to_string(),
                        };
                        (tag.trim().to_string(), url)
                    })
                    .collect(),
                _ => BTreeMap::new(),
            }
        };
        ClusterTopology {
            members: group("members"),
            watchers: group("watchers"),
            promotables: group("promotables"),
        }
    }
}

/// Every tag already counted in a database's topology.
pub fn extract_members(record: &Value) -> BTreeSet<String> {
    TopologySnapshot::from_raw(record).all_tags()
}

// ---------------------------------------------------------------------------
// Delta
// ---------------------------------------------------------------------------

/// Sorted, disjoint membership changes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MembersDelta {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl MembersDelta {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Set difference between the current snapshot and the wanted tags.
pub fn delta(current: &TopologySnapshot, wanted: &[String]) -> MembersDelta {
    let cur = current.all_tags();
    let want: BTreeSet<String> = wanted
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    MembersDelta {
        to_add: want.difference(&cur).cloned().collect(),
        to_remove: cur.difference(&want).cloned().collect(),
    }
}

/// [`delta`] over a raw record.
pub fn members_delta(record: &Value, wanted: &[String]) -> MembersDelta {
    delta(&TopologySnapshot::from_raw(record), wanted)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
