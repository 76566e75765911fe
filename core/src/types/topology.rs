use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

/// Last-known per-node status of a database.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NodeStatus {
    pub last_status: String,
    pub last_error: Option<String>,
}

impl NodeStatus {
    pub fn is_ok(&self) -> bool {
        self.last_status.trim().eq_ignore_ascii_case("ok")
    }
}

/// Normalized database topology: which tags hold the database and how each
/// node last reported it. Rebuilt from the server on every call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TopologySnapshot {
    pub members: BTreeSet<String>,
    pub promotables: BTreeSet<String>,
    pub rehabs: BTreeSet<String>,
    pub status: BTreeMap<String, NodeStatus>,
}

impl TopologySnapshot {
    /// Members, promotables and rehabs together: every tag already counted
    /// in the topology.
    pub fn all_tags(&self) -> BTreeSet<String> {
        self.members
            .iter()
            .chain(&self.promotables)
            .chain(&self.rehabs)
            .cloned()
            .collect()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.members.contains(tag) || self.promotables.contains(tag) || self.rehabs.contains(tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeRole {
    Member,
    Watcher,
    Promotable,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Member => write!(f, "Member"),
            NodeRole::Watcher => write!(f, "Watcher"),
            NodeRole::Promotable => write!(f, "Promotable"),
        }
    }
}

/// A node found in the cluster topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterNode {
    pub tag: String,
    pub url: String,
    pub role: NodeRole,
}

/// Cluster-level topology: tag → URL per role.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClusterTopology {
    pub members: BTreeMap<String, String>,
    pub watchers: BTreeMap<String, String>,
    pub promotables: BTreeMap<String, String>,
}

impl ClusterTopology {
    fn groups(&self) -> [(NodeRole, &BTreeMap<String, String>); 3] {
        [
            (NodeRole::Member, &self.members),
            (NodeRole::Watcher, &self.watchers),
            (NodeRole::Promotable, &self.promotables),
        ]
    }

    /// First node whose tag or URL matches, scanning members, watchers,
    /// promotables in that order.
    pub fn find(&self, tag: &str, url: &str) -> Option<ClusterNode> {
        let url = url.trim_end_matches('/');
        for (role, group) in self.groups() {
            for (t, u) in group {
                if t == tag || (!u.is_empty() && u.trim_end_matches('/') == url) {
                    return Some(ClusterNode {
                        tag: t.clone(),
                        url: u.clone(),
                        role,
                    });
                }
            }
        }
        None
    }

    pub fn tag_for_url(&self, url: &str) -> Option<String> {
        let url = url.trim_end_matches('/');
        self.groups().into_iter().find_map(|(_, group)| {
            group
                .iter()
                .find(|(_, u)| u.trim_end_matches('/') == url)
                .map(|(t, _)| t.clone())
        })
    }

    pub fn all_tags(&self) -> Vec<String> {
        let tags: BTreeSet<&String> = self
            .groups()
            .into_iter()
            .flat_map(|(_, group)| group.keys())
            .collect();
        tags.into_iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.watchers.is_empty() && self.promotables.is_empty()
    }
}
