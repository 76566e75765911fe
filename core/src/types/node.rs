use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::validation;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum NodeType {
    #[default]
    Member,
    Watcher,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Member => write!(f, "Member"),
            NodeType::Watcher => write!(f, "Watcher"),
        }
    }
}

/// A node that should belong to the cluster led by `leader_url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    tag: String,
    url: String,
    leader_url: String,
    node_type: NodeType,
}

impl NodeSpec {
    pub fn new(tag: &str, url: &str, leader_url: &str, node_type: NodeType) -> Result<Self> {
        validation::collect(vec![
            validation::validate_tag(tag),
            validation::validate_url(url),
            validation::validate_url(leader_url),
        ])?;
        Ok(NodeSpec {
            tag: tag.to_string(),
            url: url.to_string(),
            leader_url: leader_url.to_string(),
            node_type,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn leader_url(&self) -> &str {
        &self.leader_url
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn is_watcher(&self) -> bool {
        self.node_type == NodeType::Watcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_spec() {
        let spec = NodeSpec::new("B", "http://b:8080", "http://a:8080", NodeType::Watcher).unwrap();
        assert_eq!(spec.tag(), "B");
        assert!(spec.is_watcher());
        assert_eq!(spec.node_type().to_string(), "Watcher");
    }

    #[test]
    fn rejects_bad_tag_and_url_together() {
        let err = NodeSpec::new("node1", "b:8080", "http://a:8080", NodeType::Member).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("Invalid node tag: node1"));
        assert!(text.contains("Invalid URL: b:8080"));
    }

    #[test]
    fn node_type_serde() {
        let json = serde_json::to_string(&NodeType::Watcher).unwrap();
        assert_eq!(json, "\"Watcher\"");
        let back: NodeType = serde_json::from_str("\"Member\"").unwrap();
        assert_eq!(back, NodeType::Member);
    }
}
