//! Raw syntax tree
//!
//! The tree an external parser hands to the coverage core. Nodes carry a
//! construct tag, ordered children mixing sub-nodes with opaque leaf values,
//! and an optional location (synthetic or desugared nodes have none).

use crate::location::Location;
use serde::{Deserialize, Serialize};

/// Opaque leaf value inside a node's children
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Leaf {
    /// Absent child; in a clause slot this means the clause is missing
    Nil,
    /// Boolean literal value
    Bool(bool),
    /// Integer literal value
    Int(i64),
    /// Float literal value
    Float(f64),
    /// Symbolic sub-field (method name, operator, identifier)
    Str(String),
}

impl Leaf {
    /// The string payload, if any
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Check for the absent marker
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }
}

/// One child of a raw node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawChild {
    /// A nested syntax node
    Node(RawNode),
    /// A leaf value
    Leaf(Leaf),
}

impl RawChild {
    /// The nested node, if this child is one
    #[must_use]
    pub const fn as_node(&self) -> Option<&RawNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Leaf(_) => None,
        }
    }
}

impl From<RawNode> for RawChild {
    fn from(node: RawNode) -> Self {
        Self::Node(node)
    }
}

impl From<Leaf> for RawChild {
    fn from(leaf: Leaf) -> Self {
        Self::Leaf(leaf)
    }
}

/// A node of the parsed syntax tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    /// Construct tag (`if`, `send`, `while_post`, ...)
    pub kind: String,
    /// Ordered children
    #[serde(default)]
    pub children: Vec<RawChild>,
    /// Source location, absent for synthetic nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl RawNode {
    /// Create a node without children or location
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            children: Vec::new(),
            location: None,
        }
    }

    /// Set the location
    #[must_use]
    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: impl Into<RawChild>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append an absent child
    #[must_use]
    pub fn nil(self) -> Self {
        self.child(Leaf::Nil)
    }

    /// Append a string leaf
    #[must_use]
    pub fn leaf(self, value: impl Into<String>) -> Self {
        self.child(Leaf::Str(value.into()))
    }

    /// The node at child slot `index`, if that slot holds a node
    #[must_use]
    pub fn node_at(&self, index: usize) -> Option<&RawNode> {
        self.children.get(index).and_then(RawChild::as_node)
    }

    /// All string leaves among the children
    pub fn string_leaves(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|c| match c {
            RawChild::Leaf(leaf) => leaf.as_str(),
            RawChild::Node(_) => None,
        })
    }

    /// Total number of nodes in this subtree
    #[must_use]
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .iter()
            .filter_map(RawChild::as_node)
            .map(RawNode::subtree_len)
            .sum::<usize>()
    }

    /// Parse a tree from its JSON encoding
    pub fn from_json(json: &str) -> crate::result::CovResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
