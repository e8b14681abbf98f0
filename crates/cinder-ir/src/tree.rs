//! Syntax tree values.
//!
//! A [`Tree`] is what a syntax frontend hands to the encoder. It is either
//! a raw string, an explicit absence, an ordered sequence, or a [`Node`]
//! with a kind and named fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A syntax tree value.
///
/// The JSON form is untagged: `null` is [`Tree::Absent`], a string is
/// [`Tree::Str`], an array is [`Tree::Seq`] and an object
/// `{"kind": ..., "fields": {...}}` is [`Tree::Node`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tree {
    /// Deliberately missing optional value.
    #[default]
    Absent,
    /// Raw text (identifier names, string literal contents).
    Str(String),
    /// Ordered list of values. May be empty.
    Seq(Vec<Tree>),
    /// Tagged record.
    Node(Node),
}

/// A tagged record: a kind name plus named fields.
///
/// Field storage order carries no meaning; the encoder reads fields in
/// schema order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Tree>,
}

impl Node {
    /// Creates a node with no fields.
    pub fn new(kind: impl Into<String>) -> Self {
        Node {
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Sets a field, replacing any previous value.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Tree>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> Option<&Tree> {
        self.fields.get(name)
    }
}

impl Tree {
    pub fn str(value: impl Into<String>) -> Self {
        Tree::Str(value.into())
    }

    pub fn seq(items: impl IntoIterator<Item = Tree>) -> Self {
        Tree::Seq(items.into_iter().collect())
    }

    pub fn node(node: Node) -> Self {
        Tree::Node(node)
    }

    /// A node of the given kind with no fields, e.g. `Load` or `Pass`.
    pub fn leaf(kind: impl Into<String>) -> Self {
        Tree::Node(Node::new(kind))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Tree::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Tree::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Tree]> {
        match self {
            Tree::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Tree::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the node kind if this is a node.
    pub fn kind(&self) -> Option<&str> {
        self.as_node().map(|node| node.kind.as_str())
    }
}

impl From<&str> for Tree {
    fn from(value: &str) -> Self {
        Tree::Str(value.to_string())
    }
}

impl From<String> for Tree {
    fn from(value: String) -> Self {
        Tree::Str(value)
    }
}

impl From<Vec<Tree>> for Tree {
    fn from(value: Vec<Tree>) -> Self {
        Tree::Seq(value)
    }
}

impl From<Node> for Tree {
    fn from(value: Node) -> Self {
        Tree::Node(value)
    }
}

impl<T: Into<Tree>> From<Option<T>> for Tree {
    fn from(value: Option<T>) -> Self {
        value.map_or(Tree::Absent, Into::into)
    }
}
