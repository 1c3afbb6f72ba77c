//! Element tree type definitions.
//!
//! An XML element is modelled as a [`Node`]: a mapping from child tag name to
//! a heterogeneous [`Value`]. The same types are used while the streaming
//! parser assembles a tree and as the JSON payload that ends up in the store,
//! so serialisation is a plain `serde_json` call.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};

/// Reserved attribute holding the concatenated character data of an element.
pub const CONTENT_KEY: &str = "__content__";

/// Attribute whose presence marks a node as a business entity.
///
/// Nodes carrying `metainfo` keep their nesting during normalisation; nodes
/// without it are treated as syntactic wrappers and flattened into their
/// parent. This is a convention of the TARIC export, not something the XML
/// itself declares.
pub const METAINFO_KEY: &str = "metainfo";

/// A single attribute value.
///
/// Serialises untagged, so a tree maps directly onto JSON strings, objects
/// and arrays.
///
/// # Examples
///
/// ```
/// use te_core::{Node, Value};
///
/// let mut node = Node::new();
/// node.insert("sid", Value::from("100"));
/// let json = serde_json::to_string(&Value::Node(node)).unwrap();
/// assert_eq!(json, r#"{"sid":"100"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Character data of a leaf element.
    Str(String),
    /// A nested element.
    Node(Node),
    /// Repeated sibling elements sharing one tag, in document order.
    List(Vec<Value>),
}

impl Value {
    /// Returns the scalar string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the nested node, if this is one.
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Returns the sequence members, if this is a sequence.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

/// An in-memory XML element: attribute name to [`Value`].
///
/// Iteration order is sorted by key. Consumers must not rely on any
/// particular order; it only makes serialised payloads reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Node(BTreeMap<String, Value>);

impl Node {
    /// Creates a node with no attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a freshly opened element: a node holding only an empty
    /// [`CONTENT_KEY`] attribute.
    pub fn open() -> Self {
        let mut node = Self::new();
        node.insert(CONTENT_KEY, Value::Str(String::new()));
        node
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Inserts an attribute, returning the previous value under that key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, String, Value> {
        self.0.keys()
    }

    /// Returns the scalar value under `key`, if present and scalar.
    pub fn scalar(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Accumulated character data, if the content attribute is still present.
    pub fn content(&self) -> Option<&str> {
        self.scalar(CONTENT_KEY)
    }

    /// Appends character data, recreating the content attribute if it was
    /// discarded or replaced.
    pub fn push_content(&mut self, text: &str) {
        match self.0.get_mut(CONTENT_KEY) {
            Some(Value::Str(current)) => current.push_str(text),
            _ => {
                self.insert(CONTENT_KEY, Value::Str(text.to_string()));
            }
        }
    }

    /// Drops the content attribute. Called when the element gains a
    /// structural child, since inter-child text is indentation.
    pub fn discard_content(&mut self) {
        self.0.remove(CONTENT_KEY);
    }

    /// Whether this node is a business entity rather than a wrapper.
    pub fn has_metainfo(&self) -> bool {
        self.contains_key(METAINFO_KEY)
    }

    /// The content string, when it is the node's only attribute and is
    /// non-empty. Such a node stands for a plain text leaf.
    pub fn collapsed_content(&self) -> Option<&str> {
        if self.len() != 1 {
            return None;
        }
        self.content().filter(|text| !text.is_empty())
    }
}

impl FromIterator<(String, Value)> for Node {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Node {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Node {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_node_has_empty_content() {
        let node = Node::open();
        assert_eq!(node.len(), 1);
        assert_eq!(node.content(), Some(""));
        assert_eq!(node.collapsed_content(), None);
    }

    #[test]
    fn test_push_content_appends_runs() {
        let mut node = Node::open();
        node.push_content("Live ");
        node.push_content("animals");
        assert_eq!(node.collapsed_content(), Some("Live animals"));
    }

    #[test]
    fn test_push_content_after_discard_recreates() {
        let mut node = Node::open();
        node.discard_content();
        assert!(node.content().is_none());
        node.push_content("tail");
        assert_eq!(node.content(), Some("tail"));
    }

    #[test]
    fn test_collapsed_content_requires_single_attribute() {
        let mut node = Node::open();
        node.push_content("X");
        node.insert("sid", Value::from("1"));
        assert_eq!(node.collapsed_content(), None);
    }

    #[test]
    fn test_has_metainfo() {
        let mut node = Node::new();
        assert!(!node.has_metainfo());
        node.insert(METAINFO_KEY, Value::Node(Node::new()));
        assert!(node.has_metainfo());
    }

    #[test]
    fn test_value_json_shape() {
        let mut inner = Node::new();
        inner.insert("origin", Value::from("EU"));
        let mut node = Node::new();
        node.insert("hjid", Value::from("7"));
        node.insert("desc", Value::List(vec![Value::from("A"), Value::Node(inner)]));

        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"hjid": "7", "desc": ["A", {"origin": "EU"}]})
        );
    }

    #[test]
    fn test_value_deserializes_back() {
        let raw = r#"{"hjid":"7","period":{"sid":"9"},"desc":["A","B"]}"#;
        let node: Node = serde_json::from_str(raw).unwrap();
        assert_eq!(node.scalar("hjid"), Some("7"));
        assert!(node.get("period").and_then(Value::as_node).is_some());
        assert_eq!(node.get("desc").and_then(Value::as_list).map(<[_]>::len), Some(2));
    }
}
