//! Tree normalisation for top-level elements.
//!
//! The export wraps most business data in purely syntactic container
//! elements. [`normalise`] dissolves those containers into dotted-path
//! attributes on their parent while keeping real entities (nodes that carry
//! a [`METAINFO_KEY`](crate::METAINFO_KEY) attribute) nested.
//!
//! # Example
//!
//! ```
//! use te_core::{Node, Value, normalise};
//!
//! let mut inner = Node::new();
//! inner.insert("inner", Value::from("X"));
//! let mut measure = Node::new();
//! measure.insert("hjid", Value::from("2"));
//! measure.insert("wrap", Value::Node(inner));
//!
//! let flat = normalise(measure);
//! assert_eq!(flat.scalar("wrap.inner"), Some("X"));
//! assert!(!flat.contains_key("wrap"));
//! ```

use std::collections::BTreeMap;

use crate::types::{Node, Value};

/// Normalises one element tree.
///
/// For every attribute of the node:
///
/// - a child node without `metainfo` is deep-flattened into this node under
///   `key.` prefixed paths and the original attribute is removed;
/// - a child node with `metainfo` is kept and normalised recursively;
/// - a sequence is kept as a sequence, each node member normalised
///   recursively (sequences are never flattened into the parent);
/// - scalars are left untouched.
///
/// The function is pure: it consumes its input and owns no state.
pub fn normalise(node: Node) -> Node {
    let mut out = Node::new();
    for (key, value) in node {
        match value {
            Value::Node(child) if !child.has_metainfo() => {
                for (path, leaf) in deep_flatten(child, &key) {
                    out.insert(path, Value::Str(leaf));
                }
            }
            Value::Node(child) => {
                out.insert(key, Value::Node(normalise(child)));
            }
            Value::List(items) => {
                let items = items.into_iter().map(normalise_member).collect();
                out.insert(key, Value::List(items));
            }
            scalar @ Value::Str(_) => {
                out.insert(key, scalar);
            }
        }
    }
    out
}

fn normalise_member(value: Value) -> Value {
    match value {
        Value::Node(node) => Value::Node(normalise(node)),
        other => other,
    }
}

/// Flattens a node into a single-level map of dotted paths to scalars.
///
/// Paths are built as follows, starting from `prefix`:
///
/// - a nested node under `k` extends the prefix to `<prefix>.k`;
/// - member `i` of a sequence under `k` gets `<prefix>.k[i]`;
/// - a scalar under `k` ends up at `<prefix>.k`.
///
/// Nodes without any leaves contribute nothing.
///
/// # Examples
///
/// ```
/// use te_core::{Node, Value, deep_flatten};
///
/// let mut period = Node::new();
/// period.insert("start", Value::from("2024-01-01"));
/// let mut wrap = Node::new();
/// wrap.insert("period", Value::Node(period));
/// wrap.insert("codes", Value::List(vec![Value::from("A"), Value::from("B")]));
///
/// let flat = deep_flatten(wrap, "wrap");
/// assert_eq!(flat["wrap.period.start"], "2024-01-01");
/// assert_eq!(flat["wrap.codes[1]"], "B");
/// ```
pub fn deep_flatten(node: Node, prefix: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    flatten_node(node, prefix, &mut out);
    out
}

fn flatten_node(node: Node, prefix: &str, out: &mut BTreeMap<String, String>) {
    for (key, value) in node {
        flatten_value(value, format!("{prefix}.{key}"), out);
    }
}

fn flatten_value(value: Value, path: String, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Str(leaf) => {
            out.insert(path, leaf);
        }
        Value::Node(child) => flatten_node(child, &path, out),
        Value::List(items) => {
            for (i, item) in items.into_iter().enumerate() {
                flatten_value(item, format!("{path}[{i}]"), out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CONTENT_KEY, METAINFO_KEY};

    fn leaf_node(pairs: &[(&str, &str)]) -> Node {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    #[test]
    fn test_scalars_untouched() {
        let node = leaf_node(&[("hjid", "1"), ("sid", "100")]);
        assert_eq!(normalise(node.clone()), node);
    }

    #[test]
    fn test_wrapper_flattened_with_prefix() {
        let mut node = leaf_node(&[("hjid", "2")]);
        node.insert("wrap", Value::Node(leaf_node(&[("inner", "X")])));

        let out = normalise(node);
        assert_eq!(out.scalar("wrap.inner"), Some("X"));
        assert!(!out.contains_key("wrap"));
        assert_eq!(out.scalar("hjid"), Some("2"));
    }

    #[test]
    fn test_nested_wrappers_flatten_fully() {
        let mut middle = Node::new();
        middle.insert("b", Value::Node(leaf_node(&[("c", "deep")])));
        let mut node = Node::new();
        node.insert("a", Value::Node(middle));

        let out = normalise(node);
        assert_eq!(out.len(), 1);
        assert_eq!(out.scalar("a.b.c"), Some("deep"));
    }

    #[test]
    fn test_metainfo_node_kept_and_recursed() {
        let mut period = leaf_node(&[("sid", "9")]);
        period.insert(METAINFO_KEY, Value::Node(leaf_node(&[("origin", "EU")])));
        let mut node = leaf_node(&[("hjid", "3")]);
        node.insert("period", Value::Node(period));

        let out = normalise(node);
        let period = out.get("period").and_then(Value::as_node).unwrap();
        assert_eq!(period.scalar("sid"), Some("9"));
        // metainfo itself has no metainfo, so it is flattened inside period
        assert_eq!(period.scalar("metainfo.origin"), Some("EU"));
        assert!(!period.contains_key(METAINFO_KEY));
    }

    #[test]
    fn test_sequence_members_normalised_not_flattened() {
        let mut first = leaf_node(&[("sid", "1")]);
        first.insert("wrap", Value::Node(leaf_node(&[("x", "a")])));
        let second = leaf_node(&[("sid", "2")]);
        let mut node = Node::new();
        node.insert(
            "footnote",
            Value::List(vec![Value::Node(first), Value::Node(second), Value::from("t")]),
        );

        let out = normalise(node);
        let items = out.get("footnote").and_then(Value::as_list).unwrap();
        assert_eq!(items.len(), 3);
        let first = items[0].as_node().unwrap();
        assert_eq!(first.scalar("wrap.x"), Some("a"));
        assert_eq!(items[2].as_str(), Some("t"));
    }

    #[test]
    fn test_wrapper_holding_sequence_gets_indexed_paths() {
        let mut wrap = Node::new();
        wrap.insert(
            "item",
            Value::List(vec![
                Value::Node(leaf_node(&[("code", "A")])),
                Value::Node(leaf_node(&[("code", "B")])),
            ]),
        );
        let mut node = Node::new();
        node.insert("wrap", Value::Node(wrap));

        let out = normalise(node);
        assert_eq!(out.scalar("wrap.item[0].code"), Some("A"));
        assert_eq!(out.scalar("wrap.item[1].code"), Some("B"));
    }

    #[test]
    fn test_empty_wrapper_content_survives_as_path() {
        let mut node = Node::new();
        node.insert("flag", Value::Node(Node::open()));

        let out = normalise(node);
        assert_eq!(out.scalar(&format!("flag.{CONTENT_KEY}")), Some(""));
        assert!(!out.contains_key("flag"));
    }

    #[test]
    fn test_deep_flatten_empty_node() {
        assert!(deep_flatten(Node::new(), "x").is_empty());
    }
}
