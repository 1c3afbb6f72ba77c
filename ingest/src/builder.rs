//! Depth-gated tree assembly.
//!
//! [`TreeBuilder`] consumes start/text/end events and keeps a stack of open
//! [`Node`]s, but only while inside an element at the target depth. When
//! such an element closes, its finished tree is handed back to the caller.

use std::sync::LazyLock;

use regex::Regex;
use te_core::{DEFAULT_MAX_NESTING, Node, Value};

use crate::error::{IngestError, Result};

/// Character data starting with a newline and more whitespace is
/// indentation between sibling tags.
static EXTRA_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\n\s+").expect("static regex must compile"));

/// A top-level element whose closing tag has been seen.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedElement {
    /// Local name of the element.
    pub element_type: String,
    /// Assembled tree, not yet normalised.
    pub node: Node,
}

/// Builds one top-level element tree at a time from parsing events.
#[derive(Debug)]
pub struct TreeBuilder {
    target_depth: usize,
    max_nesting: usize,
    depth: usize,
    in_target: bool,
    stack: Vec<Node>,
}

impl TreeBuilder {
    pub fn new(target_depth: usize) -> Self {
        Self::with_max_nesting(target_depth, DEFAULT_MAX_NESTING)
    }

    /// Builder that accepts at most `max_nesting` element levels inside a
    /// target element.
    pub fn with_max_nesting(target_depth: usize, max_nesting: usize) -> Self {
        Self {
            target_depth,
            max_nesting,
            depth: 0,
            in_target: false,
            stack: Vec::new(),
        }
    }

    /// Current element depth; the document root is depth 1.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of open nodes on the build stack.
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    pub fn in_target(&self) -> bool {
        self.in_target
    }

    /// Handles an opening tag.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::MalformedDocument`] if the tag nests deeper
    /// than the nesting limit below the target element.
    pub fn start_element(&mut self) -> Result<()> {
        if self.in_target && self.depth + 1 - self.target_depth > self.max_nesting {
            return Err(IngestError::MalformedDocument(format!(
                "element nested more than {} levels below a top-level element",
                self.max_nesting
            )));
        }
        self.depth += 1;
        if self.depth == self.target_depth {
            self.in_target = true;
        }
        if self.in_target {
            // The parent now has a structural child; its text so far was
            // indentation.
            if let Some(parent) = self.stack.last_mut() {
                parent.discard_content();
            }
            self.stack.push(Node::open());
        }
        Ok(())
    }

    /// Handles a run of character data. Dropped outside target elements.
    pub fn character_data(&mut self, text: &str) {
        if !self.in_target || text.is_empty() || EXTRA_WHITESPACE.is_match(text) {
            return;
        }
        if let Some(top) = self.stack.last_mut() {
            top.push_content(text);
        }
    }

    /// Handles a closing tag named `name`.
    ///
    /// Returns the finished element when the tag closes a target-depth
    /// element. Below target depth, the closed child is merged into its
    /// parent under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::MalformedDocument`] if the tag has no matching
    /// open element.
    pub fn end_element(&mut self, name: &str) -> Result<Option<CompletedElement>> {
        if self.depth == 0 {
            return Err(IngestError::MalformedDocument(format!(
                "closing tag '{name}' without an open element"
            )));
        }

        let mut completed = None;
        if self.depth == self.target_depth {
            let node = self.pop(name)?;
            completed = Some(CompletedElement {
                element_type: name.to_string(),
                node,
            });
            self.in_target = false;
        }
        self.depth -= 1;

        if self.in_target {
            let child = self.pop(name)?;
            let parent = self.stack.last_mut().ok_or_else(|| {
                IngestError::MalformedDocument(format!("'{name}' closed with no parent element"))
            })?;
            merge_child(parent, name, child);
        }
        Ok(completed)
    }

    /// Checks that every opened element was closed.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::MalformedDocument`] if the input ended inside
    /// an element.
    pub fn finish(&self) -> Result<()> {
        if self.depth != 0 || !self.stack.is_empty() {
            return Err(IngestError::MalformedDocument(format!(
                "input ended at depth {} with {} open nodes",
                self.depth,
                self.stack.len()
            )));
        }
        Ok(())
    }

    fn pop(&mut self, name: &str) -> Result<Node> {
        self.stack.pop().ok_or_else(|| {
            IngestError::MalformedDocument(format!("'{name}' closed with an empty build stack"))
        })
    }
}

/// Merges a closed child into its parent under `key`.
///
/// A child holding nothing but non-empty text collapses to that string.
/// A repeated tag turns the existing value into a sequence, or extends it.
fn merge_child(parent: &mut Node, key: &str, child: Node) {
    let value = match child.collapsed_content() {
        Some(text) => Value::Str(text.to_string()),
        None => Value::Node(child),
    };
    match parent.get_mut(key) {
        Some(Value::List(items)) => items.push(value),
        Some(existing) => {
            let first = std::mem::replace(existing, Value::List(Vec::new()));
            *existing = Value::List(vec![first, value]);
        }
        None => {
            parent.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use te_core::CONTENT_KEY;

    /// Feeds `<r><a><b><T>...</T></b></a></r>` framing around the target.
    fn build(inner: impl FnOnce(&mut TreeBuilder)) -> CompletedElement {
        let mut builder = TreeBuilder::new(4);
        for _ in 0..3 {
            builder.start_element().unwrap();
        }
        builder.start_element().unwrap();
        inner(&mut builder);
        let done = builder.end_element("T").unwrap().expect("target element");
        for name in ["b", "a", "r"] {
            assert!(builder.end_element(name).unwrap().is_none());
        }
        builder.finish().unwrap();
        done
    }

    fn leaf(builder: &mut TreeBuilder, name: &str, text: &str) {
        builder.start_element().unwrap();
        builder.character_data(text);
        builder.end_element(name).unwrap();
    }

    #[test]
    fn test_leaf_children_collapse_to_strings() {
        let done = build(|b| {
            leaf(b, "hjid", "1");
            leaf(b, "sid", "100");
        });
        assert_eq!(done.element_type, "T");
        assert_eq!(done.node.scalar("hjid"), Some("1"));
        assert_eq!(done.node.scalar("sid"), Some("100"));
        assert!(!done.node.contains_key(CONTENT_KEY));
    }

    #[test]
    fn test_indentation_ignored() {
        let done = build(|b| {
            b.character_data("\n      ");
            leaf(b, "hjid", "1");
            b.character_data("\n    ");
        });
        assert_eq!(done.node.len(), 1);
    }

    #[test]
    fn test_text_outside_target_dropped() {
        let mut builder = TreeBuilder::new(4);
        builder.start_element().unwrap();
        builder.character_data("root text");
        assert_eq!(builder.stack_len(), 0);
        assert!(!builder.in_target());
    }

    #[test]
    fn test_repeated_tags_become_sequence() {
        let done = build(|b| {
            leaf(b, "desc", "A");
            leaf(b, "desc", "B");
            leaf(b, "desc", "C");
        });
        let items = done.node.get("desc").and_then(Value::as_list).unwrap();
        let texts: Vec<_> = items.iter().filter_map(Value::as_str).collect();
        assert_eq!(texts, ["A", "B", "C"]);
    }

    #[test]
    fn test_repeated_nodes_become_sequence() {
        let done = build(|b| {
            for sid in ["1", "2"] {
                b.start_element().unwrap();
                leaf(b, "sid", sid);
                b.end_element("footnote").unwrap();
            }
        });
        let items = done.node.get("footnote").and_then(Value::as_list).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].as_node().unwrap().scalar("sid"), Some("2"));
    }

    #[test]
    fn test_empty_child_kept_as_open_node() {
        let done = build(|b| {
            b.start_element().unwrap();
            b.end_element("flag").unwrap();
        });
        let flag = done.node.get("flag").and_then(Value::as_node).unwrap();
        assert_eq!(flag.content(), Some(""));
    }

    #[test]
    fn test_depth_and_stack_return_to_zero() {
        let mut builder = TreeBuilder::new(2);
        builder.start_element().unwrap();
        builder.start_element().unwrap();
        builder.start_element().unwrap();
        builder.character_data("x");
        builder.end_element("c").unwrap();
        assert_eq!(builder.stack_len(), 1);
        let done = builder.end_element("b").unwrap().unwrap();
        assert_eq!(done.node.scalar("c"), Some("x"));
        builder.end_element("a").unwrap();
        assert_eq!(builder.depth(), 0);
        assert_eq!(builder.stack_len(), 0);
        builder.finish().unwrap();
    }

    #[test]
    fn test_unbalanced_end_is_malformed() {
        let mut builder = TreeBuilder::new(4);
        assert!(matches!(
            builder.end_element("x"),
            Err(IngestError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_finish_inside_element_is_malformed() {
        let mut builder = TreeBuilder::new(4);
        builder.start_element().unwrap();
        assert!(builder.finish().is_err());
    }

    #[test]
    fn test_nesting_limit_below_target() {
        let mut builder = TreeBuilder::with_max_nesting(2, 3);
        builder.start_element().unwrap();
        builder.start_element().unwrap();
        for _ in 0..3 {
            builder.start_element().unwrap();
        }
        assert_eq!(builder.depth(), 5);
        assert!(matches!(
            builder.start_element(),
            Err(IngestError::MalformedDocument(_))
        ));
        assert_eq!(builder.depth(), 5);
    }

    #[test]
    fn test_nesting_limit_ignores_levels_above_target() {
        let mut builder = TreeBuilder::with_max_nesting(10, 1);
        for _ in 0..10 {
            builder.start_element().unwrap();
        }
        builder.start_element().unwrap();
        assert!(builder.start_element().is_err());
    }
}
