//! Core element tree model for TARIC XML exports.
//!
//! This crate defines the in-memory representation shared by the ingest
//! pipeline and the store payloads:
//!
//! - [`Node`]: one XML element as a mapping of child tag name to [`Value`].
//! - [`Value`]: a scalar string, a nested [`Node`], or a sequence of values
//!   for repeated sibling tags.
//! - [`normalise`]: collapses metainfo-free wrapper nodes into dotted-path
//!   attributes while keeping real entities nested.
//! - [`IngestConfig`]: target depth, nesting limit, batch size and
//!   strictness for a run.
//!
//! # Example
//!
//! ```
//! use te_core::*;
//!
//! let mut period = Node::new();
//! period.insert(METAINFO_KEY, Value::Node(Node::new()));
//! period.insert("sid", Value::from("9"));
//!
//! let mut measure = Node::new();
//! measure.insert("hjid", Value::from("3"));
//! measure.insert("period", Value::Node(period));
//!
//! let out = normalise(measure);
//! assert!(out.get("period").and_then(Value::as_node).is_some());
//! ```

mod config;
mod error;
mod normalize;
mod types;

pub use config::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_NESTING, DEFAULT_TARGET_DEPTH, IngestConfig};
pub use error::{ConfigError, Result};
pub use normalize::{deep_flatten, normalise};
pub use types::{CONTENT_KEY, METAINFO_KEY, Node, Value};
