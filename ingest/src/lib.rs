//! Streaming ingest of TARIC XML exports.
//!
//! The export nests its business elements at a fixed depth below the
//! document root. This crate reads the document as a stream, assembles one
//! element tree at a time, normalises it with [`te_core::normalise`], and
//! writes it as JSON into a [`te_sqlite::Store`] keyed by its `hjid`.
//! Memory use is bounded by the size of a single top-level element.
//!
//! # Main entry points
//!
//! - [`parse`]: parse into a store with the default configuration.
//! - [`Parser`]: parse with an explicit [`te_core::IngestConfig`] into any
//!   [`RecordSink`].
//! - [`ProgressReader`]: wrap the input to observe read progress.
//!
//! # Example
//!
//! ```no_run
//! use std::fs::File;
//! use te_sqlite::Store;
//!
//! let input = File::open("export.xml").unwrap();
//! let mut store = Store::open("tariff.db").unwrap();
//! let summary = te_ingest::parse(input, &mut store).unwrap();
//! println!("{} elements", summary.records);
//! store.close().unwrap();
//! ```
//!
//! # Pipeline
//!
//! bytes → [`EventReader`] → [`TreeBuilder`] → normalise → JSON →
//! [`RecordSink::insert`] → [`RecordSink::flush`] at end of input.

pub mod builder;
pub mod event;
pub mod parser;
pub mod progress;
pub mod sink;

mod error;

pub use builder::{CompletedElement, TreeBuilder};
pub use error::{IngestError, Result};
pub use event::{Event, EventReader};
pub use parser::{IDENTIFIER_KEY, IngestSummary, MISSING_IDENTIFIER, Parser, identifier, parse};
pub use progress::{ProgressReader, progress_channel};
pub use sink::{MemorySink, Record, RecordSink};
