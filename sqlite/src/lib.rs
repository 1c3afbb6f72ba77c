//! SQLite store for normalised TARIC elements.
//!
//! Records are `(hjid, type, data)` tuples where `data` is the JSON form of a
//! normalised element tree. The store is written once per ingest run and
//! then browsed read-only.
//!
//! # Architecture
//!
//! - **`schema`**: table, index and `type_counts` view SQL
//! - **`store`**: open modes, batched inserts, flush and close
//! - **`query`**: type counts, paginated listings and lookups
//!
//! # Quick start: ingest
//!
//! ```no_run
//! use te_sqlite::{Store, StoreOptions};
//!
//! let mut store = Store::open_with("tariff.db", StoreOptions::default()).unwrap();
//! store.insert("1", "Measure", r#"{"hjid":"1","sid":"100"}"#).unwrap();
//! store.flush().unwrap();
//! store.close().unwrap();
//! ```
//!
//! # Quick start: browse
//!
//! ```no_run
//! use te_sqlite::Store;
//!
//! let store = Store::open_read_only("tariff.db").unwrap();
//! let total = store.element_count("Measure").unwrap();
//! for element in store.elements("Measure", 20, 0).unwrap() {
//!     println!("{} ({total} total)", element.hjid);
//! }
//! ```
//!
//! # Write batching
//!
//! Inserts accumulate in one open transaction and are committed every
//! `batch_size` rows. Readers therefore observe the store advancing in whole
//! batches, and an aborted run leaves a committed prefix behind. Opening a
//! write handle truncates the table, so the next run starts clean.

mod error;
mod path;
mod query;
mod schema;
mod store;

pub use error::{Result, StoreError};
pub use path::default_db_path;
pub use query::{Element, TypeCount};
pub use store::{AccessMode, DuplicatePolicy, Store, StoreOptions};
