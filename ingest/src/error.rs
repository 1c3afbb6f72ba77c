//! Error types for the ingest pipeline.
//!
//! Every variant is fatal for a run. Variants raised for a specific element
//! carry its identifier and type so the failing record can be found in the
//! source export.

use te_sqlite::StoreError;
use thiserror::Error;

/// Errors that abort an ingest run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The XML reader failed before end of input.
    #[error("reading XML event at byte {position}: {source}")]
    ReadInput {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// The event sequence does not nest properly.
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A top-level element closed without a scalar `hjid` (strict mode).
    #[error("{element_type} element has no hjid")]
    MissingIdentifier { element_type: String },

    /// The normalised tree could not be serialised.
    #[error("marshalling element {hjid}: {source}")]
    Serialise {
        hjid: String,
        #[source]
        source: serde_json::Error,
    },

    /// The store rejected a record.
    #[error("inserting element {hjid} ({element_type}): {source}")]
    Store {
        hjid: String,
        element_type: String,
        #[source]
        source: StoreError,
    },

    /// The final commit failed.
    #[error("flushing store: {0}")]
    Flush(#[source] StoreError),
}

impl IngestError {
    pub(crate) fn read(position: u64, source: impl Into<quick_xml::Error>) -> Self {
        Self::ReadInput {
            position,
            source: source.into(),
        }
    }
}

/// Convenience alias for results with [`IngestError`].
pub type Result<T> = std::result::Result<T, IngestError>;
