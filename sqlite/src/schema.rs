//! SQL schema for the element store.
//!
//! # Table structure
//!
//! - `elements(hjid, type, data)`: one row per top-level element, keyed by
//!   its stable identifier, with the normalised JSON payload in `data`.
//! - `idx_elements_type`: secondary index for per-type listings.
//! - `type_counts`: view of `(type, count)`, largest first, ties by name.

/// Creates the table, index, and view. Safe to run on every open.
pub(crate) const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS elements (
    hjid TEXT PRIMARY KEY,
    type TEXT NOT NULL,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_elements_type ON elements(type);

CREATE VIEW IF NOT EXISTS type_counts AS
    SELECT type, COUNT(*) AS count FROM elements GROUP BY type
    ORDER BY count DESC, type ASC;
"#;

/// Removes every previously ingested row.
pub(crate) const TRUNCATE_SQL: &str = "DELETE FROM elements";

/// Last-write-wins insert used by default.
pub(crate) const INSERT_OR_REPLACE_SQL: &str =
    "INSERT OR REPLACE INTO elements (hjid, type, data) VALUES (?1, ?2, ?3)";

/// Plain insert; a repeated identifier violates the primary key.
pub(crate) const INSERT_SQL: &str = "INSERT INTO elements (hjid, type, data) VALUES (?1, ?2, ?3)";

pub(crate) const TYPE_COUNTS_SQL: &str =
    "SELECT type, count FROM type_counts ORDER BY count DESC, type ASC";

// rowid order is insertion order, so pages follow document order.
pub(crate) const ELEMENTS_PAGE_SQL: &str =
    "SELECT hjid, type, data FROM elements WHERE type = ?1 ORDER BY rowid LIMIT ?2 OFFSET ?3";

pub(crate) const ELEMENT_COUNT_SQL: &str = "SELECT COUNT(*) FROM elements WHERE type = ?1";

pub(crate) const ELEMENT_SQL: &str = "SELECT hjid, type, data FROM elements WHERE hjid = ?1";

pub(crate) const TABLE_EXISTS_SQL: &str =
    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'elements'";
