//! Read queries backing the browse commands.
//!
//! These work on both write and read-only handles. A read-only handle sees
//! the store as of the last committed batch.

use rusqlite::{OptionalExtension, Row, params};
use te_core::Node;

use crate::error::{Result, StoreError};
use crate::schema::{ELEMENT_COUNT_SQL, ELEMENT_SQL, ELEMENTS_PAGE_SQL, TYPE_COUNTS_SQL};
use crate::store::Store;

/// Number of stored elements of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCount {
    pub element_type: String,
    pub count: usize,
}

/// One persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Stable identifier (primary key).
    pub hjid: String,
    /// Local name of the top-level XML element.
    pub element_type: String,
    /// Normalised element tree as JSON.
    pub data: String,
}

impl Element {
    /// Parses the JSON payload back into a tree.
    pub fn payload(&self) -> serde_json::Result<Node> {
        serde_json::from_str(&self.data)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            hjid: row.get(0)?,
            element_type: row.get(1)?,
            data: row.get(2)?,
        })
    }
}

impl Store {
    /// Returns `(type, count)` pairs, largest count first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] if the query fails.
    pub fn type_counts(&self) -> Result<Vec<TypeCount>> {
        let mut stmt = self.conn.prepare(TYPE_COUNTS_SQL).map_err(StoreError::Read)?;
        let counts = stmt
            .query_map([], |row| {
                Ok(TypeCount {
                    element_type: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                })
            })
            .map_err(StoreError::Read)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Read)?;
        Ok(counts)
    }

    /// Returns one page of elements of the given type in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] if the query fails.
    pub fn elements(&self, element_type: &str, limit: usize, offset: usize) -> Result<Vec<Element>> {
        let mut stmt = self.conn.prepare(ELEMENTS_PAGE_SQL).map_err(StoreError::Read)?;
        let elements = stmt
            .query_map(
                params![element_type, limit as i64, offset as i64],
                Element::from_row,
            )
            .map_err(StoreError::Read)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Read)?;
        Ok(elements)
    }

    /// Counts elements of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] if the query fails.
    pub fn element_count(&self, element_type: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(ELEMENT_COUNT_SQL, params![element_type], |row| row.get(0))
            .map_err(StoreError::Read)?;
        Ok(count as usize)
    }

    /// Looks up one element by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no such element exists, or
    /// [`StoreError::Read`] if the query fails.
    pub fn element(&self, hjid: &str) -> Result<Element> {
        self.conn
            .query_row(ELEMENT_SQL, params![hjid], Element::from_row)
            .optional()
            .map_err(StoreError::Read)?
            .ok_or_else(|| StoreError::NotFound(hjid.to_string()))
    }
}
