//! Store handle: opening, batched writes, and closing.
//!
//! A write handle keeps one transaction open at a time and commits it every
//! `batch_size` inserts, so committed state only ever advances in whole
//! batches. Read queries live in the `query` module.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, ErrorCode, OpenFlags, params};
use te_core::{DEFAULT_BATCH_SIZE, IngestConfig};
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::schema::{
    INSERT_OR_REPLACE_SQL, INSERT_SQL, SCHEMA_SQL, TABLE_EXISTS_SQL, TRUNCATE_SQL,
};

/// How an insert treats an identifier that is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Overwrite the existing row (last write wins).
    #[default]
    Replace,
    /// Fail with [`StoreError::DuplicateIdentifier`].
    Reject,
}

/// Whether a handle may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadWrite,
    ReadOnly,
}

/// Write-path settings for [`Store::open_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Inserts per committed transaction.
    pub batch_size: usize,
    /// Treatment of repeated identifiers.
    pub duplicates: DuplicatePolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            duplicates: DuplicatePolicy::Replace,
        }
    }
}

impl From<&IngestConfig> for StoreOptions {
    fn from(config: &IngestConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            duplicates: if config.strict {
                DuplicatePolicy::Reject
            } else {
                DuplicatePolicy::Replace
            },
        }
    }
}

/// Handle to the element database.
///
/// Obtain a write handle with [`open`](Self::open) (which truncates existing
/// rows) or a read-only handle with [`open_read_only`](Self::open_read_only).
///
/// Dropping a write handle without [`flush`](Self::flush) loses the open
/// batch: SQLite rolls back uncommitted work when the connection closes.
///
/// # Examples
///
/// ```no_run
/// use te_sqlite::Store;
///
/// let mut store = Store::open("tariff.db").unwrap();
/// store.insert("1", "Measure", r#"{"hjid":"1"}"#).unwrap();
/// store.flush().unwrap();
///
/// for tc in store.type_counts().unwrap() {
///     println!("{}: {}", tc.element_type, tc.count);
/// }
/// store.close().unwrap();
/// ```
pub struct Store {
    pub(crate) conn: Connection,
    path: PathBuf,
    mode: AccessMode,
    options: StoreOptions,
    in_batch: bool,
    pending: usize,
}

impl Store {
    /// Opens a write handle with default options.
    ///
    /// Creates the parent directory if needed, enables write-ahead logging,
    /// applies the schema, deletes all existing rows, and begins the first
    /// batch.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CreateDir`] or [`StoreError::Init`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, StoreOptions::default())
    }

    /// Opens a write handle with explicit batch and duplicate settings.
    pub fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(&path).map_err(init_error(&path))?;
        let journal: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(init_error(&path))?;
        conn.execute_batch(SCHEMA_SQL).map_err(init_error(&path))?;
        let cleared = conn.execute(TRUNCATE_SQL, []).map_err(init_error(&path))?;
        info!(path = %path.display(), journal = %journal, cleared, "Opened store for ingest");

        let mut store = Self {
            conn,
            path,
            mode: AccessMode::ReadWrite,
            options: StoreOptions {
                batch_size: options.batch_size.max(1),
                ..options
            },
            in_batch: false,
            pending: 0,
        };
        if let Err(err) = store.begin_batch() {
            return Err(match err {
                StoreError::Commit(source) => StoreError::Init {
                    path: store.path,
                    source,
                },
                other => other,
            });
        }
        Ok(store)
    }

    /// Opens an existing store for reading only. Never modifies the file.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Init`] if the file cannot be opened, or
    /// [`StoreError::NotInitialised`] if it holds no `elements` table.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(init_error(&path))?;

        let tables: i64 = conn
            .query_row(TABLE_EXISTS_SQL, [], |row| row.get(0))
            .map_err(init_error(&path))?;
        if tables == 0 {
            return Err(StoreError::NotInitialised { path });
        }
        debug!(path = %path.display(), "Opened store read-only");

        Ok(Self {
            conn,
            path,
            mode: AccessMode::ReadOnly,
            options: StoreOptions::default(),
            in_batch: false,
            pending: 0,
        })
    }

    /// Adds a record to the current batch, committing when the batch fills.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReadOnly`] on a read-only handle,
    /// [`StoreError::DuplicateIdentifier`] when rejecting duplicates,
    /// [`StoreError::Write`] on other insert failures, or
    /// [`StoreError::Commit`] if the batch commit fails.
    pub fn insert(&mut self, hjid: &str, element_type: &str, data: &str) -> Result<()> {
        if self.mode == AccessMode::ReadOnly {
            return Err(StoreError::ReadOnly);
        }
        if !self.in_batch {
            self.begin_batch()?;
        }

        let sql = match self.options.duplicates {
            DuplicatePolicy::Replace => INSERT_OR_REPLACE_SQL,
            DuplicatePolicy::Reject => INSERT_SQL,
        };
        {
            let mut stmt = self
                .conn
                .prepare_cached(sql)
                .map_err(|source| write_error(source, hjid))?;
            stmt.execute(params![hjid, element_type, data])
                .map_err(|source| write_error(source, hjid))?;
        }

        self.pending += 1;
        if self.pending >= self.options.batch_size {
            self.commit_batch()?;
            self.begin_batch()?;
        }
        Ok(())
    }

    /// Commits the current batch, if any. Calling it again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Commit`] if the commit fails.
    pub fn flush(&mut self) -> Result<()> {
        if self.in_batch {
            self.commit_batch()?;
        }
        Ok(())
    }

    /// Rolls back any uncommitted batch and closes the connection.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Close`] if SQLite refuses to close.
    pub fn close(mut self) -> Result<()> {
        if self.in_batch {
            match self.conn.execute_batch("ROLLBACK") {
                Ok(()) => warn!(rows = self.pending, "Rolled back uncommitted batch"),
                Err(e) => warn!(error = %e, "Failed to roll back batch"),
            }
            self.in_batch = false;
        }
        debug!(path = %self.path.display(), "Closing store");
        self.conn.close().map_err(|(_, source)| StoreError::Close(source))
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn options(&self) -> StoreOptions {
        self.options
    }

    /// Number of inserts in the open, uncommitted batch.
    pub fn pending(&self) -> usize {
        self.pending
    }

    fn begin_batch(&mut self) -> Result<()> {
        self.conn
            .execute_batch("BEGIN")
            .map_err(StoreError::Commit)?;
        self.in_batch = true;
        self.pending = 0;
        Ok(())
    }

    fn commit_batch(&mut self) -> Result<()> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(StoreError::Commit)?;
        debug!(rows = self.pending, "Committed batch");
        self.in_batch = false;
        self.pending = 0;
        Ok(())
    }
}

fn init_error(path: &Path) -> impl FnOnce(rusqlite::Error) -> StoreError + '_ {
    move |source| StoreError::Init {
        path: path.to_path_buf(),
        source,
    }
}

fn write_error(source: rusqlite::Error, hjid: &str) -> StoreError {
    if source.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
        StoreError::DuplicateIdentifier(hjid.to_string())
    } else {
        StoreError::Write {
            hjid: hjid.to_string(),
            source,
        }
    }
}
