//! Destination for persisted records.

use te_sqlite::Store;

/// Receives `(hjid, type, data)` records in document order.
///
/// Implemented by [`Store`]; [`MemorySink`] collects records in memory.
pub trait RecordSink {
    fn insert(&mut self, hjid: &str, element_type: &str, data: &str) -> te_sqlite::Result<()>;

    /// Makes every inserted record durable.
    fn flush(&mut self) -> te_sqlite::Result<()>;
}

impl RecordSink for Store {
    fn insert(&mut self, hjid: &str, element_type: &str, data: &str) -> te_sqlite::Result<()> {
        Store::insert(self, hjid, element_type, data)
    }

    fn flush(&mut self) -> te_sqlite::Result<()> {
        Store::flush(self)
    }
}

/// A record as handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub hjid: String,
    pub element_type: String,
    pub data: String,
}

/// Sink that keeps every record in a vector.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub records: Vec<Record>,
    pub flushes: usize,
}

impl RecordSink for MemorySink {
    fn insert(&mut self, hjid: &str, element_type: &str, data: &str) -> te_sqlite::Result<()> {
        self.records.push(Record {
            hjid: hjid.to_string(),
            element_type: element_type.to_string(),
            data: data.to_string(),
        });
        Ok(())
    }

    fn flush(&mut self) -> te_sqlite::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
