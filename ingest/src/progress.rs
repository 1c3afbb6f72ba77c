//! Read-progress reporting.
//!
//! [`ProgressReader`] wraps the export stream and publishes the fraction of
//! bytes read so far. The parser never sees it; it is just another `Read`.

use std::io::{self, Read};
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

/// Creates a bounded channel for progress samples.
pub fn progress_channel(capacity: usize) -> (SyncSender<f64>, Receiver<f64>) {
    sync_channel(capacity)
}

enum Publisher {
    Channel(SyncSender<f64>),
    Callback(Box<dyn FnMut(f64) + Send>),
}

/// Reader adapter reporting `read / total` in `[0, 1]` after every read.
///
/// With a channel publisher, sends never block: when the channel is full
/// the sample is dropped. The channel closes when the reader is dropped,
/// which happens when the parser finishes with its input.
///
/// # Examples
///
/// ```
/// use std::io::Read;
/// use te_ingest::{ProgressReader, progress_channel};
///
/// let data = b"<root/>";
/// let (tx, rx) = progress_channel(16);
/// let mut reader = ProgressReader::new(&data[..], data.len() as u64, tx);
/// let mut out = Vec::new();
/// reader.read_to_end(&mut out).unwrap();
/// drop(reader);
///
/// let samples: Vec<f64> = rx.iter().collect();
/// assert_eq!(samples.last().copied(), Some(1.0));
/// ```
pub struct ProgressReader<R> {
    inner: R,
    total: u64,
    read: u64,
    publisher: Publisher,
}

impl<R: Read> ProgressReader<R> {
    /// Publishes samples into `sender`, dropping them when it is full.
    pub fn new(inner: R, total: u64, sender: SyncSender<f64>) -> Self {
        Self {
            inner,
            total,
            read: 0,
            publisher: Publisher::Channel(sender),
        }
    }

    /// Calls `on_progress` with every sample.
    pub fn with_callback(inner: R, total: u64, on_progress: impl FnMut(f64) + Send + 'static) -> Self {
        Self {
            inner,
            total,
            read: 0,
            publisher: Publisher::Callback(Box::new(on_progress)),
        }
    }

    /// Bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.read
    }

    fn publish(&mut self) {
        if self.total == 0 {
            return;
        }
        let fraction = (self.read as f64 / self.total as f64).min(1.0);
        match &mut self.publisher {
            // Full or disconnected: the sample is simply lost.
            Publisher::Channel(sender) => {
                let _ = sender.try_send(fraction);
            }
            Publisher::Callback(on_progress) => on_progress(fraction),
        }
    }
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n as u64;
        self.publish();
        Ok(n)
    }
}
