//! Batched interaction writer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::model::InteractionLog;
use crate::storage::Storage;

/// Buffers interactions and writes them in batches.
///
/// A flush happens when the buffer reaches `batch_size` or when
/// `flush_interval` has elapsed since the previous flush. Callers must
/// flush explicitly before checkpoint, finalize and stop.
pub struct BatchWriter {
    storage: Arc<dyn Storage>,
    batch_size: usize,
    flush_interval: Duration,
    buffer: Vec<InteractionLog>,
    last_flush: Instant,
    written: u64,
}

impl std::fmt::Debug for BatchWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchWriter")
            .field("batch_size", &self.batch_size)
            .field("flush_interval", &self.flush_interval)
            .field("buffered", &self.buffer.len())
            .field("written", &self.written)
            .finish()
    }
}

impl BatchWriter {
    /// Create a writer over a storage backend
    pub fn new(storage: Arc<dyn Storage>, batch_size: usize, flush_interval: Duration) -> Self {
        Self {
            storage,
            batch_size: batch_size.max(1),
            flush_interval,
            buffer: Vec::new(),
            last_flush: Instant::now(),
            written: 0,
        }
    }

    /// Buffer one interaction, flushing if a threshold is crossed
    pub fn add(&mut self, log: InteractionLog) -> Result<()> {
        self.buffer.push(log);
        if self.buffer.len() >= self.batch_size || self.last_flush.elapsed() >= self.flush_interval
        {
            self.flush()?;
        }
        Ok(())
    }

    /// Write every buffered interaction.
    ///
    /// On failure the buffer is kept so a later flush can retry.
    pub fn flush(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.storage.log_interactions(&self.buffer)?;
            self.written += self.buffer.len() as u64;
            tracing::debug!(count = self.buffer.len(), "Flushed interaction batch");
            self.buffer.clear();
        }
        self.last_flush = Instant::now();
        Ok(())
    }

    /// Interactions waiting to be written
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Interactions written so far
    pub fn written(&self) -> u64 {
        self.written
    }
}
