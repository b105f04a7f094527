//! Bounded ring buffer of recent log records
//!
//! Holds the most recent N records so a newly connected viewer can be brought
//! up to date before live streaming begins. FIFO eviction: arrival recency is
//! the only signal. Contents are in-memory only and lost on restart.

use crate::record::LogRecord;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Default number of records retained
pub const DEFAULT_CAPACITY: usize = 1000;

/// Fixed-capacity FIFO of the most recent log records.
///
/// Cheap to clone; all clones share the same underlying buffer. Pushes are
/// O(1) and never block on readers for longer than a snapshot copy; snapshots
/// are copy-on-read, so a push after the copy cannot tear a snapshot already
/// taken.
#[derive(Clone)]
pub struct RingBuffer {
    inner: Arc<Mutex<VecDeque<LogRecord>>>,
    capacity: usize,
}

impl RingBuffer {
    /// Create a buffer retaining at most `capacity` records (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        RingBuffer {
            inner: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append a record, evicting the oldest if at capacity.
    ///
    /// Never blocks beyond the internal lock, never fails.
    pub fn push(&self, record: LogRecord) {
        let mut queue = self.inner.lock();
        if queue.len() == self.capacity {
            queue.pop_front();
        }
        queue.push_back(record);
    }

    /// Current contents, oldest first, as an owned copy
    pub fn snapshot(&self) -> Vec<LogRecord> {
        self.inner.lock().iter().cloned().collect()
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True when no records have been pushed yet
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        RingBuffer::new(DEFAULT_CAPACITY)
    }
}
