//! Live log fan-out
//!
//! The broadcaster owns the session registry and the ring buffer feed. Every
//! published record is pushed into the ring buffer and then offered to each
//! registered session over its own bounded channel. A session that cannot
//! accept a record (full channel, dropped receiver) is closed and removed;
//! nothing a single viewer does can fail `publish` or starve other viewers.
//!
//! ```text
//! log event ──► publish ──► RingBuffer.push
//!                     └───► try_send ──► session 1
//!                     └───► try_send ──► session 2
//!                     └───► try_send ──► ...
//! ```
//!
//! New viewers go through [`Broadcaster::subscribe`], which snapshots the
//! ring buffer and registers the session under one registry lock. Every record
//! therefore lands in the backlog, the live channel, or both — the handoff is
//! at-least-once, never a gap. Callers replaying the backlog must tolerate a
//! record that was published mid-handoff arriving twice.

mod layer;

pub use layer::BroadcastLayer;

use crate::buffer::RingBuffer;
use crate::record::LogRecord;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Unique id of a viewer session
pub type SessionId = u64;

/// Records a session can have queued before it is considered too slow.
pub const DEFAULT_SESSION_QUEUE: usize = 256;

type Registry = Arc<Mutex<HashMap<SessionId, mpsc::Sender<LogRecord>>>>;

/// The registered (sending) half of a viewer session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    tx: mpsc::Sender<LogRecord>,
}

impl SessionHandle {
    pub fn new(id: SessionId, tx: mpsc::Sender<LogRecord>) -> Self {
        SessionHandle { id, tx }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }
}

/// Fan-out hub feeding the ring buffer and all live sessions.
///
/// Cheap to clone; clones share the registry and buffer.
#[derive(Clone)]
pub struct Broadcaster {
    buffer: RingBuffer,
    registry: Registry,
    next_id: Arc<AtomicU64>,
    session_queue: usize,
}

impl Broadcaster {
    pub fn new(buffer: RingBuffer) -> Self {
        Self::with_session_queue(buffer, DEFAULT_SESSION_QUEUE)
    }

    /// `session_queue` bounds each session's outbound channel; a session whose
    /// queue fills up is shed rather than slowing the publisher.
    pub fn with_session_queue(buffer: RingBuffer, session_queue: usize) -> Self {
        Broadcaster {
            buffer,
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            session_queue: session_queue.max(1),
        }
    }

    /// The ring buffer this broadcaster feeds
    pub fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }

    /// Publish one record: ring push, then best-effort delivery to every
    /// registered session.
    ///
    /// Never blocks on a viewer and never returns an error; per-session
    /// failures close only that session. `try_send` under the registry lock is
    /// non-blocking, so publishes, registrations and unregistrations serialize
    /// cleanly without torn iteration.
    pub fn publish(&self, record: LogRecord) {
        self.buffer.push(record.clone());

        let mut registry = self.registry.lock();
        if registry.is_empty() {
            return;
        }
        let mut dropped = Vec::new();
        for (&id, tx) in registry.iter() {
            if let Err(e) = tx.try_send(record.clone()) {
                match e {
                    mpsc::error::TrySendError::Full(_) => {
                        debug!(session = id, "viewer too slow, dropping session");
                    }
                    mpsc::error::TrySendError::Closed(_) => {
                        debug!(session = id, "viewer channel closed, dropping session");
                    }
                }
                dropped.push(id);
            }
        }
        for id in dropped {
            registry.remove(&id);
        }
    }

    /// Atomically snapshot the ring buffer and register a new session.
    ///
    /// The returned subscription deregisters itself on drop, so registry
    /// membership is release-paired with the session's lifetime even when the
    /// owning task is cancelled.
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.session_queue);

        let backlog = {
            let mut registry = self.registry.lock();
            let backlog = self.buffer.snapshot();
            registry.insert(id, tx);
            backlog
        };
        debug!(session = id, backlog = backlog.len(), "session subscribed");

        Subscription {
            id,
            backlog,
            rx,
            registry: self.registry.clone(),
        }
    }

    /// Register an externally built session handle. Re-registering the same id
    /// replaces the previous channel.
    pub fn register(&self, handle: SessionHandle) {
        self.registry.lock().insert(handle.id, handle.tx);
    }

    /// Remove a session. Unknown or already-removed ids are a no-op.
    pub fn unregister(&self, id: SessionId) {
        self.registry.lock().remove(&id);
    }

    /// Number of currently registered sessions
    pub fn session_count(&self) -> usize {
        self.registry.lock().len()
    }
}

/// A registered session's receiving side plus its backlog.
///
/// Dropping the subscription unregisters the session.
pub struct Subscription {
    id: SessionId,
    backlog: Vec<LogRecord>,
    rx: mpsc::Receiver<LogRecord>,
    registry: Registry,
}

impl Subscription {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Ring buffer contents captured at registration, oldest first.
    /// Consumed by the backlog replay; empty afterwards.
    pub fn take_backlog(&mut self) -> Vec<LogRecord> {
        std::mem::take(&mut self.backlog)
    }

    /// Next live record, `None` once the session has been dropped by the
    /// broadcaster and the queue is drained.
    pub async fn recv(&mut self) -> Option<LogRecord> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.id);
    }
}
