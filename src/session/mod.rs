//! Per-viewer session lifecycle
//!
//! One gateway runs per connected viewer, on its own task. It subscribes to
//! the broadcaster (backlog + live channel), replays the backlog, then serves
//! live records while exchanging keep-alive tokens with the peer. Any failure
//! on this session — send timeout, serialization error, peer silence past the
//! keep-alive window — tears down this session only.
//!
//! State machine: CONNECTING → OPEN → CLOSING → CLOSED. Deregistration from
//! the broadcaster is tied to dropping the subscription, so it happens on
//! every exit path, including task cancellation.

use crate::broadcast::Broadcaster;
use crate::record::LogRecord;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Liveness token exchanged with viewers; echoed back verbatim
pub const KEEP_ALIVE_TOKEN: &str = "heartbeat";

/// Bound on a single outbound transport send before the peer counts as dead
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection state of one viewer session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Drives one viewer connection from handshake to teardown.
///
/// The transport is a pair of text-frame channels: `outbound` carries one
/// JSON-encoded record (or an echoed keep-alive token) per frame toward the
/// peer, `inbound` carries frames received from the peer.
pub struct SessionGateway {
    broadcaster: Broadcaster,
    outbound: mpsc::Sender<String>,
    inbound: mpsc::Receiver<String>,
    keep_alive_timeout: Duration,
    state: watch::Sender<SessionState>,
}

impl SessionGateway {
    pub fn new(
        broadcaster: Broadcaster,
        outbound: mpsc::Sender<String>,
        inbound: mpsc::Receiver<String>,
        keep_alive_timeout: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Connecting);
        SessionGateway {
            broadcaster,
            outbound,
            inbound,
            keep_alive_timeout,
            state,
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Watch state transitions from outside the session task. The watch keeps
    /// reporting `Closed` after the gateway itself is gone.
    pub fn state_watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Run the session to completion. Returns the terminal state (always
    /// `Closed`); the cause of teardown is logged, never surfaced to the peer.
    pub async fn run(mut self) -> SessionState {
        let mut subscription = self.broadcaster.subscribe();
        let session = subscription.id();
        self.state.send_replace(SessionState::Open);
        info!(session, "viewer session open");

        // Backlog replay happens through the same ordered path as live
        // records. A record published mid-handoff can appear in both the
        // backlog and the live channel; viewers get at-least-once here.
        let mut healthy = true;
        for record in subscription.take_backlog() {
            if !self.send_record(session, &record).await {
                healthy = false;
                break;
            }
        }

        let mut deadline = Instant::now() + self.keep_alive_timeout;
        while healthy {
            tokio::select! {
                live = subscription.recv() => match live {
                    Some(record) => {
                        healthy = self.send_record(session, &record).await;
                    }
                    // Broadcaster shed this session (slow consumer).
                    None => break,
                },
                frame = self.inbound.recv() => match frame {
                    Some(frame) if frame == KEEP_ALIVE_TOKEN => {
                        deadline = Instant::now() + self.keep_alive_timeout;
                        healthy = self.send_frame(session, KEEP_ALIVE_TOKEN.to_string()).await;
                    }
                    Some(other) => {
                        debug!(session, frame = %other, "ignoring unexpected viewer frame");
                    }
                    None => {
                        debug!(session, "viewer disconnected");
                        break;
                    }
                },
                _ = sleep_until(deadline) => {
                    warn!(session, "keep-alive timeout, dropping viewer");
                    break;
                }
            }
        }

        self.state.send_replace(SessionState::Closing);
        drop(subscription); // deregisters from the broadcaster
        self.state.send_replace(SessionState::Closed);
        info!(session, "viewer session closed");
        SessionState::Closed
    }

    async fn send_record(&self, session: u64, record: &LogRecord) -> bool {
        match serde_json::to_string(record) {
            Ok(json) => self.send_frame(session, json).await,
            Err(e) => {
                warn!(session, error = %e, "failed to serialize record, dropping viewer");
                false
            }
        }
    }

    async fn send_frame(&self, session: u64, frame: String) -> bool {
        match self.outbound.send_timeout(frame, SEND_TIMEOUT).await {
            Ok(()) => true,
            Err(e) => {
                debug!(session, error = %e, "viewer send failed, dropping viewer");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RingBuffer;
    use crate::record::{LogLevel, LogRecord};

    fn record(n: usize) -> LogRecord {
        LogRecord::new(LogLevel::Info, "test", "run", 1, format!("msg-{}", n))
    }

    fn spawn_gateway(
        broadcaster: &Broadcaster,
        timeout: Duration,
    ) -> (
        mpsc::Receiver<String>,
        mpsc::Sender<String>,
        tokio::task::JoinHandle<SessionState>,
    ) {
        let (out_tx, out_rx) = mpsc::channel(64);
        let (in_tx, in_rx) = mpsc::channel(64);
        let gateway = SessionGateway::new(broadcaster.clone(), out_tx, in_rx, timeout);
        assert_eq!(gateway.state(), SessionState::Connecting);
        (out_rx, in_tx, tokio::spawn(gateway.run()))
    }

    #[tokio::test]
    async fn test_backlog_replayed_before_live() {
        let broadcaster = Broadcaster::new(RingBuffer::new(10));
        broadcaster.publish(record(0));
        broadcaster.publish(record(1));

        let (mut out_rx, _in_tx, handle) =
            spawn_gateway(&broadcaster, Duration::from_secs(60));

        let first: LogRecord = serde_json::from_str(&out_rx.recv().await.unwrap()).unwrap();
        let second: LogRecord = serde_json::from_str(&out_rx.recv().await.unwrap()).unwrap();
        assert_eq!(first.message, "msg-0");
        assert_eq!(second.message, "msg-1");

        broadcaster.publish(record(2));
        let live: LogRecord = serde_json::from_str(&out_rx.recv().await.unwrap()).unwrap();
        assert_eq!(live.message, "msg-2");

        drop(out_rx);
        handle.abort();
    }

    #[tokio::test]
    async fn test_heartbeat_echoed() {
        let broadcaster = Broadcaster::new(RingBuffer::new(10));
        let (mut out_rx, in_tx, handle) = spawn_gateway(&broadcaster, Duration::from_secs(60));

        in_tx.send(KEEP_ALIVE_TOKEN.to_string()).await.unwrap();
        assert_eq!(out_rx.recv().await.unwrap(), KEEP_ALIVE_TOKEN);

        handle.abort();
    }

    #[tokio::test]
    async fn test_peer_disconnect_closes_and_deregisters() {
        let broadcaster = Broadcaster::new(RingBuffer::new(10));
        let (out_rx, in_tx, handle) = spawn_gateway(&broadcaster, Duration::from_secs(60));

        // Wait for registration, then sever the inbound side.
        while broadcaster.session_count() == 0 {
            tokio::task::yield_now().await;
        }
        drop(in_tx);

        assert_eq!(handle.await.unwrap(), SessionState::Closed);
        assert_eq!(broadcaster.session_count(), 0);
        drop(out_rx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keep_alive_timeout_closes() {
        let broadcaster = Broadcaster::new(RingBuffer::new(10));
        let (out_rx, in_tx, handle) = spawn_gateway(&broadcaster, Duration::from_secs(30));

        // No heartbeat ever arrives; paused time auto-advances to the deadline.
        assert_eq!(handle.await.unwrap(), SessionState::Closed);
        assert_eq!(broadcaster.session_count(), 0);
        drop(in_tx);
        drop(out_rx);
    }

    #[tokio::test]
    async fn test_state_observable_while_running() {
        let broadcaster = Broadcaster::new(RingBuffer::new(10));
        let (out_tx, mut out_rx) = mpsc::channel(64);
        let (in_tx, in_rx) = mpsc::channel(64);
        let gateway =
            SessionGateway::new(broadcaster.clone(), out_tx, in_rx, Duration::from_secs(60));

        let mut state = gateway.state_watch();
        assert_eq!(*state.borrow(), SessionState::Connecting);
        let handle = tokio::spawn(gateway.run());

        while *state.borrow_and_update() != SessionState::Open {
            state.changed().await.unwrap();
        }

        // Session is live while the watch reports Open.
        in_tx.send(KEEP_ALIVE_TOKEN.to_string()).await.unwrap();
        assert_eq!(out_rx.recv().await.unwrap(), KEEP_ALIVE_TOKEN);

        drop(in_tx);
        assert_eq!(handle.await.unwrap(), SessionState::Closed);
        // The watch retains the terminal state after the gateway is gone.
        assert_eq!(*state.borrow(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_heartbeat_resets_deadline() {
        let broadcaster = Broadcaster::new(RingBuffer::new(10));
        let (mut out_rx, in_tx, handle) =
            spawn_gateway(&broadcaster, Duration::from_millis(200));

        // Keep the session alive past several deadline windows.
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            in_tx.send(KEEP_ALIVE_TOKEN.to_string()).await.unwrap();
            assert_eq!(out_rx.recv().await.unwrap(), KEEP_ALIVE_TOKEN);
        }
        assert_eq!(broadcaster.session_count(), 1);

        handle.abort();
    }
}
