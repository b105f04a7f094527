//! Socket adapter for one viewer
//!
//! Bridges a line-framed TCP stream onto the gateway's channel-pair
//! transport. The reader and writer halves run as side tasks; they wind down
//! on their own once the gateway drops its ends of the channels.

use crate::broadcast::Broadcaster;
use crate::session::SessionGateway;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, info};

/// Inbound frames longer than this are a protocol violation, not a log line
const MAX_FRAME_LEN: usize = 64 * 1024;

pub(crate) struct ViewerConnection {
    stream: TcpStream,
    broadcaster: Broadcaster,
    keep_alive: Duration,
    peer: String,
}

impl ViewerConnection {
    pub(crate) fn new(
        stream: TcpStream,
        broadcaster: Broadcaster,
        keep_alive: Duration,
        peer: String,
    ) -> Self {
        ViewerConnection {
            stream,
            broadcaster,
            keep_alive,
            peer,
        }
    }

    pub(crate) async fn run(self) {
        info!("viewer connected: {}", self.peer);

        let framed = Framed::new(self.stream, LinesCodec::new_with_max_length(MAX_FRAME_LEN));
        let (mut sink, mut source) = framed.split();

        let (out_tx, mut out_rx) = mpsc::channel::<String>(64);
        let (in_tx, in_rx) = mpsc::channel::<String>(64);

        let peer = self.peer.clone();
        let writer = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = sink.send(frame).await {
                    debug!("write to viewer {} failed: {}", peer, e);
                    break;
                }
            }
        });

        let peer = self.peer.clone();
        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(line) => {
                        if in_tx.send(line).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("read from viewer {} failed: {}", peer, e);
                        break;
                    }
                }
            }
            // in_tx drops here; the gateway sees it as a disconnect.
        });

        let gateway =
            SessionGateway::new(self.broadcaster, out_tx, in_rx, self.keep_alive);
        gateway.run().await;

        // The gateway released its channel ends; both halves unwind.
        let _ = writer.await;
        reader.abort();
        info!("viewer disconnected: {}", self.peer);
    }
}
