//! Viewer-facing TCP endpoint
//!
//! Newline-delimited JSON transport for live log viewers: one JSON-encoded
//! record per outbound line, keep-alive tokens inbound. The accept loop spawns
//! one handler task per connection; everything per-viewer lives in that task.

mod connection;
mod query;

pub use query::QueryService;

use crate::broadcast::Broadcaster;
use crate::config::LogStreamConfig;
use connection::ViewerConnection;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};

pub struct LogStreamServer {
    config: LogStreamConfig,
    broadcaster: Broadcaster,
}

impl LogStreamServer {
    pub fn new(config: LogStreamConfig, broadcaster: Broadcaster) -> Self {
        LogStreamServer {
            config,
            broadcaster,
        }
    }

    /// Bind the configured listen address
    pub async fn bind(self) -> Result<BoundServer, std::io::Error> {
        let listener = TcpListener::bind(&self.config.listen_addr).await?;
        info!("log viewer endpoint listening on {}", self.config.listen_addr);
        Ok(BoundServer {
            listener,
            broadcaster: self.broadcaster,
            keep_alive: self.config.keep_alive_timeout(),
        })
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        self.bind().await?.serve().await;
        Ok(())
    }
}

/// A bound, not-yet-serving endpoint
pub struct BoundServer {
    listener: TcpListener,
    broadcaster: Broadcaster,
    keep_alive: Duration,
}

impl BoundServer {
    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Accept connections and spawn one handler per viewer, forever
    pub async fn serve(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let connection = ViewerConnection::new(
                        stream,
                        self.broadcaster.clone(),
                        self.keep_alive,
                        addr.to_string(),
                    );
                    tokio::spawn(async move {
                        connection.run().await;
                    });
                }
                Err(e) => {
                    error!("failed to accept viewer connection: {}", e);
                }
            }
        }
    }
}
