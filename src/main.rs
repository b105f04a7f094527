use logstream::{BroadcastLayer, Broadcaster, LogStreamConfig, LogStreamServer, RingBuffer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Optional config file: first CLI argument, else ./logstream.toml if present.
    let config_path = std::env::args().nth(1).map(PathBuf::from).or_else(|| {
        let default = Path::new("logstream.toml");
        default.exists().then(|| default.to_path_buf())
    });

    let config = match LogStreamConfig::load(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("configuration error: {}", e);
        std::process::exit(1);
    }

    let buffer = RingBuffer::new(config.ring_capacity);
    let broadcaster = Broadcaster::with_session_queue(buffer, config.session_queue);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(BroadcastLayer::new(broadcaster.clone()))
        .init();

    info!("starting logstream (log_dir: {})", config.log_dir.display());

    // Periodic heartbeat so a freshly connected viewer sees traffic even on an
    // otherwise quiet instance.
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(30));
        loop {
            tick.tick().await;
            info!(target: "app.heartbeat", "service alive");
        }
    });

    let server = LogStreamServer::new(config, broadcaster);
    if let Err(e) = server.run().await {
        error!("server terminated: {}", e);
        std::process::exit(1);
    }
}
