//! Configuration
//!
//! Read-only layered resolution: built-in defaults, then an optional TOML
//! file, then `LOGSTREAM_*` environment variables. Validation runs once at
//! startup and is fatal — a bad directory or capacity must fail fast, before
//! any viewer connects.

use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// A setting failed validation
    Invalid { field: &'static str, reason: String },
    /// The config file could not be parsed
    Parse(toml::de::Error),
    /// I/O error reading the config file or preparing the log directory
    Io(io::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Invalid { field, reason } => {
                write!(f, "invalid config value for {}: {}", field, reason)
            }
            ConfigError::Parse(e) => write!(f, "config parse error: {}", e),
            ConfigError::Io(e) => write!(f, "config I/O error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// Runtime settings for the log distribution service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogStreamConfig {
    /// Address the viewer endpoint binds to
    pub listen_addr: String,
    /// Directory holding the active and rotated log segments
    pub log_dir: PathBuf,
    /// Number of records the ring buffer retains
    pub ring_capacity: usize,
    /// Size threshold at which the external rotation policy rolls a segment
    pub rotation_max_bytes: u64,
    /// Rotated segments kept on disk by the external retention policy
    pub retained_segments: usize,
    /// Seconds of keep-alive silence before a viewer counts as dead
    pub keep_alive_timeout_secs: u64,
    /// Per-session outbound queue depth before a slow viewer is shed
    pub session_queue: usize,
}

impl Default for LogStreamConfig {
    fn default() -> Self {
        LogStreamConfig {
            listen_addr: "127.0.0.1:9440".to_string(),
            log_dir: PathBuf::from("logs"),
            ring_capacity: 1000,
            rotation_max_bytes: 10 * 1024 * 1024,
            retained_segments: 5,
            keep_alive_timeout_secs: 60,
            session_queue: 256,
        }
    }
}

impl LogStreamConfig {
    /// Resolve configuration: defaults, then `path` (if given), then env.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                toml::from_str(&raw).map_err(ConfigError::Parse)?
            }
            None => LogStreamConfig::default(),
        };
        config.overlay_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `LOGSTREAM_*` overrides from an environment-like lookup
    fn overlay_env(
        &mut self,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = get("LOGSTREAM_LISTEN_ADDR") {
            self.listen_addr = value;
        }
        if let Some(value) = get("LOGSTREAM_LOG_DIR") {
            self.log_dir = PathBuf::from(value);
        }
        if let Some(value) = get("LOGSTREAM_RING_CAPACITY") {
            self.ring_capacity = parse(value, "ring_capacity")?;
        }
        if let Some(value) = get("LOGSTREAM_ROTATION_MAX_BYTES") {
            self.rotation_max_bytes = parse(value, "rotation_max_bytes")?;
        }
        if let Some(value) = get("LOGSTREAM_RETAINED_SEGMENTS") {
            self.retained_segments = parse(value, "retained_segments")?;
        }
        if let Some(value) = get("LOGSTREAM_KEEP_ALIVE_TIMEOUT_SECS") {
            self.keep_alive_timeout_secs = parse(value, "keep_alive_timeout_secs")?;
        }
        if let Some(value) = get("LOGSTREAM_SESSION_QUEUE") {
            self.session_queue = parse(value, "session_queue")?;
        }
        Ok(())
    }

    /// Validate settings and create the log directory if missing.
    /// Called once at startup; any failure here aborts before serving.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ring_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "ring_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.rotation_max_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "rotation_max_bytes",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.keep_alive_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "keep_alive_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.session_queue == 0 {
            return Err(ConfigError::Invalid {
                field: "session_queue",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.log_dir.exists() && !self.log_dir.is_dir() {
            return Err(ConfigError::Invalid {
                field: "log_dir",
                reason: format!("{} exists and is not a directory", self.log_dir.display()),
            });
        }
        if !self.log_dir.exists() {
            std::fs::create_dir_all(&self.log_dir)?;
        }
        Ok(())
    }

    pub fn keep_alive_timeout(&self) -> Duration {
        Duration::from_secs(self.keep_alive_timeout_secs)
    }
}

fn parse<T: std::str::FromStr>(value: String, field: &'static str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        field,
        reason: e.to_string(),
    })
}
