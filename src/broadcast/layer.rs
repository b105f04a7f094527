//! Bridge from `tracing` events to the broadcaster
//!
//! Installed next to the normal fmt/file subscribers so every application log
//! line is also offered to live viewers, mirroring how the console and file
//! sinks see it. Events emitted by this crate's own distribution pipeline are
//! skipped: broadcasting a "viewer too slow" debug line to viewers would feed
//! the pipeline its own output.

use super::Broadcaster;
use crate::record::{LogLevel, LogRecord};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Targets under this prefix are never re-broadcast
const SELF_TARGET: &str = env!("CARGO_PKG_NAME");

/// `tracing_subscriber` layer publishing every event as a [`LogRecord`]
pub struct BroadcastLayer {
    broadcaster: Broadcaster,
}

impl BroadcastLayer {
    pub fn new(broadcaster: Broadcaster) -> Self {
        BroadcastLayer { broadcaster }
    }
}

impl<S: Subscriber> Layer<S> for BroadcastLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if meta.target().starts_with(SELF_TARGET) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let function = meta
            .module_path()
            .and_then(|path| path.rsplit("::").next())
            .unwrap_or("");

        let record = LogRecord::new(
            LogLevel::from(meta.level()),
            meta.target(),
            function,
            meta.line().unwrap_or(0),
            visitor.finish(),
        );
        self.broadcaster.publish(record);
    }
}

/// Collects the `message` field; other fields are appended as `key=value`
#[derive(Default)]
struct MessageVisitor {
    message: String,
    extras: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.append(field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.append(field.name(), &format!("{:?}", value));
        }
    }
}

impl MessageVisitor {
    fn append(&mut self, key: &str, value: &str) {
        if !self.extras.is_empty() {
            self.extras.push(' ');
        }
        self.extras.push_str(key);
        self.extras.push('=');
        self.extras.push_str(value);
    }

    fn finish(self) -> String {
        match (self.message.is_empty(), self.extras.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.extras,
            (false, false) => format!("{} {}", self.message, self.extras),
        }
    }
}
