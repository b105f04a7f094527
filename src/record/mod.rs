//! Log record values
//!
//! A `LogRecord` is created once at the emission site and never mutated
//! afterwards; the ring buffer and every session queue hold their own copies.
//! The wire shape (field names and the `formatted` layout) is what viewers
//! render directly, so it is part of the external contract.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity of a log record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    /// Upper-case name as rendered in `formatted` output
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" | "CRITICAL" => Ok(LogLevel::Fatal),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        if *level == tracing::Level::TRACE {
            LogLevel::Trace
        } else if *level == tracing::Level::DEBUG {
            LogLevel::Debug
        } else if *level == tracing::Level::INFO {
            LogLevel::Info
        } else if *level == tracing::Level::WARN {
            LogLevel::Warn
        } else {
            LogLevel::Error
        }
    }
}

/// Timestamp format used on the wire and in `formatted` lines
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

mod wire_time {
    use super::TIME_FORMAT;
    use chrono::{DateTime, Local, NaiveDateTime};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(time: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&time.format(TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Local>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let naive =
            NaiveDateTime::parse_from_str(&s, TIME_FORMAT).map_err(serde::de::Error::custom)?;
        naive
            .and_local_timezone(Local)
            .earliest()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid local time: {}", s)))
    }
}

/// One emitted log event, immutable after creation.
///
/// Wire fields: `time`, `level`, `name`, `function`, `line`, `message`,
/// `formatted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Emission time, rendered as `YYYY-MM-DD HH:MM:SS.mmm`
    #[serde(with = "wire_time")]
    pub time: DateTime<Local>,
    /// Severity
    pub level: LogLevel,
    /// Logger (module) name
    pub name: String,
    /// Function the event was emitted from
    pub function: String,
    /// Source line number
    pub line: u32,
    /// Raw message text
    pub message: String,
    /// Pre-formatted display line
    pub formatted: String,
}

impl LogRecord {
    /// Create a record stamped with the current local time
    pub fn new(
        level: LogLevel,
        name: impl Into<String>,
        function: impl Into<String>,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        Self::at(Local::now(), level, name, function, line, message)
    }

    /// Create a record with an explicit timestamp
    pub fn at(
        time: DateTime<Local>,
        level: LogLevel,
        name: impl Into<String>,
        function: impl Into<String>,
        line: u32,
        message: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let function = function.into();
        let message = message.into();
        let formatted = format!(
            "{} | {:<8} | {}:{}:{} | {}",
            time.format(TIME_FORMAT),
            level.as_str(),
            name,
            function,
            line,
            message
        );
        LogRecord {
            time,
            level,
            name,
            function,
            line,
            message,
            formatted,
        }
    }
}
