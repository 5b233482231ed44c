use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Returns the current UTC time formatted as an RFC 9557 timestamp with millisecond precision.
pub fn current_datetime_rfc9557() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// # Log Level
///
/// Numeric severity scale shared by every `LoggerLocal` output channel.
/// The numbers are stable because option lists (`use_tty`, `use_file`) refer to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(i64)]
pub enum LogLevel {
    /// Very fine-grained chatter, rarely enabled.
    Silly = 0,
    /// Execution flow tracing.
    Trace = 1,
    /// Internal details useful while debugging a specific problem.
    Debug = 2,
    /// Normal progress events.
    Info = 3,
    /// Unusual situations the client recovered from.
    Warn = 4,
    /// A failed operation.
    Error = 5,
    /// A failure that leaves the component unusable.
    Fatal = 6,
}

impl LogLevel {
    /// All levels, lowest severity first.
    pub const ALL: [LogLevel; 7] = [
        LogLevel::Silly,
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Fatal,
    ];

    /// Maps a raw numeric level back to a `LogLevel`. Out-of-range values clamp to the nearest end.
    pub fn from_i64(level: i64) -> Self {
        match level {
            i64::MIN..=0 => LogLevel::Silly,
            1 => LogLevel::Trace,
            2 => LogLevel::Debug,
            3 => LogLevel::Info,
            4 => LogLevel::Warn,
            5 => LogLevel::Error,
            _ => LogLevel::Fatal,
        }
    }

    /// The equivalent `log` facade level. `Silly` folds into `Trace` and `Fatal` into `Error`.
    pub fn as_log_level(self) -> log::Level {
        match self {
            LogLevel::Silly | LogLevel::Trace => log::Level::Trace,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error | LogLevel::Fatal => log::Level::Error,
        }
    }

    /// Upper-case label used in file output.
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Silly => "SILLY",
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }
}

/// # Logrecord
///
/// A single structured log entry as produced by `LoggerLocal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Logrecord {
    /// The severity level (0 = Silly .. 6 = Fatal).
    pub loglevel: i64,
    /// Details about the message content.
    pub message: Message,
    /// Information about the application generating the log.
    pub app: App,
    /// Flexible JSON value for arbitrary tags or additional metadata.
    pub tags: Value,
    /// RFC 9557 formatted timestamp string.
    pub rfc9557: String,
}

impl Default for Logrecord {
    /// Creates an empty record stamped with the current time and an empty tag list.
    fn default() -> Self {
        Self {
            loglevel: 0,
            message: Message::default(),
            app: App::default(),
            tags: serde_json::json!([]),
            rfc9557: current_datetime_rfc9557(),
        }
    }
}

impl Logrecord {
    /// `true` when the record carries extra structured data worth printing.
    pub fn has_tags(&self) -> bool {
        !(self.tags.is_null() || self.tags == serde_json::json!([]))
    }
}

/// # Message
///
/// The textual content of a log entry, including its language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// The language of the message (e.g., "en" for English).
    pub lang: String,
    /// The actual text content of the message.
    pub text: String,
}

impl Default for Message {
    fn default() -> Self {
        Self {
            text: String::new(),
            lang: "en".to_string(),
        }
    }
}

/// # App
///
/// Identifies the process that generated the log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct App {
    /// The process ID (PID) of the application.
    pub pid: i64,
    /// The name of the application.
    pub name: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            pid: std::process::id() as i64,
            name: String::new(),
        }
    }
}
