use super::logrecord::{LogLevel, Logrecord};
use chrono::Local;
use colored::*;
use glob::glob;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
/// # Logger Local Options
///
/// Configuration options for the `LoggerLocal` instance, controlling where and how
/// log messages are output.
pub struct LoggerLocalOptions {
    /// A list of log levels that should be printed to the TTY (console).
    pub use_tty: Option<Vec<i64>>,
    /// A list of log levels that should be written to a log file.
    pub use_file: Option<Vec<i64>>,
    /// The directory where log files should be stored. If `None`, defaults to `./logs`.
    pub log_dir: Option<PathBuf>,
    /// Forward every record to the `log` facade as well.
    #[serde(default)]
    pub forward_to_log: bool,
}

impl LoggerLocalOptions {
    /// No console, no file, no forwarding. Used by tests and embedders that only want `log` output.
    pub fn silent() -> Self {
        Self::default()
    }

    /// Console output from `Info` upwards, forwarded to the `log` facade.
    pub fn console() -> Self {
        Self {
            use_tty: Some(vec![3, 4, 5, 6]),
            use_file: None,
            log_dir: None,
            forward_to_log: true,
        }
    }
}

/// # Logger Local
///
/// Structured logger shared (behind an `Arc`) by every NSE client component.
/// Each record can go to the console, to a timestamped file and to the `log` facade.
pub struct LoggerLocal {
    /// The name of the application associated with this logger instance.
    app_name: String,
    /// Configuration options determining logging behavior.
    options: LoggerLocalOptions,
    /// Serializes appends so concurrent fetch tasks do not interleave lines.
    file_mutex: Arc<Mutex<()>>,
    /// The path to the currently active log file, if file logging is enabled.
    current_log_file: Option<PathBuf>,
}

impl LoggerLocal {
    /// Rotates log files for a given application and log directory.
    ///
    /// Keeps only the most recent log file (filenames embed a sortable timestamp)
    /// and deletes the older ones.
    fn rotate_logs(app_name: &str, log_dir: &Path) {
        let pattern = format!("{}/{}-*.log", log_dir.display(), app_name);
        let mut log_files: Vec<PathBuf> = match glob(&pattern) {
            Ok(paths) => paths.filter_map(Result::ok).collect(),
            Err(e) => {
                eprintln!("Invalid glob pattern for log rotation {}: {}", pattern, e);
                return;
            }
        };

        // Newest first.
        log_files.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

        for old_file in log_files.iter().skip(1) {
            if let Err(e) = std::fs::remove_file(old_file) {
                eprintln!("Error deleting old log file {}: {}", old_file.display(), e);
            }
        }
    }

    /// Creates a new `LoggerLocal` instance.
    ///
    /// If file logging is enabled, the log directory is created, older logs are
    /// rotated away and a fresh timestamped file path is chosen.
    ///
    /// # Arguments
    /// * `app_name` - The name of the application using this logger.
    /// * `options` - Optional `LoggerLocalOptions`. If `None`, `LoggerLocalOptions::console()` is used.
    pub fn new(app_name: String, options: Option<LoggerLocalOptions>) -> Self {
        let opts = options.unwrap_or_else(LoggerLocalOptions::console);

        let mut logger = Self {
            app_name: app_name.clone(),
            options: opts,
            file_mutex: Arc::new(Mutex::new(())),
            current_log_file: None,
        };

        if logger.options.use_file.is_some() {
            let log_base_dir = logger
                .options
                .log_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("./logs"));

            if let Err(e) = std::fs::create_dir_all(&log_base_dir) {
                eprintln!("Error creating log directory {}: {}", log_base_dir.display(), e);
            }

            LoggerLocal::rotate_logs(&app_name, &log_base_dir);

            let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
            let current_log_filename = format!("{}-{}.log", app_name, timestamp);
            logger.current_log_file = Some(log_base_dir.join(current_log_filename));
        }

        logger
    }

    /// Shorthand for a logger that discards everything.
    pub fn silent(app_name: &str) -> Self {
        Self::new(app_name.to_string(), Some(LoggerLocalOptions::silent()))
    }

    /// The file currently being appended to, if any.
    pub fn current_log_file(&self) -> Option<&Path> {
        self.current_log_file.as_deref()
    }

    /// Logs a message with a specified level, handling TTY output, `log` forwarding
    /// and file writing based on the logger's configuration.
    ///
    /// # Arguments
    /// * `log_level` - The numeric log level (0 for Silly .. 6 for Fatal).
    /// * `log_message` - The main message string to be logged.
    /// * `log_extras` - Additional structured data attached to the record.
    pub async fn log(&self, log_level: i64, log_message: &str, log_extras: Option<Value>) {
        let mut record = Logrecord::default();
        record.app.name = self.app_name.clone();
        record.loglevel = log_level;
        record.message.text = log_message.to_string();
        if let Some(extras) = log_extras {
            record.tags = extras;
        }

        let level = LogLevel::from_i64(log_level);

        if self.options.forward_to_log {
            if record.has_tags() {
                log::log!(target: self.app_name.as_str(), level.as_log_level(), "{} {}", log_message, record.tags);
            } else {
                log::log!(target: self.app_name.as_str(), level.as_log_level(), "{}", log_message);
            }
        }

        if let Some(tty_levels) = &self.options.use_tty {
            if tty_levels.contains(&log_level) {
                self.print_tty(&record, level);
            }
        }

        if let Some(file_levels) = &self.options.use_file {
            if file_levels.contains(&log_level) {
                self.append_file(&record, level).await;
            }
        }
    }

    fn print_tty(&self, record: &Logrecord, level: LogLevel) {
        let ts = record.rfc9557.as_str().truecolor(128, 128, 128);
        let app_name_colored = format!("[{}]", self.app_name).truecolor(128, 128, 128);
        let text = record.message.text.as_str();

        let colored_message = match level {
            LogLevel::Fatal => text.bright_white().on_bright_red(),
            LogLevel::Error => text.bright_red(),
            LogLevel::Warn => text.bright_yellow(),
            LogLevel::Info => text.bright_green(),
            LogLevel::Debug => text.bright_white(),
            LogLevel::Trace => text.bright_cyan(),
            LogLevel::Silly => text.blue(),
        };

        println!("{}{}\n{}", ts, app_name_colored, colored_message);
        if record.has_tags() {
            if let Ok(tags_str) = serde_json::to_string(&record.tags) {
                println!("{}{}{}", ts, app_name_colored, tags_str.truecolor(128, 128, 128));
            }
        }
    }

    async fn append_file(&self, record: &Logrecord, level: LogLevel) {
        let Some(log_file_path) = &self.current_log_file else {
            return;
        };

        let mut line = format!(
            "{} [{}] {} {}",
            record.rfc9557,
            self.app_name,
            level.label(),
            record.message.text
        );
        if record.has_tags() {
            if let Ok(tags_str) = serde_json::to_string(&record.tags) {
                line.push(' ');
                line.push_str(&tags_str);
            }
        }
        line.push('\n');

        let _guard = self.file_mutex.lock().await;
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file_path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(e) = written {
            eprintln!("Error writing log file {}: {}", log_file_path.display(), e);
        }
    }

    /// Logs a message at the "Silly" (level 0) log level.
    pub async fn silly(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(0, log_message, log_extras).await;
    }

    /// Logs a message at the "Trace" (level 1) log level.
    pub async fn trace(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(1, log_message, log_extras).await;
    }

    /// Logs a message at the "Debug" (level 2) log level.
    pub async fn debug(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(2, log_message, log_extras).await;
    }

    /// Logs a message at the "Info" (level 3) log level.
    pub async fn info(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(3, log_message, log_extras).await;
    }

    /// Logs a message at the "Warn" (level 4) log level.
    pub async fn warn(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(4, log_message, log_extras).await;
    }

    /// Logs a message at the "Error" (level 5) log level.
    pub async fn error(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(5, log_message, log_extras).await;
    }

    /// Logs a message at the "Fatal" (level 6) log level.
    pub async fn fatal(&self, log_message: &str, log_extras: Option<Value>) {
        self.log(6, log_message, log_extras).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_options(dir: &Path, levels: Vec<i64>) -> LoggerLocalOptions {
        LoggerLocalOptions {
            use_tty: None,
            use_file: Some(levels),
            log_dir: Some(dir.to_path_buf()),
            forward_to_log: false,
        }
    }

    #[tokio::test]
    async fn writes_enabled_levels_with_extras() {
        let dir = tempfile::tempdir().unwrap();
        let logger = LoggerLocal::new("nse_test".to_string(), Some(file_options(dir.path(), vec![4, 5])));

        logger.info("not written", None).await;
        logger.warn("symbol skipped", Some(serde_json::json!({"symbol": "BOGUS"}))).await;

        let path = logger.current_log_file().unwrap().to_path_buf();
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(!contents.contains("not written"));
        assert!(contents.contains("WARN symbol skipped"));
        assert!(contents.contains("\"symbol\":\"BOGUS\""));
    }

    #[tokio::test]
    async fn rotation_keeps_only_newest_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("nse_rot-20200101_000000.log"), "old").unwrap();
        std::fs::write(dir.path().join("nse_rot-20210101_000000.log"), "newer").unwrap();

        LoggerLocal::rotate_logs("nse_rot", dir.path());

        let remaining: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(remaining, vec!["nse_rot-20210101_000000.log".to_string()]);
    }

    #[tokio::test]
    async fn silent_logger_has_no_file() {
        let logger = LoggerLocal::silent("quiet");
        logger.fatal("nothing happens", None).await;
        assert!(logger.current_log_file().is_none());
    }
}
