//! Logger utility for application-wide logging
//!
//! A file plus console logger behind the `log` facade, installed by the CLI
//! when a log file is requested. Without one, the CLI falls back to
//! `env_logger`.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use log::{Level, Log, Metadata, Record};

/// File and console logger
pub struct Logger {
    /// File handle for log output
    file: Mutex<Option<File>>,
    /// Most verbose level recorded
    level: Level,
}

impl Logger {
    /// Creates a new logger instance
    ///
    /// # Arguments
    ///
    /// * `log_file` - Path to the log file
    /// * `level` - Most verbose level recorded
    ///
    /// # Returns
    ///
    /// A new Logger instance or an error if the file cannot be created
    pub fn new(log_file: &Path, level: Level) -> io::Result<Self> {
        let file = File::create(log_file)?;
        Ok(Logger { file: Mutex::new(Some(file)), level })
    }

    /// Appends a line to the log file
    ///
    /// # Arguments
    ///
    /// * `message` - The message to log
    pub fn log(&self, message: &str) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        if let Some(file) = guard.as_mut() {
            writeln!(file, "{}", message)?;
            file.flush()?;
        }
        Ok(())
    }

    /// Installs a logger writing to `log_file` as the global logger
    pub fn init_global_logger(log_file: &Path, level: Level) -> io::Result<()> {
        let global_logger = Logger::new(log_file, level)?;

        if log::set_boxed_logger(Box::new(global_logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
        }

        log::set_max_level(level.to_level_filter());
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let stamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let _ = self.log(&format!("{} [{}] {}: {}", stamp, record.level(), record.target(), record.args()));

            // Console output stays terse
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spotkit.log");
        let logger = Logger::new(&path, Level::Info).unwrap();
        logger.log("first").unwrap();
        logger.log("second").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");

        let debug = Metadata::builder().level(Level::Debug).build();
        assert!(!Log::enabled(&logger, &debug));
    }
}
