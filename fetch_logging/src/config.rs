use std::path::{Path, PathBuf};

use fetch_config::LogConfig;

#[derive(Clone, Debug, PartialEq)]
pub enum LoggingMode {
    Directory(PathBuf),
    File(PathBuf),
    Console,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub logging_mode: LoggingMode,
    pub use_json: bool,
    pub version: String,
    pub filename_prefix: String,
}

impl LoggingConfig {
    /// Resolves the logging mode and format from the `log` config group.  Without a configured
    /// destination, logs go to the console.
    pub fn from_config(log: &LogConfig, version: String) -> LoggingConfig {
        let logging_mode = match &log.dest {
            Some(log_dest) if log_dest.is_empty() => LoggingMode::Console,
            Some(log_dest) => {
                let path = Path::new(log_dest).to_path_buf();

                if log_dest.ends_with('/') || (cfg!(windows) && log_dest.ends_with('\\')) || path.is_dir() {
                    LoggingMode::Directory(path)
                } else {
                    LoggingMode::File(path)
                }
            },
            None => LoggingMode::Console,
        };

        let use_json = match &log.format {
            Some(format) => format.to_ascii_lowercase().trim() == "json",
            None => logging_mode != LoggingMode::Console,
        };

        Self {
            logging_mode,
            use_json,
            version,
            filename_prefix: log.prefix.clone(),
        }
    }
}
