use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, Local};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{LoggingConfig, LoggingMode};
use crate::constants::{DEFAULT_LOG_LEVEL_CONSOLE, DEFAULT_LOG_LEVEL_FILE};

/// The main entry point to set up logging.  Should only be called once.
pub fn init_logging(cfg: LoggingConfig) {
    let maybe_log_file: Option<PathBuf> = match &cfg.logging_mode {
        LoggingMode::Directory(log_dir) => Some(log_file_in_dir(log_dir, &cfg.filename_prefix)),
        LoggingMode::File(path_buf) => Some(path_buf.clone()),
        LoggingMode::Console => None,
    };

    // Attempt logging to a file, but fallback to console logging on error.
    if let Some(log_file) = maybe_log_file {
        if let Err(e) = init_logging_to_file(&log_file, cfg.use_json) {
            init_logging_to_console(&cfg);
            error!("Error logging to file {log_file:?} ({e}); falling back to console logging.");
        }
    } else {
        init_logging_to_console(&cfg);
    }

    info!("content_fetch {}", &cfg.version);
}

fn init_logging_to_console(cfg: &LoggingConfig) {
    let registry = tracing_subscriber::registry();

    let fmt_layer_base = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_writer(std::io::stderr);
    let fmt_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL_CONSOLE))
        .unwrap_or_default();

    if cfg.use_json {
        let _ = registry.with(fmt_layer_base.json().with_filter(fmt_filter)).try_init();
    } else {
        let _ = registry.with(fmt_layer_base.pretty().with_filter(fmt_filter)).try_init();
    }
}

fn init_logging_to_file(path: &Path, use_json: bool) -> Result<(), std::io::Error> {
    use tracing_appender::{non_blocking, rolling};

    let (path, file_name) = match path.file_name() {
        Some(name) => (path.to_path_buf(), name.to_os_string()),
        None => (path.join("content_fetch.log"), OsStr::new("content_fetch.log").to_os_string()),
    };

    let log_directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            parent.to_path_buf()
        },
        _ => PathBuf::from("."),
    };

    // Make sure the log location is writeable so we error early here and dump to stderr on failure.
    std::fs::write(&path, [])?;

    let file_appender = rolling::never(log_directory, file_name);
    let (writer, guard) = non_blocking(file_appender);

    // The guard must outlive the subscriber or buffered lines are dropped.
    static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
    let _ = FILE_GUARD.set(guard);

    let fmt_layer_base = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_writer(writer);
    let fmt_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_LEVEL_FILE))
        .unwrap_or_default();

    let registry = tracing_subscriber::registry();
    let init_result = if use_json {
        registry.with(fmt_layer_base.json().with_filter(fmt_filter)).try_init()
    } else {
        registry.with(fmt_layer_base.with_ansi(false).with_filter(fmt_filter)).try_init()
    };

    init_result.map_err(std::io::Error::other)
}

/// Build `<prefix>_<YYYYMMDD>T<HHMMSS><mmm><+/-HHMM>_<pid>.log` in `dir`.
/// Timestamp is in local time with a numeric offset, filename-safe.
pub fn log_file_in_dir(dir: impl AsRef<Path>, prefix: &str) -> PathBuf {
    let now_local: DateTime<Local> = Local::now();
    let now_fixed: DateTime<FixedOffset> = now_local.with_timezone(now_local.offset());

    let ts = now_fixed.format("%Y%m%dT%H%M%S%3f%z");

    let pid = std::process::id();
    dir.as_ref().join(format!("{prefix}_{ts}_{pid}.log"))
}
