//! Logging bridge for the fetcher binary.
//!
//! All crates in the workspace log through the `log` facade. The binary
//! installs [`LogBridge`], which writes one line per record to stderr:
//!
//! ```text
//! 2026-10-18T13:05:01.123Z [INFO ] [CONFIG_FETCH] Fetching new FE-main from https://...
//! ```
//!
//! Level precedence: `--log-level` flag, then `RUST_LOG` (a plain level name
//! such as `debug`), then `info`.
//!
//! The `debug_*!` macros take a category that becomes the record target, so
//! related messages can be grepped together.

use log::{LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;

/// Stderr logger behind the `log` facade.
pub struct LogBridge {
    level: LevelFilter,
    sink: Mutex<std::io::Stderr>,
}

impl LogBridge {
    fn new(level: LevelFilter) -> Self {
        Self {
            level,
            sink: Mutex::new(std::io::stderr()),
        }
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "{} [{:<5}] [{}] {}\n",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            record.level(),
            record.target(),
            record.args()
        );
        let mut sink = self.sink.lock();
        let _ = sink.write_all(line.as_bytes());
    }

    fn flush(&self) {
        let _ = self.sink.lock().flush();
    }
}

static BRIDGE: OnceLock<LogBridge> = OnceLock::new();

/// Resolve the effective level from the CLI override and `RUST_LOG`.
pub fn effective_level(cli_level: Option<LevelFilter>) -> LevelFilter {
    if let Some(level) = cli_level {
        return level;
    }
    std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(LevelFilter::Info)
}

/// Install the bridge as the global logger. Later calls are no-ops.
pub fn init_log_bridge(cli_level: Option<LevelFilter>) {
    let level = effective_level(cli_level);
    let bridge = BRIDGE.get_or_init(|| LogBridge::new(level));
    if log::set_logger(bridge).is_ok() {
        log::set_max_level(bridge.level);
    }
}

#[macro_export]
macro_rules! debug_error {
    ($category:expr, $($arg:tt)*) => {
        log::error!(target: $category, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug_warn {
    ($category:expr, $($arg:tt)*) => {
        log::warn!(target: $category, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug_info {
    ($category:expr, $($arg:tt)*) => {
        log::info!(target: $category, $($arg)*)
    };
}

#[macro_export]
macro_rules! debug_log {
    ($category:expr, $($arg:tt)*) => {
        log::debug!(target: $category, $($arg)*)
    };
}
