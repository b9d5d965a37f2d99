//! Run log.
//!
//! Every task start, finish and failure is one line on stderr, stamped with
//! the wall-clock time:
//!
//! ```text
//! [14:02:11.403] [INFO] Starting 'client.build-stylesheets'...
//! [14:02:12.911] [INFO] Finished 'client.build-stylesheets' after 1.51 s
//! ```
//!
//! Missing copy sources and duplicate task names come out at WARN. Tool
//! command lines and directory cache decisions are DEBUG; per-file deletes
//! and copies are TRACE.
//!
//! The library writes nothing until the binary calls [`init_with_debug`].
//! With `--debug` or `GANTRY_DEBUG=1` the threshold drops to DEBUG and each
//! line is also appended to `~/.gantry/gantry.log`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::OnceLock;

static DEBUG_FILE: OnceLock<PathBuf> = OnceLock::new();
static TO_STDERR: AtomicBool = AtomicBool::new(false);
static THRESHOLD: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Error,
            1 => LogLevel::Warn,
            2 => LogLevel::Info,
            3 => LogLevel::Debug,
            _ => LogLevel::Trace,
        }
    }
}

fn debug_requested(flag: bool) -> bool {
    flag || std::env::var("GANTRY_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Start writing the run log to stderr.
pub fn init_with_debug(debug: bool) {
    let debug = debug_requested(debug);
    TO_STDERR.store(true, Ordering::SeqCst);
    set_threshold(if debug { LogLevel::Debug } else { LogLevel::Info });

    if !debug {
        return;
    }
    if let Some(dir) = dirs::home_dir().map(|h| h.join(".gantry")) {
        let _ = std::fs::create_dir_all(&dir);
        let path = dir.join("gantry.log");
        // One run per file.
        let _ = std::fs::write(&path, "");
        DEBUG_FILE.set(path).ok();
    }
}

pub fn set_threshold(level: LogLevel) {
    THRESHOLD.store(level as u8, Ordering::SeqCst);
}

pub fn threshold() -> LogLevel {
    LogLevel::from_u8(THRESHOLD.load(Ordering::Relaxed))
}

fn format_line(level: LogLevel, msg: &str) -> String {
    let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
    format!("[{}] [{}] {}", timestamp, level.as_str(), msg)
}

/// Write `msg` to every enabled sink if `level` passes the threshold.
///
/// Called through the `glog*` macros.
pub fn write(level: LogLevel, msg: &str) {
    if level > threshold() {
        return;
    }
    let line = format_line(level, msg);

    if TO_STDERR.load(Ordering::Relaxed) {
        let _ = writeln!(std::io::stderr().lock(), "{}", line);
    }
    if let Some(path) = DEBUG_FILE.get() {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", line);
        }
    }
}

#[macro_export]
macro_rules! glog {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! glog_error {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Error, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! glog_warn {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Warn, &format!($($arg)*))
    };
}

/// Only written with `--debug` / `GANTRY_DEBUG=1`.
#[macro_export]
macro_rules! glog_debug {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Debug, &format!($($arg)*))
    };
}

/// Never written unless the threshold is raised to TRACE.
#[macro_export]
macro_rules! glog_trace {
    ($($arg:tt)*) => {
        $crate::log::write($crate::log::LogLevel::Trace, &format!($($arg)*))
    };
}
