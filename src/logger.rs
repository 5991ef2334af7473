//! Logging infrastructure
//!
//! Implements the `log` facade on top of a console sink handed over by the
//! firmware (usually the PL011 driver). Lines are prefixed with a timestamp
//! in thousands of generic timer ticks since [`init`].
//!
//! Coloured level names are enabled with the `ansi-log` feature.

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicU64, Ordering};

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use spin::Mutex;

use crate::arch::aarch64::counter;

/// Console the logger writes to
pub type Console = &'static mut (dyn Write + Send);

static CONSOLE: Mutex<Option<Console>> = Mutex::new(None);

/// Counter value at init
static BOOT_COUNT: AtomicU64 = AtomicU64::new(0);

/// Timer ticks since init, in thousands
pub fn get_timestamp_k() -> u64 {
    counter().saturating_sub(BOOT_COUNT.load(Ordering::Relaxed)) / 1000
}

#[cfg(feature = "ansi-log")]
fn level_str(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31mERROR\x1b[0m",
        Level::Warn => "\x1b[33mWARN\x1b[0m ",
        Level::Info => "\x1b[32mINFO\x1b[0m ",
        Level::Debug => "\x1b[34mDEBUG\x1b[0m",
        Level::Trace => "\x1b[35mTRACE\x1b[0m",
    }
}

#[cfg(not(feature = "ansi-log"))]
fn level_str(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN ",
        Level::Info => "INFO ",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

fn write_line(
    out: &mut (dyn Write + Send),
    timestamp: u64,
    level: Level,
    args: &fmt::Arguments<'_>,
) -> fmt::Result {
    writeln!(out, "[{:>10}] [{}] {}", timestamp, level_str(level), args)
}

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = get_timestamp_k();
        if let Some(console) = CONSOLE.lock().as_mut() {
            // Nowhere to report a failing console
            let _ = write_line(&mut **console, timestamp, record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

/// Install the global logger writing to `console`
///
/// Fails if a logger is already installed; the console is replaced either
/// way.
pub fn init(console: Console, level: LevelFilter) -> Result<(), SetLoggerError> {
    BOOT_COUNT.store(counter(), Ordering::Relaxed);
    *CONSOLE.lock() = Some(console);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Set the maximum log level
pub fn set_level(level: LevelFilter) {
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::boxed::Box;
    use std::string::String;

    static CAPTURED: Mutex<String> = Mutex::new(String::new());

    struct Capture;

    impl Write for Capture {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            CAPTURED.lock().push_str(s);
            Ok(())
        }
    }

    #[test]
    #[cfg(not(feature = "ansi-log"))]
    fn test_line_format() {
        let mut line = String::new();
        write_line(&mut line, 42, Level::Warn, &format_args!("MADT: {} bytes", 1384)).unwrap();
        assert_eq!(line, "[        42] [WARN ] MADT: 1384 bytes\n");
    }

    #[test]
    fn test_init_routes_records() {
        init(Box::leak(Box::new(Capture)), LevelFilter::Debug).unwrap();
        log::debug!("repository frozen");
        log::trace!("filtered out");
        let captured = CAPTURED.lock().clone();
        assert!(captured.contains("repository frozen"));
        assert!(!captured.contains("filtered out"));

        assert!(init(Box::leak(Box::new(Capture)), LevelFilter::Debug).is_err());
        set_level(LevelFilter::Warn);
        assert_eq!(log::max_level(), LevelFilter::Warn);
    }
}
