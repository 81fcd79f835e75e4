// Licensed under the Apache-2.0 license

//! Crate-wide logging seam.
//!
//! Drivers take a `L: Logger` type parameter so that production builds can
//! route diagnostics to a UART (or anything implementing `embedded_io::Write`)
//! while tests and size-constrained images use [`NoOpLogger`].

use core::fmt;

/// Severity attached to a log line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Debug,
    Warn,
    Error,
}

impl Level {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Sink for driver diagnostics.
pub trait Logger {
    fn log(&mut self, level: Level, args: fmt::Arguments<'_>);

    fn debug(&mut self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    fn warn(&mut self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }
}

/// Logger that discards every message.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&mut self, _level: Level, _args: fmt::Arguments<'_>) {}
}

/// Logger writing `[LEVEL] message\r\n` lines to a byte sink such as a UART.
///
/// Messages below `min_level` are dropped. Write errors are ignored: a
/// failing log sink must never fail a bus transaction.
pub struct IoLogger<W: embedded_io::Write> {
    sink: W,
    min_level: Level,
}

impl<W: embedded_io::Write> IoLogger<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            min_level: Level::Debug,
        }
    }

    #[must_use]
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl<W: embedded_io::Write> Logger for IoLogger<W> {
    fn log(&mut self, level: Level, args: fmt::Arguments<'_>) {
        if level < self.min_level {
            return;
        }
        let _ = write!(self.sink, "[{}] {}\r\n", level.as_str(), args);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_logger_formats_lines() {
        let mut buf = [0u8; 64];
        let mut logger = IoLogger::new(&mut buf[..]);
        logger.debug(format_args!("status {:#04x}", 0x18));
        logger.error(format_args!("timeout"));
        drop(logger);

        let text = core::str::from_utf8(&buf).unwrap().trim_end_matches('\0');
        assert_eq!(text, "[DEBUG] status 0x18\r\n[ERROR] timeout\r\n");
    }

    #[test]
    fn io_logger_filters_by_level() {
        let mut buf = [0u8; 32];
        let mut logger = IoLogger::new(&mut buf[..]).with_min_level(Level::Warn);
        logger.debug(format_args!("dropped"));
        logger.warn(format_args!("kept"));
        drop(logger);

        let text = core::str::from_utf8(&buf).unwrap().trim_end_matches('\0');
        assert_eq!(text, "[WARN] kept\r\n");
    }

    #[test]
    fn io_logger_survives_full_sink() {
        let mut buf = [0u8; 4];
        let mut logger = IoLogger::new(&mut buf[..]);
        logger.error(format_args!("this line does not fit"));
        logger.error(format_args!("neither does this one"));
    }
}
