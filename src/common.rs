// Licensed under the Apache-2.0 license

//! Logging hooks shared by the driver modules.
//!
//! Drivers are generic over a [`Logger`] so that a board can route messages to
//! a UART (or anything else implementing `embedded_io::Write`) while tests and
//! size-sensitive builds use [`NoOpLogger`].

use core::fmt::Write as _;
use heapless::String;

/// Sink for driver diagnostics.
pub trait Logger {
    fn debug(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// Discards every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn debug(&mut self, _msg: &str) {}
    fn error(&mut self, _msg: &str) {}
}

/// Longest line [`IoLogger`] emits, prefix and line ending included.
pub const LOG_LINE_LEN: usize = 96;

/// Writes one `\r\n` terminated line per message to an `embedded_io::Write`.
///
/// Lines longer than [`LOG_LINE_LEN`] are truncated. Write errors are
/// swallowed: a failing log sink must never fail a bus transaction.
pub struct IoLogger<W: embedded_io::Write> {
    writer: W,
}

impl<W: embedded_io::Write> IoLogger<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, level: &str, msg: &str) {
        let mut line: String<LOG_LINE_LEN> = String::new();
        // Truncation is the only possible failure here.
        let _ = write!(line, "[{level}] {msg}");
        let _ = self.writer.write_all(line.as_bytes());
        let _ = self.writer.write_all(b"\r\n");
    }
}

impl<W: embedded_io::Write> Logger for IoLogger<W> {
    fn debug(&mut self, msg: &str) {
        self.emit("debug", msg);
    }

    fn error(&mut self, msg: &str) {
        self.emit("error", msg);
    }
}

impl<L: Logger + ?Sized> Logger for &mut L {
    fn debug(&mut self, msg: &str) {
        (**self).debug(msg);
    }

    fn error(&mut self, msg: &str) {
        (**self).error(msg);
    }
}
