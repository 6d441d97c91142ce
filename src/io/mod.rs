//! Console devices backing the keyboard and display.
//!
//! The machine only ever talks to a [`Console`]; it never touches terminal
//! modes itself. Two implementations are provided:
//! - [`StreamConsole`] - any byte reader/writer pair (pipes, files, test buffers)
//! - [`TerminalConsole`] - an interactive terminal in raw mode (feature `terminal`)

mod stream;
#[cfg(feature = "terminal")]
mod terminal;

pub use stream::StreamConsole;
#[cfg(feature = "terminal")]
pub use terminal::TerminalConsole;

use thiserror::Error;

/// Character I/O as seen by the trap routines and the keyboard registers.
pub trait Console {
    /// Non-blocking check for a pending input character.
    fn key_available(&mut self) -> Result<bool, ConsoleError>;

    /// Block until one input character arrives and return it.
    fn read_char(&mut self) -> Result<u8, ConsoleError>;

    /// Write one character to the display.
    fn write_char(&mut self, ch: u8) -> Result<(), ConsoleError>;

    /// Push any buffered output to the device.
    fn flush(&mut self) -> Result<(), ConsoleError>;

    /// Check for a user interrupt between instructions.
    ///
    /// Called periodically by the execution loop so that a program which
    /// never reads input can still be stopped. Devices with no interrupt
    /// key of their own leave this as a no-op.
    fn poll_interrupt(&mut self) -> Result<(), ConsoleError> {
        Ok(())
    }
}

impl<C: Console + ?Sized> Console for Box<C> {
    fn key_available(&mut self) -> Result<bool, ConsoleError> {
        (**self).key_available()
    }

    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        (**self).read_char()
    }

    fn write_char(&mut self, ch: u8) -> Result<(), ConsoleError> {
        (**self).write_char(ch)
    }

    fn flush(&mut self) -> Result<(), ConsoleError> {
        (**self).flush()
    }

    fn poll_interrupt(&mut self) -> Result<(), ConsoleError> {
        (**self).poll_interrupt()
    }
}

/// Errors raised by a console device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    #[error("interrupted by user")]
    Interrupted,

    #[error("end of input")]
    EndOfInput,

    #[error("console I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ConsoleError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::Interrupted => ConsoleError::Interrupted,
            std::io::ErrorKind::UnexpectedEof => ConsoleError::EndOfInput,
            _ => ConsoleError::Io(e.to_string()),
        }
    }
}
