//! Interactive terminal console in raw mode.

use std::collections::VecDeque;
use std::io::{Stdout, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use log::debug;

use super::{Console, ConsoleError};

/// Keyboard and display on the controlling terminal.
///
/// Raw mode is held for the lifetime of the value and released in `Drop`,
/// so every exit path (halt, fault, Ctrl-C, early `?` return) restores the
/// terminal. In raw mode Ctrl-C is delivered as a key event rather than a
/// signal; it is reported as [`ConsoleError::Interrupted`] the next time
/// the keyboard is polled, including from [`Console::poll_interrupt`].
pub struct TerminalConsole {
    out: Stdout,
    pending: VecDeque<u8>,
}

impl TerminalConsole {
    /// Switch the terminal to raw mode.
    pub fn acquire() -> Result<Self, ConsoleError> {
        terminal::enable_raw_mode()?;
        debug!("raw mode enabled");
        Ok(Self {
            out: std::io::stdout(),
            pending: VecDeque::new(),
        })
    }

    /// Map a key press to the byte a program would see, if any.
    fn translate(key: KeyEvent) -> Result<Option<u8>, ConsoleError> {
        if key.kind == KeyEventKind::Release {
            return Ok(None);
        }
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let byte = match key.code {
            KeyCode::Char('c') if ctrl => return Err(ConsoleError::Interrupted),
            KeyCode::Char('d') if ctrl => Some(0x04),
            KeyCode::Char(c) if c.is_ascii() => Some(c as u8),
            KeyCode::Enter => Some(b'\n'),
            KeyCode::Backspace => Some(0x08),
            KeyCode::Tab => Some(b'\t'),
            KeyCode::Esc => Some(0x1B),
            _ => None,
        };
        Ok(byte)
    }

    /// Queue every key already waiting, without blocking.
    fn drain_events(&mut self) -> Result<(), ConsoleError> {
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                if let Some(byte) = Self::translate(key)? {
                    self.pending.push_back(byte);
                }
            }
        }
        Ok(())
    }

    /// Block until a key that maps to a byte is pressed.
    fn wait_key(&mut self) -> Result<u8, ConsoleError> {
        loop {
            if let Event::Key(key) = event::read()? {
                if let Some(byte) = Self::translate(key)? {
                    return Ok(byte);
                }
            }
        }
    }
}

impl Console for TerminalConsole {
    fn key_available(&mut self) -> Result<bool, ConsoleError> {
        self.drain_events()?;
        Ok(!self.pending.is_empty())
    }

    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        self.drain_events()?;
        match self.pending.pop_front() {
            Some(byte) => Ok(byte),
            None => self.wait_key(),
        }
    }

    fn write_char(&mut self, ch: u8) -> Result<(), ConsoleError> {
        // Raw mode turns off output post-processing.
        if ch == b'\n' {
            self.out.write_all(b"\r\n")?;
        } else {
            self.out.write_all(&[ch])?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ConsoleError> {
        self.out.flush()?;
        Ok(())
    }

    fn poll_interrupt(&mut self) -> Result<(), ConsoleError> {
        self.drain_events()
    }
}

impl Drop for TerminalConsole {
    fn drop(&mut self) {
        let _ = self.out.flush();
        let _ = terminal::disable_raw_mode();
        debug!("raw mode disabled");
    }
}
