//! Console over plain byte streams.

use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use super::{Console, ConsoleError};

/// A console reading from any [`Read`] and writing to any [`Write`].
///
/// Used for piped stdin and for driving programs from tests. Input is
/// pulled by a background thread into a channel, so `key_available` never
/// waits on the reader; only `read_char` blocks.
pub struct StreamConsole<W> {
    input: Receiver<Result<u8, ConsoleError>>,
    output: W,
    pending: Option<u8>,
}

impl<W: Write> StreamConsole<W> {
    /// Feed input from `input` on a reader thread.
    pub fn new<R: Read + Send + 'static>(input: R, output: W) -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let mut input = input;
            let mut buf = [0u8; 256];
            loop {
                match input.read(&mut buf) {
                    Ok(0) => return,
                    Ok(n) => {
                        for &byte in &buf[..n] {
                            if tx.send(Ok(byte)).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        let _ = tx.send(Err(e.into()));
                        return;
                    }
                }
            }
        });

        Self::from_receiver(rx, output)
    }

    /// A console whose whole input is known up front. Every byte is
    /// available immediately and the input ends after the last one.
    pub fn scripted(input: impl AsRef<[u8]>, output: W) -> Self {
        let (tx, rx) = mpsc::channel();
        for &byte in input.as_ref() {
            // The receiver is alive, so this cannot fail.
            let _ = tx.send(Ok(byte));
        }
        Self::from_receiver(rx, output)
    }

    fn from_receiver(input: Receiver<Result<u8, ConsoleError>>, output: W) -> Self {
        Self {
            input,
            output,
            pending: None,
        }
    }

    /// Borrow the output sink (e.g. a `Vec<u8>` in tests).
    pub fn output(&self) -> &W {
        &self.output
    }

    /// Consume the console, returning the output sink.
    pub fn into_output(self) -> W {
        self.output
    }
}

impl StreamConsole<std::io::Stdout> {
    /// A console over the process's standard streams.
    pub fn stdio() -> Self {
        Self::new(std::io::stdin(), std::io::stdout())
    }
}

impl<W: Write> Console for StreamConsole<W> {
    fn key_available(&mut self) -> Result<bool, ConsoleError> {
        if self.pending.is_none() {
            match self.input.try_recv() {
                Ok(byte) => self.pending = Some(byte?),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
            }
        }
        Ok(self.pending.is_some())
    }

    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        if let Some(byte) = self.pending.take() {
            return Ok(byte);
        }
        // A closed channel means the reader hit end of input.
        self.input.recv().map_err(|_| ConsoleError::EndOfInput)?
    }

    fn write_char(&mut self, ch: u8) -> Result<(), ConsoleError> {
        self.output.write_all(&[ch])?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ConsoleError> {
        self.output.flush()?;
        Ok(())
    }
}
