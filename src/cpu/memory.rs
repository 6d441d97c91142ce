//! LC-3 memory subsystem.
//!
//! A flat space of 65536 sixteen-bit words holding both code and data.
//! Two cells in the device page are wired to the keyboard:
//! - `0xFE00` KBSR, keyboard status (bit 15 set when a key is ready)
//! - `0xFE02` KBDR, keyboard data (low byte holds the key)
//!
//! Reads through [`Memory::read`] give those cells their device behaviour.
//! [`Memory::peek`] is the raw view with no side effects.

use crate::io::{Console, ConsoleError};
use thiserror::Error;

/// The number of words in the address space.
pub const MEMORY_SIZE: usize = 1 << 16;

/// Keyboard status register.
pub const KBSR: u16 = 0xFE00;

/// Keyboard data register.
pub const KBDR: u16 = 0xFE02;

/// KBSR bit signalling a character is ready.
const KBSR_READY: u16 = 1 << 15;

/// LC-3 memory: 65536 words.
#[derive(Clone)]
pub struct Memory {
    cells: Vec<u16>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a word as the CPU sees it, including keyboard side effects.
    ///
    /// Reading KBSR polls the console and latches the ready bit. Reading
    /// KBDR consumes a pending key into the low byte and clears KBSR; with
    /// nothing pending it returns the last latched value. Neither blocks.
    pub fn read<C: Console + ?Sized>(&mut self, addr: u16, console: &mut C) -> Result<u16, ConsoleError> {
        match addr {
            KBSR => {
                let status = if console.key_available()? { KBSR_READY } else { 0 };
                self.cells[KBSR as usize] = status;
            }
            KBDR => {
                if console.key_available()? {
                    let ch = console.read_char()?;
                    self.cells[KBDR as usize] = u16::from(ch);
                    self.cells[KBSR as usize] = 0;
                }
            }
            _ => {}
        }
        Ok(self.cells[addr as usize])
    }

    /// Read a word without device side effects.
    #[inline]
    pub fn peek(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    /// Write a word. Device registers are plain storage on the write side.
    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) {
        self.cells[addr as usize] = value;
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy `program` into memory starting at `origin`.
    ///
    /// Fails without writing anything if the words would run past `0xFFFF`.
    pub fn load_program(&mut self, origin: u16, program: &[u16]) -> Result<(), MemoryError> {
        let start = origin as usize;
        if start + program.len() > MEMORY_SIZE {
            return Err(MemoryError::ProgramTooLarge {
                origin,
                size: program.len(),
                available: MEMORY_SIZE - start,
            });
        }

        self.cells[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Dump memory contents (for debugging).
    pub fn dump(&self, start: u16, count: usize) -> Vec<(u16, u16)> {
        let end = (start as usize + count).min(MEMORY_SIZE);
        (start as usize..end)
            .map(|i| (i as u16, self.cells[i]))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("program of {size} words at {origin:#06x} exceeds available space of {available} words")]
    ProgramTooLarge { origin: u16, size: usize, available: usize },
}
