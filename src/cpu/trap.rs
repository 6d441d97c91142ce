//! Trap vectors and the built-in service routines they select.

use serde::{Serialize, Deserialize};

/// Prompt printed by the `IN` routine.
pub const IN_PROMPT: &str = "Enter a character: ";

/// Notice printed by the `HALT` routine.
pub const HALT_NOTICE: &str = "HALT\n";

/// The trap vectors this machine services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TrapVector {
    /// Read one key into R0, no echo
    Getc = 0x20,
    /// Write the low byte of R0
    Out = 0x21,
    /// Write a zero-terminated string, one character per word, at R0
    Puts = 0x22,
    /// Prompt, read one key with echo into R0
    In = 0x23,
    /// Write a zero-terminated string, two characters per word, at R0
    Putsp = 0x24,
    /// Stop the machine
    Halt = 0x25,
}

impl TrapVector {
    /// Assembler mnemonic for the vector.
    pub fn name(self) -> &'static str {
        match self {
            TrapVector::Getc => "GETC",
            TrapVector::Out => "OUT",
            TrapVector::Puts => "PUTS",
            TrapVector::In => "IN",
            TrapVector::Putsp => "PUTSP",
            TrapVector::Halt => "HALT",
        }
    }
}

impl TryFrom<u8> for TrapVector {
    type Error = u8;

    fn try_from(vector: u8) -> Result<Self, Self::Error> {
        match vector {
            0x20 => Ok(TrapVector::Getc),
            0x21 => Ok(TrapVector::Out),
            0x22 => Ok(TrapVector::Puts),
            0x23 => Ok(TrapVector::In),
            0x24 => Ok(TrapVector::Putsp),
            0x25 => Ok(TrapVector::Halt),
            other => Err(other),
        }
    }
}

impl std::fmt::Display for TrapVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
