//! CPU emulation for the LC-3.
//!
//! This module implements the complete LC-3 user-level architecture:
//! - 65536 sixteen-bit memory words with memory-mapped keyboard registers
//! - 8 general-purpose registers, PC, and N/Z/P condition codes
//! - 16 opcodes (14 implemented, RTI and the reserved slot fault)
//! - 6 built-in trap routines for console I/O and halting

pub mod memory;
pub mod registers;
pub mod decode;
pub mod trap;
pub mod execute;

pub use memory::Memory;
pub use registers::Registers;
pub use decode::{Instruction, Opcode, Operand};
pub use trap::TrapVector;
pub use execute::{Cpu, CpuError, CpuState, Snapshot};
