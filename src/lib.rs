//! # LC-3 Virtual Machine
//!
//! An interpreter for the LC-3, the 16-bit teaching computer: eight
//! registers, three condition codes, and a 65536-word address space.
//!
//! Programs are loaded from big-endian object images and run from
//! `0x3000` until they execute the `HALT` trap. Console I/O goes through
//! the [`io::Console`] trait, so the machine runs the same against a raw
//! terminal, a pipe, or an in-memory buffer.

pub mod alu;
pub mod cpu;
pub mod disasm;
pub mod image;
pub mod io;

// Re-export commonly used types
pub use alu::{sign_extend, CondFlag};
pub use cpu::{Cpu, CpuState, CpuError, Memory, Registers, Instruction, Opcode, TrapVector};
pub use disasm::{disassemble, disassemble_instruction};
pub use image::{Image, ImageError, load_image};
pub use io::{Console, ConsoleError, StreamConsole};

#[cfg(feature = "terminal")]
pub use io::TerminalConsole;
