//! LC-3 CPU registers.
//!
//! The LC-3 has:
//! - R0-R7: 16-bit general-purpose registers (R7 doubles as the link register)
//! - PC: 16-bit program counter
//! - COND: condition codes, exactly one of N/Z/P set

use crate::alu::CondFlag;
use serde::{Serialize, Deserialize};

/// Address execution starts from.
pub const PC_START: u16 = 0x3000;

/// Number of general-purpose registers.
pub const GPR_COUNT: usize = 8;

/// Index of the register JSR/JSRR write the return address into.
pub const LINK_REGISTER: u16 = 7;

/// The LC-3 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// R0-R7
    pub r: [u16; GPR_COUNT],

    /// PC: address of the next instruction to fetch
    pub pc: u16,

    /// COND: sign of the last value written to a register by a
    /// flag-setting instruction
    pub cond: CondFlag,
}

impl Registers {
    /// Create a register file in its power-on state: all zero,
    /// PC at [`PC_START`], COND = Z.
    pub fn new() -> Self {
        Self {
            r: [0; GPR_COUNT],
            pc: PC_START,
            cond: CondFlag::Zero,
        }
    }

    /// Return to the power-on state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read a general-purpose register. Only the low 3 bits of `index` are used.
    #[inline]
    pub fn get(&self, index: u16) -> u16 {
        self.r[(index & 0x7) as usize]
    }

    /// Write a general-purpose register without touching COND.
    #[inline]
    pub fn set(&mut self, index: u16, value: u16) {
        self.r[(index & 0x7) as usize] = value;
    }

    /// Write a register and set COND from the new value.
    #[inline]
    pub fn set_with_flags(&mut self, index: u16, value: u16) {
        self.set(index, value);
        self.update_flags(index);
    }

    /// Set COND from the current value of register `index`.
    pub fn update_flags(&mut self, index: u16) {
        self.cond = CondFlag::of(self.get(index));
    }

    /// Increment PC by 1 (wrapping). Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// PC plus a sign-extended offset.
    #[inline]
    pub fn pc_relative(&self, offset: u16) -> u16 {
        self.pc.wrapping_add(offset)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
