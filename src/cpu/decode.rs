//! Instruction decoder for the LC-3.
//!
//! Every instruction is one 16-bit word. The top 4 bits select the opcode;
//! the remaining 12 bits are laid out per opcode:
//!
//! ```text
//! ADD/AND  oooo ddd sss 0 00 ttt     oooo ddd sss 1 iiiii
//! NOT      1001 ddd sss 1 11111
//! BR       0000 n z p ooooooooo
//! JMP      1100 000 bbb 000000
//! JSR      0100 1 ooooooooooo        JSRR 0100 0 00 bbb 000000
//! LD/LDI/LEA/ST/STI  oooo rrr ooooooooo
//! LDR/STR  oooo rrr bbb oooooo
//! TRAP     1111 0000 vvvvvvvv
//! ```
//!
//! All 16 opcode values decode to some [`Instruction`], including the two
//! the machine does not implement (RTI and the reserved slot); rejecting
//! those is the executor's job.

use crate::alu::{field, sign_extend};
use serde::{Serialize, Deserialize};

/// The 4-bit opcode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Rti = 0x8,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jmp = 0xC,
    Res = 0xD,
    Lea = 0xE,
    Trap = 0xF,
}

impl Opcode {
    const TABLE: [Opcode; 16] = [
        Opcode::Br,
        Opcode::Add,
        Opcode::Ld,
        Opcode::St,
        Opcode::Jsr,
        Opcode::And,
        Opcode::Ldr,
        Opcode::Str,
        Opcode::Rti,
        Opcode::Not,
        Opcode::Ldi,
        Opcode::Sti,
        Opcode::Jmp,
        Opcode::Res,
        Opcode::Lea,
        Opcode::Trap,
    ];

    /// Opcode of an instruction word (its top 4 bits).
    #[inline]
    pub fn of(word: u16) -> Self {
        Self::TABLE[(word >> 12) as usize]
    }

    /// The 4-bit value, positioned in the top of a word.
    #[inline]
    pub fn bits(self) -> u16 {
        (self as u16) << 12
    }
}

/// Second source of ADD/AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// SR2 register index
    Reg(u16),
    /// imm5, already sign-extended
    Imm(u16),
}

/// Decoded LC-3 instruction.
///
/// Register fields are indices 0-7. Offsets and immediates are stored
/// sign-extended to 16 bits, ready to be added with wraparound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Operate ====================

    /// DR := SR1 + operand
    Add { dr: u16, sr1: u16, operand: Operand },

    /// DR := SR1 & operand
    And { dr: u16, sr1: u16, operand: Operand },

    /// DR := !SR
    Not { dr: u16, sr: u16 },

    // ==================== Data Movement ====================

    /// DR := mem[PC + offset9]
    Ld { dr: u16, offset: u16 },

    /// DR := mem[mem[PC + offset9]]
    Ldi { dr: u16, offset: u16 },

    /// DR := mem[BaseR + offset6]
    Ldr { dr: u16, base: u16, offset: u16 },

    /// DR := PC + offset9
    Lea { dr: u16, offset: u16 },

    /// mem[PC + offset9] := SR
    St { sr: u16, offset: u16 },

    /// mem[mem[PC + offset9]] := SR
    Sti { sr: u16, offset: u16 },

    /// mem[BaseR + offset6] := SR
    Str { sr: u16, base: u16, offset: u16 },

    // ==================== Control ====================

    /// If any of the `nzp` bits matches COND: PC := PC + offset9
    Br { nzp: u16, offset: u16 },

    /// PC := BaseR (RET is JMP R7)
    Jmp { base: u16 },

    /// R7 := PC; PC := PC + offset11
    Jsr { offset: u16 },

    /// R7 := PC; PC := BaseR
    Jsrr { base: u16 },

    /// Invoke a trap service routine
    Trap { vector: u8 },

    // ==================== Unimplemented ====================

    /// Return from interrupt (no supervisor mode here)
    Rti,

    /// Reserved opcode 1101
    Res,
}

impl Instruction {
    /// The opcode this instruction was decoded from.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Add { .. } => Opcode::Add,
            Instruction::And { .. } => Opcode::And,
            Instruction::Not { .. } => Opcode::Not,
            Instruction::Ld { .. } => Opcode::Ld,
            Instruction::Ldi { .. } => Opcode::Ldi,
            Instruction::Ldr { .. } => Opcode::Ldr,
            Instruction::Lea { .. } => Opcode::Lea,
            Instruction::St { .. } => Opcode::St,
            Instruction::Sti { .. } => Opcode::Sti,
            Instruction::Str { .. } => Opcode::Str,
            Instruction::Br { .. } => Opcode::Br,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Jsr { .. } | Instruction::Jsrr { .. } => Opcode::Jsr,
            Instruction::Trap { .. } => Opcode::Trap,
            Instruction::Rti => Opcode::Rti,
            Instruction::Res => Opcode::Res,
        }
    }
}

/// Decode an instruction word.
pub fn decode(word: u16) -> Instruction {
    let r_hi = field(word, 9, 3);
    let r_mid = field(word, 6, 3);
    let pc_offset9 = sign_extend(word, 9);
    let offset6 = sign_extend(word, 6);

    let operand = || {
        if field(word, 5, 1) == 1 {
            Operand::Imm(sign_extend(word, 5))
        } else {
            Operand::Reg(field(word, 0, 3))
        }
    };

    match Opcode::of(word) {
        Opcode::Add => Instruction::Add { dr: r_hi, sr1: r_mid, operand: operand() },
        Opcode::And => Instruction::And { dr: r_hi, sr1: r_mid, operand: operand() },
        Opcode::Not => Instruction::Not { dr: r_hi, sr: r_mid },
        Opcode::Ld => Instruction::Ld { dr: r_hi, offset: pc_offset9 },
        Opcode::Ldi => Instruction::Ldi { dr: r_hi, offset: pc_offset9 },
        Opcode::Ldr => Instruction::Ldr { dr: r_hi, base: r_mid, offset: offset6 },
        Opcode::Lea => Instruction::Lea { dr: r_hi, offset: pc_offset9 },
        Opcode::St => Instruction::St { sr: r_hi, offset: pc_offset9 },
        Opcode::Sti => Instruction::Sti { sr: r_hi, offset: pc_offset9 },
        Opcode::Str => Instruction::Str { sr: r_hi, base: r_mid, offset: offset6 },
        Opcode::Br => Instruction::Br { nzp: r_hi, offset: pc_offset9 },
        Opcode::Jmp => Instruction::Jmp { base: r_mid },
        Opcode::Jsr => {
            if field(word, 11, 1) == 1 {
                Instruction::Jsr { offset: sign_extend(word, 11) }
            } else {
                Instruction::Jsrr { base: r_mid }
            }
        }
        Opcode::Trap => Instruction::Trap { vector: field(word, 0, 8) as u8 },
        Opcode::Rti => Instruction::Rti,
        Opcode::Res => Instruction::Res,
    }
}

/// Encode an instruction back to a word.
///
/// Offsets and immediates are truncated to their field width, so any
/// value produced by [`decode`] encodes to the same word (modulo unused bits).
pub fn encode(instr: &Instruction) -> u16 {
    let r_hi = |r: u16| (r & 0x7) << 9;
    let r_mid = |r: u16| (r & 0x7) << 6;
    let operand = |op: Operand| match op {
        Operand::Reg(sr2) => sr2 & 0x7,
        Operand::Imm(imm) => 1 << 5 | (imm & 0x1F),
    };
    let off9 = |o: u16| o & 0x1FF;
    let off6 = |o: u16| o & 0x3F;

    let op = instr.opcode().bits();
    match *instr {
        Instruction::Add { dr, sr1, operand: src } => op | r_hi(dr) | r_mid(sr1) | operand(src),
        Instruction::And { dr, sr1, operand: src } => op | r_hi(dr) | r_mid(sr1) | operand(src),
        Instruction::Not { dr, sr } => op | r_hi(dr) | r_mid(sr) | 0x3F,
        Instruction::Ld { dr, offset } => op | r_hi(dr) | off9(offset),
        Instruction::Ldi { dr, offset } => op | r_hi(dr) | off9(offset),
        Instruction::Ldr { dr, base, offset } => op | r_hi(dr) | r_mid(base) | off6(offset),
        Instruction::Lea { dr, offset } => op | r_hi(dr) | off9(offset),
        Instruction::St { sr, offset } => op | r_hi(sr) | off9(offset),
        Instruction::Sti { sr, offset } => op | r_hi(sr) | off9(offset),
        Instruction::Str { sr, base, offset } => op | r_hi(sr) | r_mid(base) | off6(offset),
        Instruction::Br { nzp, offset } => op | r_hi(nzp) | off9(offset),
        Instruction::Jmp { base } => op | r_mid(base),
        Instruction::Jsr { offset } => op | 1 << 11 | (offset & 0x7FF),
        Instruction::Jsrr { base } => op | r_mid(base),
        Instruction::Trap { vector } => op | u16::from(vector),
        Instruction::Rti | Instruction::Res => op,
    }
}
