//! Disassembler for LC-3 programs.
//!
//! Converts instruction words back to readable assembly.

use crate::alu::CondFlag;
use crate::cpu::decode::{decode, Instruction, Operand};
use crate::cpu::trap::TrapVector;

/// Disassemble a single instruction word to text.
pub fn disassemble_instruction(word: u16) -> String {
    format_instruction(&decode(word))
}

/// Disassemble a block of words loaded at `origin`.
pub fn disassemble(origin: u16, words: &[u16]) -> String {
    let mut output = String::new();
    output.push_str("; LC-3 Disassembly\n");
    output.push_str("; ----------------\n\n");
    output.push_str(&format!(".ORIG x{:04X}\n", origin));

    for (i, &word) in words.iter().enumerate() {
        let addr = origin.wrapping_add(i as u16);
        let line = disassemble_instruction(word);
        output.push_str(&format!("x{:04X}: x{:04X}  {}\n", addr, word, line));
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    match *instr {
        // Operate
        Instruction::Add { dr, sr1, operand } => format!("ADD R{}, R{}, {}", dr, sr1, format_operand(operand)),
        Instruction::And { dr, sr1, operand } => format!("AND R{}, R{}, {}", dr, sr1, format_operand(operand)),
        Instruction::Not { dr, sr } => format!("NOT R{}, R{}", dr, sr),

        // Data movement
        Instruction::Ld { dr, offset } => format!("LD R{}, {}", dr, format_offset(offset)),
        Instruction::Ldi { dr, offset } => format!("LDI R{}, {}", dr, format_offset(offset)),
        Instruction::Ldr { dr, base, offset } => format!("LDR R{}, R{}, {}", dr, base, format_offset(offset)),
        Instruction::Lea { dr, offset } => format!("LEA R{}, {}", dr, format_offset(offset)),
        Instruction::St { sr, offset } => format!("ST R{}, {}", sr, format_offset(offset)),
        Instruction::Sti { sr, offset } => format!("STI R{}, {}", sr, format_offset(offset)),
        Instruction::Str { sr, base, offset } => format!("STR R{}, R{}, {}", sr, base, format_offset(offset)),

        // Control
        Instruction::Br { nzp: 0, .. } => "NOP".to_string(),
        Instruction::Br { nzp, offset } => format!("BR{} {}", format_nzp(nzp), format_offset(offset)),
        Instruction::Jmp { base: 7 } => "RET".to_string(),
        Instruction::Jmp { base } => format!("JMP R{}", base),
        Instruction::Jsr { offset } => format!("JSR {}", format_offset(offset)),
        Instruction::Jsrr { base } => format!("JSRR R{}", base),
        Instruction::Trap { vector } => match TrapVector::try_from(vector) {
            Ok(trap) => trap.name().to_string(),
            Err(v) => format!("TRAP x{:02X}", v),
        },

        // Unimplemented
        Instruction::Rti => "RTI".to_string(),
        Instruction::Res => "???".to_string(),
    }
}

fn format_operand(operand: Operand) -> String {
    match operand {
        Operand::Reg(sr2) => format!("R{}", sr2),
        Operand::Imm(imm) => format_offset(imm),
    }
}

/// Signed decimal, as an assembler would accept it.
fn format_offset(offset: u16) -> String {
    format!("#{}", offset as i16)
}

fn format_nzp(nzp: u16) -> String {
    [CondFlag::Neg, CondFlag::Zero, CondFlag::Pos]
        .into_iter()
        .filter(|flag| nzp & flag.bits() != 0)
        .map(CondFlag::letter)
        .collect()
}
