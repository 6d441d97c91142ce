//! CPU execution engine for the LC-3.
//!
//! Implements the fetch-decode-execute cycle, every opcode, and the
//! trap service routines.

use crate::cpu::{Memory, Registers};
use crate::cpu::decode::{self, Instruction, Opcode, Operand};
use crate::cpu::memory::{MemoryError, MEMORY_SIZE};
use crate::cpu::registers::LINK_REGISTER;
use crate::cpu::trap::{TrapVector, HALT_NOTICE, IN_PROMPT};
use crate::disasm::format_instruction;
use crate::io::{Console, ConsoleError};
use log::{debug, info, trace};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Instructions between checks for a user interrupt in `run`.
pub const INTERRUPT_POLL_INTERVAL: u64 = 4096;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (HALT trap).
    Halted,
    /// CPU stopped on an unrecoverable error.
    Faulted,
}

/// An LC-3 machine: registers, memory, and the console it talks to.
pub struct Cpu<C> {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instructions executed since reset.
    pub cycles: u64,
    console: C,
}

/// Register and status summary, for reporting after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: CpuState,
    pub cycles: u64,
    pub regs: Registers,
}

impl<C: Console> Cpu<C> {
    /// Create a machine in its power-on state attached to `console`.
    pub fn new(console: C) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            cycles: 0,
            console,
        }
    }

    /// Create a machine around memory that has already been loaded.
    pub fn with_memory(console: C, mem: Memory) -> Self {
        Self {
            regs: Registers::new(),
            mem,
            state: CpuState::Running,
            cycles: 0,
            console,
        }
    }

    /// Reset registers and memory to the power-on state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.state = CpuState::Running;
        self.cycles = 0;
    }

    /// Copy words into memory at `origin`.
    pub fn load_program(&mut self, origin: u16, program: &[u16]) -> Result<(), MemoryError> {
        self.mem.load_program(origin, program)
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    /// Detach the console, dropping the machine.
    pub fn into_console(self) -> C {
        self.console
    }

    /// Current registers and status.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            cycles: self.cycles,
            regs: self.regs.clone(),
        }
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed. Any error leaves the
    /// machine in [`CpuState::Faulted`].
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        match self.cycle() {
            Ok(instr) => {
                self.cycles += 1;
                Ok(instr)
            }
            Err(e) => {
                self.state = CpuState::Faulted;
                Err(e)
            }
        }
    }

    fn cycle(&mut self) -> Result<Instruction, CpuError> {
        // Fetch goes through the device-aware read like any other load.
        let address = self.regs.advance_pc();
        let raw = self.mem.read(address, &mut self.console)?;

        // Decode
        let instr = decode::decode(raw);
        trace!("{:04x}: {:04x}  {}", address, raw, format_instruction(&instr));

        // Execute
        self.execute(instr, address)?;
        Ok(instr)
    }

    /// Give the console a chance to report an interrupt every
    /// [`INTERRUPT_POLL_INTERVAL`] instructions.
    fn check_interrupt(&mut self) -> Result<(), CpuError> {
        if self.cycles % INTERRUPT_POLL_INTERVAL == 0 {
            if let Err(e) = self.console.poll_interrupt() {
                self.state = CpuState::Faulted;
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.check_interrupt()?;
            self.step()?;
        }

        info!("halted after {} instructions", self.cycles);
        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.check_interrupt()?;
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Execute a decoded instruction fetched from `address`.
    fn execute(&mut self, instr: Instruction, address: u16) -> Result<(), CpuError> {
        match instr {
            // ==================== Operate ====================

            Instruction::Add { dr, sr1, operand } => {
                let value = self.regs.get(sr1).wrapping_add(self.operand(operand));
                self.regs.set_with_flags(dr, value);
            }

            Instruction::And { dr, sr1, operand } => {
                let value = self.regs.get(sr1) & self.operand(operand);
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Not { dr, sr } => {
                let value = !self.regs.get(sr);
                self.regs.set_with_flags(dr, value);
            }

            // ==================== Data Movement ====================

            Instruction::Ld { dr, offset } => {
                let addr = self.regs.pc_relative(offset);
                let value = self.mem.read(addr, &mut self.console)?;
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Ldi { dr, offset } => {
                let pointer = self.mem.read(self.regs.pc_relative(offset), &mut self.console)?;
                let value = self.mem.read(pointer, &mut self.console)?;
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Ldr { dr, base, offset } => {
                let addr = self.regs.get(base).wrapping_add(offset);
                let value = self.mem.read(addr, &mut self.console)?;
                self.regs.set_with_flags(dr, value);
            }

            Instruction::Lea { dr, offset } => {
                let addr = self.regs.pc_relative(offset);
                self.regs.set_with_flags(dr, addr);
            }

            Instruction::St { sr, offset } => {
                let addr = self.regs.pc_relative(offset);
                self.mem.write(addr, self.regs.get(sr));
            }

            Instruction::Sti { sr, offset } => {
                let pointer = self.mem.read(self.regs.pc_relative(offset), &mut self.console)?;
                self.mem.write(pointer, self.regs.get(sr));
            }

            Instruction::Str { sr, base, offset } => {
                let addr = self.regs.get(base).wrapping_add(offset);
                self.mem.write(addr, self.regs.get(sr));
            }

            // ==================== Control ====================

            Instruction::Br { nzp, offset } => {
                if nzp & self.regs.cond.bits() != 0 {
                    self.regs.pc = self.regs.pc_relative(offset);
                }
            }

            Instruction::Jmp { base } => {
                self.regs.pc = self.regs.get(base);
            }

            Instruction::Jsr { offset } => {
                let target = self.regs.pc_relative(offset);
                self.regs.set(LINK_REGISTER, self.regs.pc);
                self.regs.pc = target;
            }

            Instruction::Jsrr { base } => {
                // Read the base first: JSRR R7 must jump to the old R7.
                let target = self.regs.get(base);
                self.regs.set(LINK_REGISTER, self.regs.pc);
                self.regs.pc = target;
            }

            Instruction::Trap { vector } => {
                let trap = TrapVector::try_from(vector)
                    .map_err(|vector| CpuError::UnknownTrap { vector, address })?;
                self.trap(trap)?;
            }

            // ==================== Unimplemented ====================

            Instruction::Rti => {
                return Err(CpuError::ReservedOpcode { opcode: Opcode::Rti, address });
            }

            Instruction::Res => {
                return Err(CpuError::ReservedOpcode { opcode: Opcode::Res, address });
            }
        }

        Ok(())
    }

    /// Value of the second ADD/AND source.
    #[inline]
    fn operand(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Reg(sr2) => self.regs.get(sr2),
            Operand::Imm(imm) => imm,
        }
    }

    /// Run a trap service routine.
    fn trap(&mut self, trap: TrapVector) -> Result<(), CpuError> {
        debug!("trap {}", trap);

        match trap {
            TrapVector::Getc => {
                let ch = self.console.read_char()?;
                self.regs.set(0, u16::from(ch));
            }

            TrapVector::Out => {
                self.console.write_char(self.regs.get(0) as u8)?;
                self.console.flush()?;
            }

            TrapVector::Puts => {
                let start = self.regs.get(0);
                for word in self.string_words(start) {
                    self.console.write_char(word as u8)?;
                }
                self.console.flush()?;
            }

            TrapVector::In => {
                self.write_str(IN_PROMPT)?;
                self.console.flush()?;
                let ch = self.console.read_char()?;
                self.console.write_char(ch)?;
                self.console.flush()?;
                self.regs.set(0, u16::from(ch));
            }

            TrapVector::Putsp => {
                let start = self.regs.get(0);
                for word in self.string_words(start) {
                    self.console.write_char(word as u8)?;
                    let high = (word >> 8) as u8;
                    if high != 0 {
                        self.console.write_char(high)?;
                    }
                }
                self.console.flush()?;
            }

            TrapVector::Halt => {
                self.write_str(HALT_NOTICE)?;
                self.console.flush()?;
                self.state = CpuState::Halted;
            }
        }

        Ok(())
    }

    /// Words of a zero-terminated string starting at `start`, excluding
    /// the terminator. Reads bypass device side effects and stop after one
    /// full pass over memory.
    fn string_words(&self, start: u16) -> Vec<u16> {
        (0..MEMORY_SIZE)
            .map(|i| self.mem.peek(start.wrapping_add(i as u16)))
            .take_while(|&word| word != 0)
            .collect()
    }

    fn write_str(&mut self, s: &str) -> Result<(), ConsoleError> {
        for b in s.bytes() {
            self.console.write_char(b)?;
        }
        Ok(())
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl<C> std::fmt::Debug for Cpu<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("unimplemented opcode {opcode:?} at {address:#06x}")]
    ReservedOpcode { opcode: Opcode, address: u16 },

    #[error("unknown trap vector {vector:#04x} at {address:#06x}")]
    UnknownTrap { vector: u8, address: u16 },

    #[error("console error: {0}")]
    Console(#[from] ConsoleError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alu::CondFlag;
    use crate::cpu::decode::encode;
    use crate::cpu::registers::PC_START;
    use crate::io::StreamConsole;
    use proptest::prelude::*;

    type TestConsole = StreamConsole<Vec<u8>>;

    const HALT: Instruction = Instruction::Trap { vector: 0x25 };

    fn make_program(instructions: &[Instruction]) -> Vec<u16> {
        instructions.iter().map(encode).collect()
    }

    fn machine(input: &[u8], instructions: &[Instruction]) -> Cpu<TestConsole> {
        let console = StreamConsole::scripted(input, Vec::new());
        let mut cpu = Cpu::new(console);
        cpu.load_program(PC_START, &make_program(instructions)).unwrap();
        cpu
    }

    fn output(cpu: &Cpu<TestConsole>) -> String {
        String::from_utf8_lossy(cpu.console().output()).into_owned()
    }

    #[test]
    fn test_cpu_halt() {
        let mut cpu = machine(b"", &[HALT]);

        let executed = cpu.run().unwrap();

        assert_eq!(executed, 1);
        assert!(cpu.is_halted());
        assert_eq!(output(&cpu), "HALT\n");
    }

    #[test]
    fn test_halt_stops_fetching() {
        let mut cpu = machine(b"", &[
            HALT,
            Instruction::Add { dr: 0, sr1: 0, operand: Operand::Imm(1) },
        ]);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.pc, 0x3001);
        assert_eq!(cpu.regs.get(0), 0);
        assert_eq!(cpu.step(), Err(CpuError::NotRunning(CpuState::Halted)));
    }

    #[test]
    fn test_add_immediate() {
        let mut cpu = machine(b"", &[
            Instruction::Add { dr: 0, sr1: 1, operand: Operand::Imm(0xFFFD) },
            HALT,
        ]);
        cpu.regs.set(1, 5);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(0), 2);
        assert_eq!(cpu.regs.cond, CondFlag::Pos);
    }

    #[test]
    fn test_add_register_wraps() {
        let mut cpu = machine(b"", &[
            Instruction::Add { dr: 2, sr1: 3, operand: Operand::Reg(4) },
            HALT,
        ]);
        cpu.regs.set(3, 0xFFFF);
        cpu.regs.set(4, 0x0001);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(2), 0);
        assert_eq!(cpu.regs.cond, CondFlag::Zero);
    }

    #[test]
    fn test_and_and_not() {
        let mut cpu = machine(b"", &[
            Instruction::And { dr: 1, sr1: 0, operand: Operand::Imm(0x000F) },
            Instruction::Not { dr: 2, sr: 1 },
            Instruction::And { dr: 3, sr1: 3, operand: Operand::Imm(0) },
            HALT,
        ]);
        cpu.regs.set(0, 0x1234);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.get(1), 0x0004);
        assert_eq!(cpu.regs.cond, CondFlag::Pos);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.get(2), 0xFFFB);
        assert_eq!(cpu.regs.cond, CondFlag::Neg);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.cond, CondFlag::Zero);
    }

    #[test]
    fn test_ld_and_lea() {
        let mut cpu = machine(b"", &[
            Instruction::Ld { dr: 0, offset: 2 },
            Instruction::Lea { dr: 1, offset: 0xFFFF },
            HALT,
        ]);
        cpu.mem.write(0x3003, 0x8001);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.get(0), 0x8001);
        assert_eq!(cpu.regs.cond, CondFlag::Neg);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.get(1), 0x3001);
        assert_eq!(cpu.regs.cond, CondFlag::Pos);
    }

    #[test]
    fn test_ldi_indirect() {
        let mut cpu = machine(b"", &[
            Instruction::Ldi { dr: 4, offset: 9 },
            HALT,
        ]);
        // Pointer at PC + 9 = 0x300A, pointing at 0x4000.
        cpu.mem.write(0x300A, 0x4000);
        cpu.mem.write(0x4000, 0x0077);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(4), 0x0077);
        assert_eq!(cpu.regs.cond, CondFlag::Pos);
    }

    #[test]
    fn test_ldr_str_base_offset() {
        let mut cpu = machine(b"", &[
            Instruction::Ldr { dr: 0, base: 1, offset: 0xFFFF },
            Instruction::Str { sr: 0, base: 1, offset: 0x0001 },
            HALT,
        ]);
        cpu.regs.set(1, 0x5000);
        cpu.mem.write(0x4FFF, 0xABCD);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(0), 0xABCD);
        assert_eq!(cpu.mem.peek(0x5001), 0xABCD);
    }

    #[test]
    fn test_st_and_sti_write() {
        let mut cpu = machine(b"", &[
            Instruction::St { sr: 2, offset: 0x10 },
            Instruction::Sti { sr: 2, offset: 0x10 },
            HALT,
        ]);
        cpu.regs.set(2, 0x0042);
        cpu.mem.write(0x3012, 0x6000);

        cpu.run().unwrap();

        assert_eq!(cpu.mem.peek(0x3011), 0x0042);
        assert_eq!(cpu.mem.peek(0x6000), 0x0042);
        // The pointer itself is untouched.
        assert_eq!(cpu.mem.peek(0x3012), 0x6000);
    }

    #[test]
    fn test_stores_leave_flags() {
        let mut cpu = machine(b"", &[
            Instruction::St { sr: 0, offset: 0x10 },
            HALT,
        ]);
        cpu.regs.set(0, 0x8000);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.cond, CondFlag::Zero);
    }

    #[test]
    fn test_branch_taken_backwards() {
        // Count R0 down from 3 to 0.
        let mut cpu = machine(b"", &[
            Instruction::Add { dr: 0, sr1: 0, operand: Operand::Imm(0xFFFF) },
            Instruction::Br { nzp: 0b001, offset: 0xFFFE },
            HALT,
        ]);
        cpu.regs.set(0, 3);

        let executed = cpu.run().unwrap();

        assert_eq!(cpu.regs.get(0), 0);
        assert_eq!(executed, 7);
    }

    #[test]
    fn test_jsr_then_ret() {
        let mut cpu = machine(b"", &[
            Instruction::Jsr { offset: 2 },
            HALT,
            Instruction::Add { dr: 0, sr1: 0, operand: Operand::Imm(0x0F) },
            Instruction::Add { dr: 0, sr1: 0, operand: Operand::Imm(1) },
            Instruction::Jmp { base: 7 },
        ]);

        cpu.step().unwrap();
        assert_eq!(cpu.regs.pc, 0x3003);
        assert_eq!(cpu.regs.get(7), 0x3001);

        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(0), 1);
        assert_eq!(cpu.regs.pc, 0x3002);
    }

    #[test]
    fn test_jsrr_through_link_register() {
        let mut cpu = machine(b"", &[Instruction::Jsrr { base: 7 }]);
        cpu.regs.set(7, 0x4000);

        cpu.step().unwrap();

        assert_eq!(cpu.regs.pc, 0x4000);
        assert_eq!(cpu.regs.get(7), 0x3001);
    }

    #[test]
    fn test_reserved_opcodes_fault() {
        for (instr, opcode) in [(Instruction::Rti, Opcode::Rti), (Instruction::Res, Opcode::Res)] {
            let mut cpu = machine(b"", &[instr]);

            let err = cpu.run().unwrap_err();

            assert_eq!(err, CpuError::ReservedOpcode { opcode, address: 0x3000 });
            assert_eq!(cpu.state, CpuState::Faulted);
        }
    }

    #[test]
    fn test_unknown_trap_faults() {
        let mut cpu = machine(b"", &[Instruction::Trap { vector: 0x30 }]);

        let err = cpu.run().unwrap_err();

        assert_eq!(err, CpuError::UnknownTrap { vector: 0x30, address: 0x3000 });
        assert_eq!(cpu.state, CpuState::Faulted);
    }

    #[test]
    fn test_trap_leaves_r7_and_flags() {
        let mut cpu = machine(b"", &[Instruction::Trap { vector: 0x21 }, HALT]);
        cpu.regs.set(0, u16::from(b'!'));
        cpu.regs.set(7, 0x1234);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(7), 0x1234);
        assert_eq!(cpu.regs.cond, CondFlag::Zero);
        assert_eq!(output(&cpu), "!HALT\n");
    }

    #[test]
    fn test_getc_no_echo() {
        let mut cpu = machine(b"q", &[Instruction::Trap { vector: 0x20 }, HALT]);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(0), u16::from(b'q'));
        assert_eq!(output(&cpu), "HALT\n");
    }

    #[test]
    fn test_in_prompts_and_echoes() {
        let mut cpu = machine(b"z", &[Instruction::Trap { vector: 0x23 }, HALT]);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(0), u16::from(b'z'));
        assert_eq!(output(&cpu), "Enter a character: zHALT\n");
    }

    #[test]
    fn test_getc_end_of_input_faults() {
        let mut cpu = machine(b"", &[Instruction::Trap { vector: 0x20 }]);

        let err = cpu.run().unwrap_err();

        assert_eq!(err, CpuError::Console(ConsoleError::EndOfInput));
    }

    #[test]
    fn test_puts_stops_at_terminator() {
        let mut cpu = machine(b"", &[Instruction::Trap { vector: 0x22 }, HALT]);
        cpu.mem.load_program(0x4000, &[u16::from(b'H'), u16::from(b'I'), 0, u16::from(b'X')]).unwrap();
        cpu.regs.set(0, 0x4000);

        cpu.run().unwrap();

        assert_eq!(output(&cpu), "HIHALT\n");
    }

    #[test]
    fn test_putsp_packed() {
        let mut cpu = machine(b"", &[Instruction::Trap { vector: 0x24 }, HALT]);
        // "abc": 'a' | 'b' << 8, then 'c' with an empty high byte.
        cpu.mem.load_program(0x4000, &[0x6261, 0x0063, 0]).unwrap();
        cpu.regs.set(0, 0x4000);

        cpu.run().unwrap();

        assert_eq!(output(&cpu), "abcHALT\n");
    }

    #[test]
    fn test_keyboard_polling_loop() {
        // poll: LDI R0, KBSR_PTR ; BRzp poll ; LDI R0, KBDR_PTR ; HALT
        let mut cpu = machine(b"k", &[
            Instruction::Ldi { dr: 0, offset: 3 },
            Instruction::Br { nzp: 0b011, offset: 0xFFFE },
            Instruction::Ldi { dr: 0, offset: 2 },
            HALT,
        ]);
        cpu.mem.write(0x3004, 0xFE00);
        cpu.mem.write(0x3005, 0xFE02);

        cpu.run().unwrap();

        assert_eq!(cpu.regs.get(0), u16::from(b'k'));
    }

    #[test]
    fn test_run_limited() {
        let mut cpu = machine(b"", &[
            Instruction::Br { nzp: 0b111, offset: 0xFFFF },
        ]);

        let executed = cpu.run_limited(10).unwrap();

        assert_eq!(executed, 10);
        assert!(cpu.is_running());
    }

    #[test]
    fn test_fetch_from_keyboard_status() {
        // JMP to KBSR: with a key waiting the fetched word is 0x8000 (RTI).
        let mut cpu = machine(b"x", &[Instruction::Jmp { base: 1 }]);
        cpu.regs.set(1, 0xFE00);

        cpu.step().unwrap();
        let err = cpu.step().unwrap_err();

        assert_eq!(err, CpuError::ReservedOpcode { opcode: Opcode::Rti, address: 0xFE00 });
        assert_eq!(cpu.mem.peek(0xFE00), 0x8000);
        assert_eq!(cpu.state, CpuState::Faulted);
    }

    #[test]
    fn test_fetch_from_idle_keyboard_status() {
        // No key: KBSR reads as 0x0000, which is a never-taken BR.
        let mut cpu = machine(b"", &[Instruction::Jmp { base: 1 }]);
        cpu.regs.set(1, 0xFE00);
        cpu.mem.write(0xFE00, 0x8000);

        cpu.run_limited(2).unwrap();

        assert_eq!(cpu.regs.pc, 0xFE01);
        assert!(cpu.is_running());
    }

    /// Console whose interrupt key fires on the third poll.
    struct InterruptAfter {
        polls: u32,
    }

    impl Console for InterruptAfter {
        fn key_available(&mut self) -> Result<bool, ConsoleError> {
            Ok(false)
        }

        fn read_char(&mut self) -> Result<u8, ConsoleError> {
            Err(ConsoleError::EndOfInput)
        }

        fn write_char(&mut self, _ch: u8) -> Result<(), ConsoleError> {
            Ok(())
        }

        fn flush(&mut self) -> Result<(), ConsoleError> {
            Ok(())
        }

        fn poll_interrupt(&mut self) -> Result<(), ConsoleError> {
            self.polls += 1;
            if self.polls == 3 {
                return Err(ConsoleError::Interrupted);
            }
            Ok(())
        }
    }

    #[test]
    fn test_interrupt_stops_compute_loop() {
        // BR #-1 spins forever without touching the keyboard.
        let mut cpu = Cpu::new(InterruptAfter { polls: 0 });
        cpu.load_program(PC_START, &make_program(&[Instruction::Br { nzp: 0b111, offset: 0xFFFF }])).unwrap();

        let err = cpu.run().unwrap_err();

        assert_eq!(err, CpuError::Console(ConsoleError::Interrupted));
        assert_eq!(cpu.state, CpuState::Faulted);
        assert_eq!(cpu.cycles, 2 * INTERRUPT_POLL_INTERVAL);
    }

    #[test]
    fn test_reset() {
        let mut cpu = machine(b"", &[HALT]);
        cpu.run().unwrap();

        cpu.reset();

        assert!(cpu.is_running());
        assert_eq!(cpu.regs.pc, PC_START);
        assert_eq!(cpu.mem.peek(PC_START), 0);
        assert_eq!(cpu.cycles, 0);
    }

    proptest! {
        #[test]
        fn prop_branch_not_taken_on_disjoint_mask(
            flag in prop::sample::select(vec![CondFlag::Neg, CondFlag::Zero, CondFlag::Pos]),
            mask in 0u16..8,
            offset in 0u16..0x200,
        ) {
            prop_assume!(mask & flag.bits() == 0);
            let offset = crate::alu::sign_extend(offset, 9);
            let mut cpu = machine(b"", &[Instruction::Br { nzp: mask, offset }]);
            cpu.regs.cond = flag;

            cpu.step().unwrap();

            prop_assert_eq!(cpu.regs.pc, 0x3001);
        }

        #[test]
        fn prop_add_sets_exactly_one_flag(a in any::<u16>(), b in any::<u16>()) {
            let mut cpu = machine(b"", &[Instruction::Add { dr: 0, sr1: 1, operand: Operand::Reg(2) }]);
            cpu.regs.set(1, a);
            cpu.regs.set(2, b);

            cpu.step().unwrap();

            prop_assert_eq!(cpu.regs.get(0), a.wrapping_add(b));
            prop_assert_eq!(cpu.regs.cond, CondFlag::of(a.wrapping_add(b)));
        }
    }
}
