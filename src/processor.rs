use crate::constants;
use crate::enums::{Instr, OprInstr, Syscall};
use crate::io::SimIo;
use crate::memory::Memory;
use num::FromPrimitive;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid instruction {value:#04x} at pc {pc:#08x}")]
    InvalidInstruction { pc: u32, value: u32 },
    #[error("invalid OPR operand {value} at pc {pc:#08x}")]
    InvalidOpr { pc: u32, value: u32 },
    #[error("invalid syscall {value} at pc {pc:#08x}")]
    InvalidSyscall { pc: u32, value: u32 },
    #[error("memory access out of bounds at word {index:#08x}")]
    OutOfBounds { index: u32 },
    #[error("program of {0} bytes does not fit in memory")]
    ProgramTooLarge(usize),
    #[error("simulator i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Instruction-level simulator for the Hex processor.
///
/// Registers are 32 bits wide and all arithmetic wraps; only `BRN`
/// interprets `areg` as signed. The operand register `oreg` accumulates
/// immediate nibbles across PFIX/NFIX prefixes and is cleared by every
/// other instruction.
pub struct Processor {
    pc: u32,
    areg: u32,
    breg: u32,
    oreg: u32,
    instr: u32,
    memory: Memory,
    io: SimIo,
    running: bool,
    tracing: bool,
    truncate_inputs: bool,
    exit_code: i32,
    last_pc: u32,
    cycles: u64,
    max_cycles: u64,
    debug_info: Vec<(String, u32)>,
}

impl Processor {
    pub fn new(io: SimIo) -> Processor {
        Processor {
            pc: 0,
            areg: 0,
            breg: 0,
            oreg: 0,
            instr: 0,
            memory: Memory::new(constants::MEMORY_SIZE_WORDS),
            io,
            running: true,
            tracing: false,
            truncate_inputs: true,
            exit_code: 0,
            last_pc: 0,
            cycles: 0,
            max_cycles: 0,
            debug_info: Vec::new(),
        }
    }

    pub fn set_tracing(&mut self, value: bool) {
        self.tracing = value;
    }

    /// READ results are masked to a byte unless truncation is disabled, in
    /// which case end of file is visible to the guest as -1.
    pub fn set_truncate_inputs(&mut self, value: bool) {
        self.truncate_inputs = value;
    }

    /// Cap the number of cycles executed by `run`; zero means no limit.
    pub fn set_max_cycles(&mut self, value: u64) {
        self.max_cycles = value;
    }

    pub fn load_image(&mut self, bytes: &[u8]) -> Result<(), Error> {
        if !self.memory.load_bytes(bytes) {
            return Err(Error::ProgramTooLarge(bytes.len()));
        }
        Ok(())
    }

    pub fn set_debug_info(&mut self, symbols: Vec<(String, u32)>) {
        self.debug_info = symbols;
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn read_mem(&self, index: u32) -> Result<u32, Error> {
        self.memory.read(index).ok_or(Error::OutOfBounds { index })
    }

    fn write_mem(&mut self, index: u32, value: u32) -> Result<(), Error> {
        if self.memory.write(index, value) {
            Ok(())
        } else {
            Err(Error::OutOfBounds { index })
        }
    }

    /// Run until the program exits, a fault occurs, or the cycle limit is
    /// reached. Returns the exit code delivered by the EXIT syscall.
    pub fn run(&mut self) -> Result<i32, Error> {
        while self.running && (self.max_cycles == 0 || self.cycles <= self.max_cycles) {
            self.step()?;
        }
        self.io.flush()?;
        Ok(self.exit_code)
    }

    fn step(&mut self) -> Result<(), Error> {
        self.instr = u32::from(
            self.memory
                .byte(self.pc)
                .ok_or(Error::OutOfBounds { index: self.pc >> 2 })?,
        );
        self.last_pc = self.pc;
        self.pc = self.pc.wrapping_add(1);
        self.oreg |= self.instr & 0xF;
        let opcode = (self.instr >> constants::OPCODE_OFFSET) & 0xF;
        let instr = Instr::from_u32(opcode).ok_or(Error::InvalidInstruction {
            pc: self.last_pc,
            value: self.instr,
        })?;
        if self.tracing {
            self.trace(instr);
        }
        match instr {
            Instr::LDAM => {
                self.areg = self.read_mem(self.oreg)?;
                self.oreg = 0;
            }
            Instr::LDBM => {
                self.breg = self.read_mem(self.oreg)?;
                self.oreg = 0;
            }
            Instr::STAM => {
                self.write_mem(self.oreg, self.areg)?;
                self.oreg = 0;
            }
            Instr::LDAC => {
                self.areg = self.oreg;
                self.oreg = 0;
            }
            Instr::LDBC => {
                self.breg = self.oreg;
                self.oreg = 0;
            }
            Instr::LDAP => {
                self.areg = self.pc.wrapping_add(self.oreg);
                self.oreg = 0;
            }
            Instr::LDAI => {
                self.areg = self.read_mem(self.areg.wrapping_add(self.oreg))?;
                self.oreg = 0;
            }
            Instr::LDBI => {
                self.breg = self.read_mem(self.breg.wrapping_add(self.oreg))?;
                self.oreg = 0;
            }
            Instr::STAI => {
                self.write_mem(self.breg.wrapping_add(self.oreg), self.areg)?;
                self.oreg = 0;
            }
            Instr::BR => {
                self.pc = self.pc.wrapping_add(self.oreg);
                self.oreg = 0;
            }
            Instr::BRZ => {
                if self.areg == 0 {
                    self.pc = self.pc.wrapping_add(self.oreg);
                }
                self.oreg = 0;
            }
            Instr::BRN => {
                if (self.areg as i32) < 0 {
                    self.pc = self.pc.wrapping_add(self.oreg);
                }
                self.oreg = 0;
            }
            Instr::PFIX => {
                self.oreg <<= 4;
            }
            Instr::NFIX => {
                self.oreg = 0xFFFF_FF00 | (self.oreg << 4);
            }
            Instr::OPR => {
                let opr = OprInstr::from_u32(self.oreg).ok_or(Error::InvalidOpr {
                    pc: self.last_pc,
                    value: self.oreg,
                })?;
                match opr {
                    OprInstr::BRB => self.pc = self.breg,
                    OprInstr::ADD => self.areg = self.areg.wrapping_add(self.breg),
                    OprInstr::SUB => self.areg = self.areg.wrapping_sub(self.breg),
                    OprInstr::SVC => self.syscall()?,
                }
                self.oreg = 0;
            }
        }
        self.cycles += 1;
        Ok(())
    }

    fn syscall(&mut self) -> Result<(), Error> {
        let sp = self.read_mem(constants::SP_WORD_INDEX)?;
        match Syscall::from_u32(self.areg) {
            Some(Syscall::EXIT) => {
                self.exit_code = self.read_mem(sp.wrapping_add(2))? as i32;
                self.running = false;
            }
            Some(Syscall::WRITE) => {
                let value = self.read_mem(sp.wrapping_add(2))?;
                let stream = self.read_mem(sp.wrapping_add(3))?;
                self.io.output(value as u8, stream)?;
            }
            Some(Syscall::READ) => {
                let stream = self.read_mem(sp.wrapping_add(2))?;
                let value = self.io.input(stream)?;
                let value = if self.truncate_inputs {
                    (value & 0xFF) as u32
                } else {
                    value as u32
                };
                self.write_mem(sp.wrapping_add(1), value)?;
            }
            None => {
                return Err(Error::InvalidSyscall {
                    pc: self.last_pc,
                    value: self.areg,
                })
            }
        }
        Ok(())
    }

    /// Find the debug symbol covering the last fetched pc.
    fn lookup_symbol(&self) -> Option<&(String, u32)> {
        let mut found = None;
        for entry in &self.debug_info {
            if entry.1 <= self.last_pc {
                found = Some(entry);
            } else {
                break;
            }
        }
        found
    }

    fn trace(&self, instr: Instr) {
        let mem = |index: u32| self.memory.read(index).unwrap_or(0);
        let effect = match instr {
            Instr::LDAM => format!("areg = mem[oreg ({:#08x})] ({})", self.oreg, mem(self.oreg)),
            Instr::LDBM => format!("breg = mem[oreg ({:#08x})] ({})", self.oreg, mem(self.oreg)),
            Instr::STAM => format!("mem[oreg ({:#08x})] = areg ({})", self.oreg, self.areg),
            Instr::LDAC => format!("areg = oreg ({})", self.oreg as i32),
            Instr::LDBC => format!("breg = oreg ({})", self.oreg as i32),
            Instr::LDAP => format!(
                "areg = pc ({}) + oreg ({}) ({})",
                self.pc,
                self.oreg as i32,
                self.pc.wrapping_add(self.oreg)
            ),
            Instr::LDAI => {
                let index = self.areg.wrapping_add(self.oreg);
                format!(
                    "areg = mem[areg ({}) + oreg ({}) = {:#08x}] ({})",
                    self.areg, self.oreg as i32, index, mem(index)
                )
            }
            Instr::LDBI => {
                let index = self.breg.wrapping_add(self.oreg);
                format!(
                    "breg = mem[breg ({}) + oreg ({}) = {:#08x}] ({})",
                    self.breg, self.oreg as i32, index, mem(index)
                )
            }
            Instr::STAI => {
                let index = self.breg.wrapping_add(self.oreg);
                format!(
                    "mem[breg ({}) + oreg ({}) = {:#08x}] = areg ({})",
                    self.breg, self.oreg as i32, index, self.areg
                )
            }
            Instr::BR => format!(
                "pc = pc + oreg ({}) ({:#08x})",
                self.oreg as i32,
                self.pc.wrapping_add(self.oreg)
            ),
            Instr::BRZ => format!(
                "pc = areg == zero ? pc + oreg ({}) ({:#08x}) : pc",
                self.oreg as i32,
                self.pc.wrapping_add(self.oreg)
            ),
            Instr::BRN => format!(
                "pc = areg < zero ? pc + oreg ({}) ({:#08x}) : pc",
                self.oreg as i32,
                self.pc.wrapping_add(self.oreg)
            ),
            Instr::PFIX => format!(
                "oreg = oreg ({}) << 4 ({:#08x})",
                self.oreg,
                self.oreg << 4
            ),
            Instr::NFIX => format!(
                "oreg = 0xFFFFFF00 | oreg ({}) << 4 ({:#08x})",
                self.oreg,
                0xFFFF_FF00u32 | (self.oreg << 4)
            ),
            Instr::OPR => match OprInstr::from_u32(self.oreg) {
                Some(OprInstr::BRB) => format!("pc = breg ({:#08x})", self.breg),
                Some(OprInstr::ADD) => format!(
                    "areg = areg ({}) + breg ({}) ({})",
                    self.areg,
                    self.breg,
                    self.areg.wrapping_add(self.breg)
                ),
                Some(OprInstr::SUB) => format!(
                    "areg = areg ({}) - breg ({}) ({})",
                    self.areg,
                    self.breg,
                    self.areg.wrapping_sub(self.breg)
                ),
                Some(OprInstr::SVC) => self.trace_syscall(),
                None => format!("invalid OPR ({})", self.oreg),
            },
        };
        if self.debug_info.is_empty() {
            eprintln!(
                "{:<6} {:<6} {:<4} {:<2} {}",
                self.cycles,
                self.last_pc,
                instr.to_string(),
                self.instr & 0xF,
                effect
            );
        } else {
            let symbol = match self.lookup_symbol() {
                Some((name, offset)) => format!("{}+{}", name, self.last_pc - offset),
                None => String::new(),
            };
            eprintln!(
                "{:<6} {:<6} {:<12} {:<4} {:<2} {}",
                self.cycles,
                self.last_pc,
                symbol,
                instr.to_string(),
                self.instr & 0xF,
                effect
            );
        }
    }

    fn trace_syscall(&self) -> String {
        let mem = |index: u32| self.memory.read(index).unwrap_or(0);
        let sp = mem(constants::SP_WORD_INDEX);
        match Syscall::from_u32(self.areg) {
            Some(Syscall::EXIT) => format!("exit {}", mem(sp.wrapping_add(2)) as i32),
            Some(Syscall::WRITE) => format!(
                "write {} to stream {}",
                mem(sp.wrapping_add(2)),
                mem(sp.wrapping_add(3))
            ),
            Some(Syscall::READ) => format!(
                "read stream {} to mem[{:#08x}]",
                mem(sp.wrapping_add(2)),
                sp.wrapping_add(1)
            ),
            None => format!("invalid syscall ({})", self.areg),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::encoding::{encode, encode_into};
    use std::io::Cursor;

    fn harness(program: &[u8], input: &[u8]) -> Processor {
        let io = SimIo::with_streams(
            Box::new(Cursor::new(input.to_vec())),
            Box::new(Vec::new()),
        );
        let mut processor = Processor::new(io);
        processor.load_image(program).unwrap();
        processor
    }

    fn assemble(instrs: &[(Instr, i32)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for &(instr, operand) in instrs {
            encode_into(&mut bytes, instr, operand);
        }
        bytes
    }

    // A hand-assembled exit program: word 1 holds the stack pointer, the
    // exit code is stored at mem[sp+2], then EXIT is requested.
    fn exit_program(code: i32) -> Vec<u8> {
        let mut bytes = assemble(&[(Instr::BR, 7)]);
        bytes.resize(4, 0);
        bytes.extend_from_slice(&[16, 0, 0, 0]); // word 1: sp = 16
        bytes.extend(assemble(&[
            (Instr::LDAC, code), // areg = code
            (Instr::LDBM, 1),    // breg = sp
            (Instr::STAI, 2),    // mem[sp+2] = code
            (Instr::LDAC, Syscall::EXIT as i32),
        ]));
        bytes.extend(encode(Instr::OPR, OprInstr::SVC as i32));
        bytes
    }


    #[test]
    fn exit_codes_are_returned() {
        for &code in &[0, 1, 255, -255] {
            let mut processor = harness(&exit_program(code), b"");
            assert_eq!(processor.run().unwrap(), code);
        }
    }

    #[test]
    fn oreg_carries_across_prefixes() {
        // LDAC 0x123 via PFIX chains, then store it for EXIT.
        let mut bytes = assemble(&[(Instr::BR, 7)]);
        bytes.resize(4, 0);
        bytes.extend_from_slice(&[16, 0, 0, 0]);
        bytes.extend(assemble(&[
            (Instr::LDAC, 0x123),
            (Instr::LDBM, 1),
            (Instr::STAI, 2),
            (Instr::LDAC, 0),
            (Instr::OPR, OprInstr::SVC as i32),
        ]));
        let mut processor = harness(&bytes, b"");
        assert_eq!(processor.run().unwrap(), 0x123);
    }

    #[test]
    fn subtraction_wraps() {
        // areg = 0 - 1 must exit as -1.
        let mut bytes = assemble(&[(Instr::BR, 7)]);
        bytes.resize(4, 0);
        bytes.extend_from_slice(&[16, 0, 0, 0]);
        bytes.extend(assemble(&[
            (Instr::LDAC, 0),
            (Instr::LDBC, 1),
            (Instr::OPR, OprInstr::SUB as i32),
            (Instr::LDBM, 1),
            (Instr::STAI, 2),
            (Instr::LDAC, 0),
            (Instr::OPR, OprInstr::SVC as i32),
        ]));
        let mut processor = harness(&bytes, b"");
        assert_eq!(processor.run().unwrap(), -1);
    }

    #[test]
    fn invalid_opcode_faults() {
        // Opcode 0xC is unused.
        let mut processor = harness(&[0xC0, 0, 0, 0], b"");
        match processor.run() {
            Err(Error::InvalidInstruction { pc: 0, value: 0xC0 }) => {}
            other => panic!("expected invalid instruction, got {:?}", other.err()),
        }
    }

    #[test]
    fn invalid_opr_faults() {
        // OPR 7 is not a valid sub-operation.
        let mut processor = harness(&[0xD7, 0, 0, 0], b"");
        match processor.run() {
            Err(Error::InvalidOpr { value: 7, .. }) => {}
            other => panic!("expected invalid OPR, got {:?}", other.err()),
        }
    }

    #[test]
    fn max_cycles_stops_the_run() {
        // An infinite loop: BR -1 branches to itself.
        let mut processor = harness(&encode(Instr::BR, -1), b"");
        processor.set_max_cycles(100);
        assert_eq!(processor.run().unwrap(), 0);
        assert!(processor.cycles() >= 100);
    }
}
