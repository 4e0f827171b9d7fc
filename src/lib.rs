//! Core crate for the Hex processor: the instruction set, the encoding
//! primitives shared with the [hexasm](../hexasm/index.html) assembler, and
//! the instruction-level simulator.
//!
//! Hex is an accumulator machine with one-byte instructions: a 4-bit opcode
//! and a 4-bit immediate nibble. Operands wider than four bits are built up
//! across a chain of `PFIX`/`NFIX` prefix instructions that shift the
//! operand register `oreg` left a nibble at a time; `NFIX` additionally
//! fills the high bits with ones so negative operands sign-extend. The
//! [`Processor`](processor/struct.Processor.html) executes binaries produced
//! by the assembler, routing syscalls to a host I/O multiplexer.

pub mod constants;
pub mod encoding;
pub mod enums;
pub mod io;
pub mod memory;
pub mod processor;

pub use crate::encoding::{decode, encode, encode_into, encoded_size, instr_len, num_nibbles};
pub use crate::enums::{Instr, OprInstr, Syscall};
pub use crate::io::SimIo;
pub use crate::memory::Memory;
pub use crate::processor::{Error, Processor};

pub type Word = u32;
