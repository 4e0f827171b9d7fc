//! Driver utilities for the Hex simulator: load a binary (or assemble a
//! source file directly), optionally dump it, and run it to completion.

use hex::{Processor, SimIo};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Asm(#[from] hexasm::Error),
    #[error("{0}")]
    Sim(#[from] hex::Error),
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    pub dump: bool,
    pub trace: bool,
    pub max_cycles: u64,
}

/// Print the loaded program, one word per line.
pub fn dump<W: Write>(program: &hexfile::Program, out: &mut W) -> io::Result<()> {
    writeln!(out, "Read {} bytes", program.bytes().len())?;
    for (index, chunk) in program.bytes().chunks(4).enumerate() {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        writeln!(out, "{:08} {:08x}", index, u32::from_le_bytes(word))?;
    }
    Ok(())
}

/// Run a loaded program against the process's standard streams and return
/// the guest exit code.
pub fn run_program(program: &hexfile::Program, options: Options) -> Result<i32, Error> {
    let mut processor = Processor::new(SimIo::new());
    processor.load_image(program.bytes())?;
    processor.set_debug_info(
        program
            .symbols()
            .iter()
            .map(|symbol| (symbol.name.clone(), symbol.byte_offset))
            .collect(),
    );
    processor.set_tracing(options.trace);
    processor.set_max_cycles(options.max_cycles);
    Ok(processor.run()?)
}

pub fn run_file<P: AsRef<Path>>(path: P, options: Options) -> Result<i32, Error> {
    let program = hexfile::read_file(path)?;
    run(&program, options)
}

/// Assemble a source file and run the result, without writing a binary.
pub fn run_assembly_file<P: AsRef<Path>>(path: P, options: Options) -> Result<i32, Error> {
    let source = fs::read_to_string(path)?;
    let program = hexasm::assemble(&source)?;
    run(&program, options)
}

fn run(program: &hexfile::Program, options: Options) -> Result<i32, Error> {
    if options.dump {
        let stdout = io::stdout();
        dump(program, &mut stdout.lock())?;
        return Ok(0);
    }
    run_program(program, options)
}
