//! Reading and writing of Hex binaries.
//!
//! The layout is little-endian throughout: a `u32` program size in words, a
//! program image padded to a word boundary, and an optional debug section
//! holding symbol names and byte offsets:
//!
//! ```text
//! u32 size_in_words
//! u8  program[size_in_words * 4]
//! u32 num_strings          \
//! str strings (NUL ended)   | only when debug
//! u32 num_symbols           | symbols exist
//! u32 string_index, u32 byte_offset, ...  /
//! ```

use byteorder::{ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::prelude::*;
use std::io::{self, BufReader, BufWriter, Cursor};
use std::path::Path;
use util::Endian;

#[derive(Clone, Debug, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub byte_offset: u32,
}

impl Symbol {
    pub fn new(name: String, byte_offset: u32) -> Symbol {
        Symbol { name, byte_offset }
    }
}

#[derive(Debug, PartialEq)]
pub struct Program {
    bytes: Vec<u8>,
    symbols: Vec<Symbol>,
}

impl Program {
    /// The program image must be a whole number of words.
    pub fn from(bytes: Vec<u8>, symbols: Vec<Symbol>) -> Program {
        assert!(bytes.len() % 4 == 0);
        Program { bytes, symbols }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..]
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols[..]
    }

    pub fn size_words(&self) -> u32 {
        (self.bytes.len() / 4) as u32
    }
}

pub fn read<R: Read>(reader: &mut R) -> io::Result<Program> {
    let size_words = reader.read_u32::<Endian>()?;
    let mut bytes = vec![0; size_words as usize * 4];
    reader.read_exact(&mut bytes)?;

    let mut rest = Vec::new();
    reader.read_to_end(&mut rest)?;
    let symbols = if rest.is_empty() {
        Vec::new()
    } else {
        read_debug(&mut Cursor::new(rest))?
    };

    Ok(Program::from(bytes, symbols))
}

fn read_debug<R: Read>(reader: &mut R) -> io::Result<Vec<Symbol>> {
    let num_strings = reader.read_u32::<Endian>()?;
    let mut strings = Vec::with_capacity(num_strings as usize);
    for _ in 0..num_strings {
        let mut string = Vec::new();
        loop {
            let byte = reader.read_u8()?;
            if byte == 0 {
                break;
            }
            string.push(byte);
        }
        strings.push(String::from_utf8(string).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidData, "debug string is not utf-8")
        })?);
    }
    let num_symbols = reader.read_u32::<Endian>()?;
    let mut symbols = Vec::with_capacity(num_symbols as usize);
    for _ in 0..num_symbols {
        let string_index = reader.read_u32::<Endian>()?;
        let byte_offset = reader.read_u32::<Endian>()?;
        let name = strings
            .get(string_index as usize)
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, "debug string index out of range")
            })?
            .clone();
        symbols.push(Symbol::new(name, byte_offset));
    }
    Ok(symbols)
}

pub fn write<W: Write>(writer: &mut W, program: &Program) -> io::Result<()> {
    writer.write_u32::<Endian>(program.size_words())?;
    writer.write_all(program.bytes())?;
    if !program.symbols.is_empty() {
        writer.write_u32::<Endian>(program.symbols.len() as u32)?;
        for symbol in &program.symbols {
            writer.write_all(symbol.name.as_bytes())?;
            writer.write_u8(0)?;
        }
        writer.write_u32::<Endian>(program.symbols.len() as u32)?;
        for (i, symbol) in program.symbols.iter().enumerate() {
            writer.write_u32::<Endian>(i as u32)?;
            writer.write_u32::<Endian>(symbol.byte_offset)?;
        }
    }
    Ok(())
}

pub trait ReadHexExt: Read + Sized {
    fn read_hex(&mut self) -> io::Result<Program> {
        read(self)
    }
}

impl<R: Read + Sized> ReadHexExt for R {}

pub trait WriteHexExt: Write + Sized {
    fn write_hex(&mut self, program: &Program) -> io::Result<()> {
        write(self, program)
    }
}

impl<W: Write + Sized> WriteHexExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> io::Result<Program> {
    BufReader::new(File::open(path)?).read_hex()
}

pub fn write_file<P: AsRef<Path>>(path: P, program: &Program) -> io::Result<()> {
    BufWriter::new(File::create(path)?).write_hex(program)
}

#[cfg(test)]
mod test;
