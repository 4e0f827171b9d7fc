use crate::directive::{Directive, DirectiveKind};
use crate::error::{Error, Result};
use byteorder::WriteBytesExt;
use hex::{encode_into, instr_len, Instr};
use hexfile::{Program, Symbol};
use std::collections::HashMap;
use std::io::{self, Write};
use util::Endian;

/// Resolves label values over a directive stream and emits the program.
///
/// An instruction's length depends on its operand, and a branch operand
/// depends on the layout of the surrounding instructions, so label values
/// are updated iteratively until the layout stops moving. The label map is
/// keyed by directive index to allow cheap rebuilds between passes.
#[derive(Debug)]
pub struct CodeGen {
    program: Vec<Directive>,
    label_map: HashMap<String, usize>,
}

impl CodeGen {
    pub fn new(program: Vec<Directive>) -> Result<CodeGen> {
        let mut codegen = CodeGen {
            label_map: create_label_map(&program),
            program,
        };
        codegen.resolve_labels()?;
        codegen.add_padding();
        Ok(codegen)
    }

    pub fn directives(&self) -> &[Directive] {
        &self.program
    }

    /// Size of the program in bytes, after resolution.
    pub fn program_size(&self) -> usize {
        match self.program.last() {
            Some(directive) => directive.byte_offset as usize + directive.size(),
            None => 0,
        }
    }

    /// Iteratively update label values and byte offsets until no directive
    /// moves. Sizes are bounded by the maximum operand width, so the
    /// iteration converges within a pass per directive in the worst case.
    fn resolve_labels(&mut self) -> Result<()> {
        let max_passes = self.program.len() + 8;
        let mut passes = 0;
        loop {
            let mut changed = false;
            let mut byte_offset = 0u32;
            for index in 0..self.program.len() {
                // Data must be on 4-byte boundaries. Labels naming a data
                // word bind to the aligned offset.
                if self.aligns(index) && byte_offset & 0x3 != 0 {
                    byte_offset += 4 - (byte_offset & 0x3);
                }
                let new_value = match &self.program[index].kind {
                    DirectiveKind::Label { .. } => Some(byte_offset as i32),
                    DirectiveKind::InstrLabel { label, relative, .. } => {
                        let target = self.label_value(index, label)?;
                        if *relative {
                            Some(
                                target
                                    - byte_offset as i32
                                    - instr_len(target, byte_offset as i32) as i32,
                            )
                        } else {
                            if target & 0x3 != 0 {
                                return Err(Error::UnalignedLabel {
                                    location: self.program[index].location,
                                    label: label.clone(),
                                });
                            }
                            Some(target >> 2)
                        }
                    }
                    _ => None,
                };
                if let Some(new_value) = new_value {
                    match &mut self.program[index].kind {
                        DirectiveKind::Label { value, .. }
                        | DirectiveKind::InstrLabel { value, .. } => {
                            if *value != new_value {
                                *value = new_value;
                                changed = true;
                            }
                        }
                        _ => unreachable!(),
                    }
                }
                let directive = &mut self.program[index];
                if directive.byte_offset != byte_offset || !directive.assembled {
                    directive.byte_offset = byte_offset;
                    directive.assembled = true;
                    changed = true;
                }
                byte_offset += directive.size() as u32;
            }
            if !changed {
                return Ok(());
            }
            passes += 1;
            if passes > max_passes {
                return Err(Error::ResolveDiverged);
            }
        }
    }

    /// Whether alignment padding is inserted ahead of this directive: data
    /// words, and the zero-sized label run in front of a data word.
    fn aligns(&self, index: usize) -> bool {
        for directive in &self.program[index..] {
            match directive.kind {
                DirectiveKind::Data(_) => return true,
                DirectiveKind::Func(_) | DirectiveKind::Proc(_) | DirectiveKind::Label { .. } => {}
                _ => return false,
            }
        }
        false
    }

    fn label_value(&self, index: usize, label: &str) -> Result<i32> {
        let target = self.label_map.get(label).ok_or_else(|| Error::UnknownLabel {
            location: self.program[index].location,
            label: label.to_owned(),
        })?;
        match &self.program[*target].kind {
            DirectiveKind::Label { value, .. } => Ok(*value),
            _ => unreachable!(),
        }
    }

    /// Append padding to bring the program size to a multiple of 4.
    fn add_padding(&mut self) {
        let size = self.program_size();
        let padding = (4 - size % 4) % 4;
        let mut directive = Directive::synth(DirectiveKind::Padding(padding));
        directive.byte_offset = size as u32;
        directive.assembled = true;
        self.program.push(directive);
    }

    /// Emit the resolved directive listing.
    pub fn emit_listing<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for directive in &self.program {
            writeln!(
                out,
                "{:#08x} {:<20} ({} bytes)",
                directive.byte_offset,
                directive.to_string(),
                directive.size()
            )?;
        }
        writeln!(out, "{} bytes", self.program_size())
    }

    /// Emit the program binary and its FUNC/PROC debug symbols.
    pub fn assemble(&self) -> Program {
        let mut bytes: Vec<u8> = Vec::with_capacity(self.program_size());
        let mut symbols = Vec::new();
        for directive in &self.program {
            match &directive.kind {
                DirectiveKind::Padding(count) => {
                    bytes.resize(bytes.len() + count, 0);
                }
                DirectiveKind::Data(value) => {
                    // Padding for 4-byte data alignment.
                    while bytes.len() & 0x3 != 0 {
                        bytes.push(0);
                    }
                    bytes.write_i32::<Endian>(*value).unwrap();
                }
                DirectiveKind::Func(name) | DirectiveKind::Proc(name) => {
                    symbols.push(Symbol::new(name.clone(), directive.byte_offset));
                }
                DirectiveKind::Label { .. } => {}
                DirectiveKind::InstrImm { instr, value } => {
                    encode_into(&mut bytes, *instr, *value);
                }
                DirectiveKind::InstrLabel { instr, value, .. } => {
                    encode_into(&mut bytes, *instr, *value);
                }
                DirectiveKind::InstrOp(opr) => {
                    bytes.push(((Instr::OPR as u32) << 4) as u8 | *opr as u8);
                }
            }
            if directive.size() > 0 {
                debug_assert_eq!(
                    bytes.len(),
                    directive.byte_offset as usize + directive.size(),
                    "emission out of step with resolution at {}",
                    directive
                );
            }
        }
        debug_assert_eq!(bytes.len() % 4, 0);
        Program::from(bytes, symbols)
    }
}

fn create_label_map(program: &[Directive]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (index, directive) in program.iter().enumerate() {
        if let Some(name) = directive.label_name() {
            map.insert(name.to_owned(), index);
        }
    }
    map
}
