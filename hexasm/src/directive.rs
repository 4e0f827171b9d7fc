use hex::{encoded_size, Instr, OprInstr};
use std::fmt;
use util::Location;

/// One unit of assembler IR: a label, data word, instruction or padding.
///
/// `byte_offset` and the operand of label-referencing instructions are
/// filled in by the fixed-point resolver; `size()` reads the current
/// operand, so a directive's size can grow between resolution passes.
#[derive(Clone, Debug, PartialEq)]
pub struct Directive {
    pub location: Location,
    pub byte_offset: u32,
    pub assembled: bool,
    pub kind: DirectiveKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DirectiveKind {
    Data(i32),
    Func(String),
    Proc(String),
    Label { name: String, value: i32 },
    InstrImm { instr: Instr, value: i32 },
    InstrLabel { instr: Instr, label: String, relative: bool, value: i32 },
    InstrOp(OprInstr),
    Padding(usize),
}

impl Directive {
    pub fn new(location: Location, kind: DirectiveKind) -> Directive {
        Directive {
            location,
            byte_offset: 0,
            assembled: false,
            kind,
        }
    }

    /// Convenience constructor for synthesized directives, which have no
    /// source position.
    pub fn synth(kind: DirectiveKind) -> Directive {
        Directive::new(Location::default(), kind)
    }

    pub fn size(&self) -> usize {
        match &self.kind {
            DirectiveKind::Data(_) => 4,
            DirectiveKind::Func(_) | DirectiveKind::Proc(_) | DirectiveKind::Label { .. } => 0,
            DirectiveKind::InstrImm { value, .. } => encoded_size(*value),
            DirectiveKind::InstrLabel { value, .. } => encoded_size(*value),
            DirectiveKind::InstrOp(_) => 1,
            DirectiveKind::Padding(bytes) => *bytes,
        }
    }

    pub fn label_name(&self) -> Option<&str> {
        match &self.kind {
            DirectiveKind::Label { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            DirectiveKind::Data(value) => write!(f, "DATA {}", value),
            DirectiveKind::Func(name) => write!(f, "FUNC {}", name),
            DirectiveKind::Proc(name) => write!(f, "PROC {}", name),
            DirectiveKind::Label { name, .. } => write!(f, "{}", name),
            DirectiveKind::InstrImm { instr, value } => write!(f, "{} {}", instr, value),
            DirectiveKind::InstrLabel { instr, label, value, .. } => {
                if self.assembled {
                    write!(f, "{} {} ({})", instr, label, value)
                } else {
                    write!(f, "{} {}", instr, label)
                }
            }
            DirectiveKind::InstrOp(opr) => write!(f, "OPR {}", opr),
            DirectiveKind::Padding(bytes) => write!(f, "PADDING {}", bytes),
        }
    }
}
