use crate::constants;
use crate::enums::Instr;
use num::FromPrimitive;

/// Return the number of 4-bit nibbles required to encode the value with the
/// PFIX/NFIX prefixing scheme.
///
/// Zero takes a single nibble. Small negative values take two: a leading
/// NFIX supplies the high ones, and the trailing nibble sign-extends under
/// it. Larger negative values take as many nibbles as their magnitude,
/// since the leading prefix becomes the NFIX.
pub fn num_nibbles(value: i32) -> usize {
    if value == 0 {
        return 1;
    }
    let mut v = (value as i64).abs();
    if value < 0 && v < 16 {
        return 2;
    }
    let mut n = 1;
    while v >= 16 {
        v >>= 4;
        n += 1;
    }
    n
}

/// Return the number of bytes an instruction with the given operand
/// occupies, one byte per nibble.
pub fn encoded_size(operand: i32) -> usize {
    if operand < 0 && num_nibbles(operand) == 1 {
        2
    } else {
        num_nibbles(operand)
    }
}

/// Return the length of an instruction with a relative label reference.
/// The length of the encoding depends on the distance to the label, which
/// in turn depends on the length of the instruction, so increase the
/// length until it matches.
pub fn instr_len(label_offset: i32, byte_offset: i32) -> usize {
    let mut length = 1;
    while length < num_nibbles(label_offset - byte_offset - length as i32) {
        length += 1;
    }
    length
}

/// Append the encoding of an instruction to a byte buffer: PFIX/NFIX
/// prefixes for the high nibbles, then the opcode byte with the low nibble.
pub fn encode_into(buffer: &mut Vec<u8>, instr: Instr, operand: i32) {
    let size = encoded_size(operand);
    if size > 1 {
        let prefix = if operand < 0 { Instr::NFIX } else { Instr::PFIX };
        let nibble = (operand >> ((size - 1) * 4)) & 0xF;
        buffer.push(((prefix as u32) << constants::OPCODE_OFFSET) as u8 | nibble as u8);
    }
    for i in (1..size.saturating_sub(1)).rev() {
        let nibble = (operand >> (i * 4)) & 0xF;
        buffer.push(((Instr::PFIX as u32) << constants::OPCODE_OFFSET) as u8 | nibble as u8);
    }
    buffer.push(((instr as u32) << constants::OPCODE_OFFSET) as u8 | (operand & 0xF) as u8);
}

/// Return the encoding of a single instruction.
pub fn encode(instr: Instr, operand: i32) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(encoded_size(operand));
    encode_into(&mut buffer, instr, operand);
    buffer
}

/// Decode one instruction from its encoded bytes, stitching the operand
/// through any PFIX/NFIX prefixes the way the processor does. Returns the
/// opcode and operand of the final byte, or None if the bytes do not form
/// exactly one instruction.
pub fn decode(bytes: &[u8]) -> Option<(Instr, i32)> {
    let mut oreg: u32 = 0;
    let mut iter = bytes.iter().enumerate().peekable();
    while let Some((i, &byte)) = iter.next() {
        let instr = Instr::from_u32(((byte as u32) >> constants::OPCODE_OFFSET) & 0xF)?;
        oreg |= (byte as u32) & 0xF;
        match instr {
            Instr::PFIX => oreg <<= 4,
            Instr::NFIX => oreg = 0xFFFF_FF00 | (oreg << 4),
            _ => {
                if i + 1 == bytes.len() {
                    return Some((instr, oreg as i32));
                }
                return None;
            }
        }
    }
    None
}
