//! The on-wire type discriminant and the widening lattice used by both the
//! field-coercion reader (§4.4) and the schema compatibility checker (§4.6).

use crate::error::{ensure, Error, ErrorKind, Result};
use serde::{Deserialize, Serialize};

/// Single-byte discriminant identifying the kind of value that follows in
/// the wire. Stable numeric codes `0x00..=0x0E`; anything past that is
/// `InvalidTypeTag`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeTag {
    Null = 0x00,
    Bool = 0x01,
    U8 = 0x02,
    U16 = 0x03,
    U32 = 0x04,
    U64 = 0x05,
    I8 = 0x06,
    I16 = 0x07,
    I32 = 0x08,
    I64 = 0x09,
    F32 = 0x0A,
    F64 = 0x0B,
    String = 0x0C,
    Array = 0x0D,
    Struct = 0x0E,
}

impl TypeTag {
    pub fn from_u8(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x00 => TypeTag::Null,
            0x01 => TypeTag::Bool,
            0x02 => TypeTag::U8,
            0x03 => TypeTag::U16,
            0x04 => TypeTag::U32,
            0x05 => TypeTag::U64,
            0x06 => TypeTag::I8,
            0x07 => TypeTag::I16,
            0x08 => TypeTag::I32,
            0x09 => TypeTag::I64,
            0x0A => TypeTag::F32,
            0x0B => TypeTag::F64,
            0x0C => TypeTag::String,
            0x0D => TypeTag::Array,
            0x0E => TypeTag::Struct,
            other => {
                return Err(Error::new(
                    ErrorKind::InvalidTypeTag,
                    format!("reserved type tag byte 0x{:02X}", other),
                ))
            }
        })
    }

    /// Bit width of the varint-coded unsigned integer kind this tag names,
    /// or `None` if it isn't an unsigned integer kind.
    pub fn unsigned_bits(self) -> Option<u32> {
        match self {
            TypeTag::U8 => Some(8),
            TypeTag::U16 => Some(16),
            TypeTag::U32 => Some(32),
            TypeTag::U64 => Some(64),
            _ => None,
        }
    }

    /// Bit width of the varint-coded signed integer kind this tag names, or
    /// `None` if it isn't a signed integer kind.
    pub fn signed_bits(self) -> Option<u32> {
        match self {
            TypeTag::I8 => Some(8),
            TypeTag::I16 => Some(16),
            TypeTag::I32 => Some(32),
            TypeTag::I64 => Some(64),
            _ => None,
        }
    }
}

/// The type compatibility matrix (§4.6): is it sound to widen a value
/// declared `from` into a field declared `to`, without truncation?
///
/// Unsigned widens to unsigned of equal or greater width, signed widens to
/// signed of equal or greater width, `F32` widens to `F64`. No
/// cross-signedness, no int<->float, no int<->string. Everything else
/// (`Bool`, `String`, `Array`, `Struct`, `Null`) requires an exact match.
pub fn widening_allowed(from: TypeTag, to: TypeTag) -> bool {
    if from == to {
        return true;
    }
    if let (Some(a), Some(b)) = (from.unsigned_bits(), to.unsigned_bits()) {
        return a <= b;
    }
    if let (Some(a), Some(b)) = (from.signed_bits(), to.signed_bits()) {
        return a <= b;
    }
    matches!((from, to), (TypeTag::F32, TypeTag::F64))
}

pub(crate) fn require_tag_fits(expected_max_bits: u32, n: u128, expected: TypeTag) -> Result<()> {
    if expected_max_bits >= 128 {
        return Ok(());
    }
    let limit = (1u128 << expected_max_bits) - 1;
    ensure!(
        n <= limit,
        InvalidData,
        "varint value {} does not fit declared width for {:?}",
        n,
        expected
    );
    Ok(())
}
