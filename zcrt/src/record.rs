//! Field- and struct-level codec (§4.3, §4.4, §4.5): the `FieldValue` and
//! `Record` traits the derive macro targets, plus the free functions that
//! keep the generated code thin.

use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{Error, ErrorKind, Result};
use crate::schema::Schema;
use crate::tag::{widening_allowed, TypeTag};
use crate::varint::{read_varint_len, read_varint_bounded, write_varint_len, write_varint_uint};

/// A leaf or composite value that can appear as a record field: knows its
/// own wire tag, how to encode/decode itself in both the tagged (v2) and
/// positional (v1) shapes, a zero value to fall back on, and how to parse
/// a schema's textual default.
pub trait FieldValue: Sized {
    const TAG: TypeTag;

    fn encode(&self, w: &mut WriteCursor) -> Result<()>;

    /// Decode a value whose wire tag is `tag`, which may differ from
    /// `Self::TAG` when the writer used a narrower type that widens into
    /// this one (§4.4). Implementations must reject anything
    /// `widening_allowed` doesn't sanction.
    fn decode_coerced(tag: TypeTag, r: &mut ReadCursor) -> Result<Self>;

    fn encode_fixed(&self, w: &mut WriteCursor) -> Result<()>;

    fn decode_fixed(r: &mut ReadCursor) -> Result<Self>;

    fn zero_value() -> Self;

    fn parse_default(text: &str) -> Result<Self>;
}

/// A struct whose fields the derive macro has enumerated. `read_fields`
/// takes an optional `Schema` so missing fields can be materialized from
/// a textual default rather than always falling back to zero.
pub trait Record: Sized {
    const FIELD_COUNT: usize;

    fn write_fields(&self, w: &mut WriteCursor) -> Result<()>;
    fn write_fields_fixed(&self, w: &mut WriteCursor) -> Result<()>;
    fn read_fields(r: &mut ReadCursor, schema: Option<&Schema>) -> Result<Self>;
    fn read_fields_fixed(r: &mut ReadCursor) -> Result<Self>;
    fn zero_fields() -> Self;
}

/// Write a field entry: varint name length, name bytes, tag byte, value.
pub fn encode_field<T: FieldValue>(w: &mut WriteCursor, name: &str, value: &T) -> Result<()> {
    write_varint_len(w, name.len() as u64)?;
    w.write_bytes(name.as_bytes())?;
    w.write_byte(T::TAG as u8)?;
    value.encode(w)
}

/// Read a struct body: a varint field count followed by that many field
/// entries. `handle` gets the field name, its wire tag, and the cursor
/// positioned at the start of the value; it must return whether it
/// consumed the value. Unconsumed (unknown) fields are skipped
/// structurally so later fields and the caller's own framing stay
/// aligned.
pub fn decode_struct_body(
    r: &mut ReadCursor,
    mut handle: impl FnMut(&str, TypeTag, &mut ReadCursor) -> Result<bool>,
) -> Result<()> {
    let field_count = read_varint_len(r)?;
    for _ in 0..field_count {
        let name_len = read_varint_len(r)? as usize;
        let name_bytes = r.read_bytes(name_len)?;
        let name = std::str::from_utf8(name_bytes)
            .map_err(|_| Error::new(ErrorKind::InvalidData, "field name is not valid utf-8"))?;
        let tag = TypeTag::from_u8(r.read_byte()?)?;
        let consumed = handle(name, tag, r)?;
        if !consumed {
            skip_value(r, tag)?;
        }
    }
    Ok(())
}

/// Produce a value for a field absent from the wire: the schema's
/// textual default if one is declared and active, a hard
/// `RequiredFieldMissing` if the schema says the field is required with
/// no default, or the type's zero value when no schema is in scope.
pub fn materialize_default<T: FieldValue>(name: &str, schema: Option<&Schema>) -> Result<T> {
    let Some(schema) = schema else {
        return Ok(T::zero_value());
    };
    let Some(field) = schema.field(name) else {
        return Ok(T::zero_value());
    };
    if let Some(default) = &field.default_value {
        return T::parse_default(default);
    }
    if field.required {
        return Err(Error::new(
            ErrorKind::RequiredFieldMissing,
            format!("required field {:?} absent from wire and schema has no default", name),
        )
        .with_field(name));
    }
    Ok(T::zero_value())
}

/// Consume the wire bytes of a value tagged `tag` without materializing
/// it into a Rust value. Used for unknown fields during schema
/// evolution and by the zero-copy record iterator to find record
/// boundaries.
pub fn skip_value(r: &mut ReadCursor, tag: TypeTag) -> Result<()> {
    match tag {
        TypeTag::Null => Ok(()),
        TypeTag::Bool => r.skip(1),
        TypeTag::U8 | TypeTag::U16 | TypeTag::U32 | TypeTag::U64 | TypeTag::I8 | TypeTag::I16
        | TypeTag::I32 | TypeTag::I64 => {
            read_varint_len(r)?;
            Ok(())
        }
        TypeTag::F32 => r.skip(4),
        TypeTag::F64 => r.skip(8),
        TypeTag::String => {
            let len = read_varint_len(r)? as usize;
            r.skip(len)
        }
        TypeTag::Array => {
            let count = read_varint_len(r)?;
            let elem_tag = TypeTag::from_u8(r.read_byte()?)?;
            for _ in 0..count {
                skip_value(r, elem_tag)?;
            }
            Ok(())
        }
        TypeTag::Struct => {
            let field_count = read_varint_len(r)?;
            for _ in 0..field_count {
                let name_len = read_varint_len(r)? as usize;
                r.skip(name_len)?;
                let nested_tag = TypeTag::from_u8(r.read_byte()?)?;
                skip_value(r, nested_tag)?;
            }
            Ok(())
        }
    }
}

fn type_mismatch(found: TypeTag, expected: TypeTag) -> Error {
    Error::new(
        ErrorKind::FieldTypeMismatch,
        format!("cannot widen {:?} into {:?}", found, expected),
    )
    .with_types(expected, found)
}

fn u32_len(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| Error::new(ErrorKind::InvalidData, format!("{} exceeds the v1 u32 length prefix", len)))
}

macro_rules! impl_unsigned {
    ($t:ty, $bits:expr, $tag:ident) => {
        impl FieldValue for $t {
            const TAG: TypeTag = TypeTag::$tag;

            fn encode(&self, w: &mut WriteCursor) -> Result<()> {
                write_varint_uint(w, *self as u128)
            }

            fn decode_coerced(tag: TypeTag, r: &mut ReadCursor) -> Result<Self> {
                if !widening_allowed(tag, TypeTag::$tag) {
                    return Err(type_mismatch(tag, TypeTag::$tag));
                }
                let bits = tag.unsigned_bits().unwrap_or($bits);
                let n = read_varint_bounded(r, bits, tag)?;
                Ok(n as $t)
            }

            fn encode_fixed(&self, w: &mut WriteCursor) -> Result<()> {
                w.write_bytes(&self.to_le_bytes())
            }

            fn decode_fixed(r: &mut ReadCursor) -> Result<Self> {
                let bytes = r.read_bytes(std::mem::size_of::<$t>())?;
                Ok(<$t>::from_le_bytes(bytes.try_into().unwrap()))
            }

            fn zero_value() -> Self {
                0
            }

            fn parse_default(text: &str) -> Result<Self> {
                text.parse::<$t>().map_err(|_| {
                    Error::new(ErrorKind::InvalidSchema, format!("{:?} is not a valid {:?}", text, TypeTag::$tag))
                })
            }
        }
    };
}

macro_rules! impl_signed {
    ($t:ty, $unsigned:ty, $bits:expr, $tag:ident) => {
        impl FieldValue for $t {
            const TAG: TypeTag = TypeTag::$tag;

            fn encode(&self, w: &mut WriteCursor) -> Result<()> {
                write_varint_uint(w, (*self as $unsigned) as u128)
            }

            fn decode_coerced(tag: TypeTag, r: &mut ReadCursor) -> Result<Self> {
                if !widening_allowed(tag, TypeTag::$tag) {
                    return Err(type_mismatch(tag, TypeTag::$tag));
                }
                let bits = tag.signed_bits().unwrap_or($bits);
                let n = read_varint_bounded(r, bits, tag)?;
                let sign_bit = 1u128 << (bits - 1);
                let signed = if n & sign_bit != 0 { n as i128 - (1i128 << bits) } else { n as i128 };
                Ok(signed as $t)
            }

            fn encode_fixed(&self, w: &mut WriteCursor) -> Result<()> {
                w.write_bytes(&self.to_le_bytes())
            }

            fn decode_fixed(r: &mut ReadCursor) -> Result<Self> {
                let bytes = r.read_bytes(std::mem::size_of::<$t>())?;
                Ok(<$t>::from_le_bytes(bytes.try_into().unwrap()))
            }

            fn zero_value() -> Self {
                0
            }

            fn parse_default(text: &str) -> Result<Self> {
                text.parse::<$t>().map_err(|_| {
                    Error::new(ErrorKind::InvalidSchema, format!("{:?} is not a valid {:?}", text, TypeTag::$tag))
                })
            }
        }
    };
}

impl_unsigned!(u8, 8, U8);
impl_unsigned!(u16, 16, U16);
impl_unsigned!(u32, 32, U32);
impl_unsigned!(u64, 64, U64);
impl_signed!(i8, u8, 8, I8);
impl_signed!(i16, u16, 16, I16);
impl_signed!(i32, u32, 32, I32);
impl_signed!(i64, u64, 64, I64);

impl FieldValue for bool {
    const TAG: TypeTag = TypeTag::Bool;

    fn encode(&self, w: &mut WriteCursor) -> Result<()> {
        w.write_byte(if *self { 1 } else { 0 })
    }

    fn decode_coerced(tag: TypeTag, r: &mut ReadCursor) -> Result<Self> {
        if tag != TypeTag::Bool {
            return Err(type_mismatch(tag, TypeTag::Bool));
        }
        Ok(r.read_byte()? != 0)
    }

    fn encode_fixed(&self, w: &mut WriteCursor) -> Result<()> {
        self.encode(w)
    }

    fn decode_fixed(r: &mut ReadCursor) -> Result<Self> {
        Self::decode_coerced(TypeTag::Bool, r)
    }

    fn zero_value() -> Self {
        false
    }

    fn parse_default(text: &str) -> Result<Self> {
        match text {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(Error::new(ErrorKind::InvalidSchema, format!("{:?} is not a valid bool", other))),
        }
    }
}

impl FieldValue for f32 {
    const TAG: TypeTag = TypeTag::F32;

    fn encode(&self, w: &mut WriteCursor) -> Result<()> {
        w.write_bytes(&self.to_le_bytes())
    }

    fn decode_coerced(tag: TypeTag, r: &mut ReadCursor) -> Result<Self> {
        if !widening_allowed(tag, TypeTag::F32) {
            return Err(type_mismatch(tag, TypeTag::F32));
        }
        let bytes = r.read_bytes(4)?;
        Ok(f32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn encode_fixed(&self, w: &mut WriteCursor) -> Result<()> {
        self.encode(w)
    }

    fn decode_fixed(r: &mut ReadCursor) -> Result<Self> {
        Self::decode_coerced(TypeTag::F32, r)
    }

    fn zero_value() -> Self {
        0.0
    }

    fn parse_default(text: &str) -> Result<Self> {
        text.parse::<f32>()
            .map_err(|_| Error::new(ErrorKind::InvalidSchema, format!("{:?} is not a valid f32", text)))
    }
}

impl FieldValue for f64 {
    const TAG: TypeTag = TypeTag::F64;

    fn encode(&self, w: &mut WriteCursor) -> Result<()> {
        w.write_bytes(&self.to_le_bytes())
    }

    fn decode_coerced(tag: TypeTag, r: &mut ReadCursor) -> Result<Self> {
        if !widening_allowed(tag, TypeTag::F64) {
            return Err(type_mismatch(tag, TypeTag::F64));
        }
        match tag {
            TypeTag::F64 => Ok(f64::from_le_bytes(r.read_bytes(8)?.try_into().unwrap())),
            TypeTag::F32 => Ok(f32::from_le_bytes(r.read_bytes(4)?.try_into().unwrap()) as f64),
            _ => unreachable!("widening_allowed only permits F64 and F32 into F64"),
        }
    }

    fn encode_fixed(&self, w: &mut WriteCursor) -> Result<()> {
        self.encode(w)
    }

    fn decode_fixed(r: &mut ReadCursor) -> Result<Self> {
        Self::decode_coerced(TypeTag::F64, r)
    }

    fn zero_value() -> Self {
        0.0
    }

    fn parse_default(text: &str) -> Result<Self> {
        text.parse::<f64>()
            .map_err(|_| Error::new(ErrorKind::InvalidSchema, format!("{:?} is not a valid f64", text)))
    }
}

impl FieldValue for String {
    const TAG: TypeTag = TypeTag::String;

    fn encode(&self, w: &mut WriteCursor) -> Result<()> {
        write_varint_len(w, self.len() as u64)?;
        w.write_bytes(self.as_bytes())
    }

    fn decode_coerced(tag: TypeTag, r: &mut ReadCursor) -> Result<Self> {
        if tag != TypeTag::String {
            return Err(type_mismatch(tag, TypeTag::String));
        }
        let len = read_varint_len(r)? as usize;
        let bytes = r.read_bytes(len)?;
        // lossy, not strict: a malformed byte run shouldn't fail the
        // whole record when every other field decoded fine.
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn encode_fixed(&self, w: &mut WriteCursor) -> Result<()> {
        w.write_bytes(&u32_len(self.len())?.to_le_bytes())?;
        w.write_bytes(self.as_bytes())
    }

    fn decode_fixed(r: &mut ReadCursor) -> Result<Self> {
        let len = u32::from_le_bytes(r.read_bytes(4)?.try_into().unwrap()) as usize;
        let bytes = r.read_bytes(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn zero_value() -> Self {
        String::new()
    }

    fn parse_default(text: &str) -> Result<Self> {
        Ok(text.to_string())
    }
}

/// A byte string. Shares `String`'s wire shape (varint length then raw
/// bytes) but skips the utf-8 check, for fields that carry arbitrary
/// binary payloads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Bytes(pub Vec<u8>);

impl FieldValue for Bytes {
    const TAG: TypeTag = TypeTag::String;

    fn encode(&self, w: &mut WriteCursor) -> Result<()> {
        write_varint_len(w, self.0.len() as u64)?;
        w.write_bytes(&self.0)
    }

    fn decode_coerced(tag: TypeTag, r: &mut ReadCursor) -> Result<Self> {
        if tag != TypeTag::String {
            return Err(type_mismatch(tag, TypeTag::String));
        }
        let len = read_varint_len(r)? as usize;
        Ok(Bytes(r.read_bytes(len)?.to_vec()))
    }

    fn encode_fixed(&self, w: &mut WriteCursor) -> Result<()> {
        w.write_bytes(&u32_len(self.0.len())?.to_le_bytes())?;
        w.write_bytes(&self.0)
    }

    fn decode_fixed(r: &mut ReadCursor) -> Result<Self> {
        let len = u32::from_le_bytes(r.read_bytes(4)?.try_into().unwrap()) as usize;
        Ok(Bytes(r.read_bytes(len)?.to_vec()))
    }

    fn zero_value() -> Self {
        Bytes(Vec::new())
    }

    fn parse_default(text: &str) -> Result<Self> {
        Ok(Bytes(text.as_bytes().to_vec()))
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    const TAG: TypeTag = TypeTag::Array;

    fn encode(&self, w: &mut WriteCursor) -> Result<()> {
        write_varint_len(w, self.len() as u64)?;
        w.write_byte(T::TAG as u8)?;
        for item in self {
            item.encode(w)?;
        }
        Ok(())
    }

    fn decode_coerced(tag: TypeTag, r: &mut ReadCursor) -> Result<Self> {
        if tag != TypeTag::Array {
            return Err(type_mismatch(tag, TypeTag::Array));
        }
        let count = read_varint_len(r)?;
        let elem_tag = TypeTag::from_u8(r.read_byte()?)?;
        let mut out = Vec::with_capacity(count.min(1 << 16) as usize);
        for _ in 0..count {
            out.push(T::decode_coerced(elem_tag, r)?);
        }
        Ok(out)
    }

    fn encode_fixed(&self, w: &mut WriteCursor) -> Result<()> {
        w.write_bytes(&u32_len(self.len())?.to_le_bytes())?;
        for item in self {
            item.encode_fixed(w)?;
        }
        Ok(())
    }

    fn decode_fixed(r: &mut ReadCursor) -> Result<Self> {
        let count = u32::from_le_bytes(r.read_bytes(4)?.try_into().unwrap());
        let mut out = Vec::with_capacity(count.min(1 << 16) as usize);
        for _ in 0..count {
            out.push(T::decode_fixed(r)?);
        }
        Ok(out)
    }

    fn zero_value() -> Self {
        Vec::new()
    }

    fn parse_default(_text: &str) -> Result<Self> {
        Err(Error::new(ErrorKind::UnsupportedType, "array fields do not support textual defaults"))
    }
}

/// Writes a struct value's count-prefixed field list. Shared by the
/// blanket `FieldValue` impl below and by the top-level `versioned`
/// writer, so the field count is written in exactly one place.
pub fn write_struct_body<T: Record>(value: &T, w: &mut WriteCursor) -> Result<()> {
    write_varint_len(w, T::FIELD_COUNT as u64)?;
    value.write_fields(w)
}

impl<T: Record> FieldValue for T {
    const TAG: TypeTag = TypeTag::Struct;

    fn encode(&self, w: &mut WriteCursor) -> Result<()> {
        write_struct_body(self, w)
    }

    fn decode_coerced(tag: TypeTag, r: &mut ReadCursor) -> Result<Self> {
        if tag != TypeTag::Struct {
            return Err(type_mismatch(tag, TypeTag::Struct));
        }
        T::read_fields(r, None)
    }

    fn encode_fixed(&self, w: &mut WriteCursor) -> Result<()> {
        self.write_fields_fixed(w)
    }

    fn decode_fixed(r: &mut ReadCursor) -> Result<Self> {
        T::read_fields_fixed(r)
    }

    fn zero_value() -> Self {
        T::zero_fields()
    }

    fn parse_default(_text: &str) -> Result<Self> {
        Err(Error::new(ErrorKind::UnsupportedType, "struct fields do not support textual defaults"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{ReadCursor, WriteCursor};

    #[test]
    fn u8_widens_into_u32() {
        let mut buf = [0u8; 8];
        let mut w = WriteCursor::new(&mut buf);
        7u8.encode(&mut w).unwrap();
        let written = w.pos();
        let mut r = ReadCursor::new(&buf[..written]);
        let widened: u32 = FieldValue::decode_coerced(TypeTag::U8, &mut r).unwrap();
        assert_eq!(widened, 7);
    }

    #[test]
    fn i8_widens_into_i32_preserving_sign() {
        let mut buf = [0u8; 8];
        let mut w = WriteCursor::new(&mut buf);
        (-1i8).encode(&mut w).unwrap();
        let written = w.pos();
        let mut r = ReadCursor::new(&buf[..written]);
        let widened: i32 = FieldValue::decode_coerced(TypeTag::I8, &mut r).unwrap();
        assert_eq!(widened, -1);
    }

    #[test]
    fn u32_does_not_narrow_into_u8() {
        let mut buf = [0u8; 8];
        let mut w = WriteCursor::new(&mut buf);
        300u32.encode(&mut w).unwrap();
        let written = w.pos();
        let mut r = ReadCursor::new(&buf[..written]);
        let err = <u8 as FieldValue>::decode_coerced(TypeTag::U32, &mut r).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldTypeMismatch);
    }

    #[test]
    fn string_round_trips_unicode() {
        let value = "héllo wörld 日本語".to_string();
        let mut buf = [0u8; 64];
        let mut w = WriteCursor::new(&mut buf);
        value.encode(&mut w).unwrap();
        let written = w.pos();
        let mut r = ReadCursor::new(&buf[..written]);
        let back: String = FieldValue::decode_coerced(TypeTag::String, &mut r).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn f32_widens_into_f64() {
        let mut buf = [0u8; 8];
        let mut w = WriteCursor::new(&mut buf);
        1.5f32.encode(&mut w).unwrap();
        let written = w.pos();
        let mut r = ReadCursor::new(&buf[..written]);
        let widened: f64 = FieldValue::decode_coerced(TypeTag::F32, &mut r).unwrap();
        assert_eq!(widened, 1.5);
    }

    #[test]
    fn array_of_u8_widens_elementwise_into_u32() {
        let values: Vec<u8> = vec![1, 2, 3];
        let mut buf = [0u8; 32];
        let mut w = WriteCursor::new(&mut buf);
        values.encode(&mut w).unwrap();
        let written = w.pos();
        let mut r = ReadCursor::new(&buf[..written]);
        let back: Vec<u32> = FieldValue::decode_coerced(TypeTag::Array, &mut r).unwrap();
        assert_eq!(back, vec![1u32, 2, 3]);
    }

    #[derive(Debug, PartialEq, zcrt_derive::Record)]
    struct PersonV1 {
        id: u32,
        name: String,
    }

    #[derive(Debug, PartialEq, zcrt_derive::Record)]
    struct PersonV2 {
        id: u32,
        name: String,
        age: u32,
    }

    #[test]
    fn struct_round_trips_tagged() {
        let person = PersonV1 { id: 1, name: "Ada".to_string() };
        let mut buf = [0u8; 128];
        let mut w = WriteCursor::new(&mut buf);
        write_struct_body(&person, &mut w).unwrap();
        let written = w.pos();
        let mut r = ReadCursor::new(&buf[..written]);
        let back = PersonV1::read_fields(&mut r, None).unwrap();
        assert_eq!(back, person);
    }

    #[test]
    fn missing_field_falls_back_to_schema_default_on_evolution() {
        let written_by_v1 = PersonV1 { id: 1, name: "Ada".to_string() };
        let mut buf = [0u8; 128];
        let mut w = WriteCursor::new(&mut buf);
        write_struct_body(&written_by_v1, &mut w).unwrap();
        let written = w.pos();

        let schema = Schema::new("Person", 2).with_field(
            crate::schema::FieldDefinition::new("age", TypeTag::U32).with_default("30"),
        );
        let mut r = ReadCursor::new(&buf[..written]);
        let read_as_v2 = PersonV2::read_fields(&mut r, Some(&schema)).unwrap();
        assert_eq!(read_as_v2.id, 1);
        assert_eq!(read_as_v2.name, "Ada");
        assert_eq!(read_as_v2.age, 30);
    }

    #[test]
    fn unknown_field_is_skipped_not_rejected() {
        let written_by_v2 = PersonV2 { id: 1, name: "Ada".to_string(), age: 30 };
        let mut buf = [0u8; 128];
        let mut w = WriteCursor::new(&mut buf);
        write_struct_body(&written_by_v2, &mut w).unwrap();
        let written = w.pos();

        let mut r = ReadCursor::new(&buf[..written]);
        let back = PersonV1::read_fields(&mut r, None).unwrap();
        assert_eq!(back.id, 1);
        assert_eq!(back.name, "Ada");
    }

    #[test]
    fn fixed_positional_round_trip() {
        let person = PersonV1 { id: 9, name: "Grace".to_string() };
        let mut buf = [0u8; 128];
        let mut w = WriteCursor::new(&mut buf);
        person.write_fields_fixed(&mut w).unwrap();
        let written = w.pos();
        let mut r = ReadCursor::new(&buf[..written]);
        let back = PersonV1::read_fields_fixed(&mut r).unwrap();
        assert_eq!(back, person);
    }
}
