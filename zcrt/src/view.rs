//! Zero-copy view layer (§6): read a versioned record's header and field
//! list without materializing a Rust struct. `Value` borrows directly
//! from the input buffer — strings and byte fields are never copied.

use crate::cursor::ReadCursor;
use crate::error::{Error, ErrorKind, Result};
use crate::header::{HeaderV1, HeaderV2};
use crate::record::{skip_value, Record};
use crate::tag::TypeTag;
use crate::varint::{read_varint_bounded, read_varint_len};

/// A single decoded value, borrowed from the underlying buffer where
/// possible.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Null,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(&'a str),
    Bytes(&'a [u8]),
    Array(Vec<Value<'a>>),
    Struct(RecordView<'a>),
}

/// A lazily-parsed view over a record's header and field-tagged body.
/// Only the header is parsed eagerly; `get_field` scans the body on
/// demand and `get` materializes a full `Record` when you want one.
#[derive(Debug, Clone, Copy)]
pub struct RecordView<'a> {
    format_version: u32,
    schema_version: u32,
    fingerprint: u32,
    body: &'a [u8],
}

impl<'a> RecordView<'a> {
    /// Parse just the header of a framed (magic + header + body) buffer.
    /// Accepts both the fixed v1 header and the varint-framed v2 header
    /// (§6's format-version matrix: zero-copy views accept either).
    pub fn parse(buf: &'a [u8]) -> Result<Self> {
        let format_byte = *buf
            .get(4)
            .ok_or_else(|| Error::new(ErrorKind::EndOfBuffer, "buffer too short to contain a header"))?;
        // v1's format version is a fixed u16 written as `01 00`; v2's is a
        // varint whose minimal encoding of any legal value (>= 2) never
        // starts with the byte 0x01, so this single byte disambiguates.
        if format_byte == 1 {
            let mut r = ReadCursor::new(buf);
            let header = HeaderV1::read(&mut r)?;
            if header.type_tag != TypeTag::Struct {
                return Err(Error::new(
                    ErrorKind::TypeMismatch,
                    format!("top-level record tag is {:?}, not Struct", header.type_tag),
                ));
            }
            let body = &r.full_buffer()[r.pos()..];
            return Ok(RecordView { format_version: 1, schema_version: 0, fingerprint: 0, body });
        }

        let mut r = ReadCursor::new(buf);
        let header = HeaderV2::read(&mut r)?;
        if header.type_tag != TypeTag::Struct {
            return Err(Error::new(
                ErrorKind::TypeMismatch,
                format!("top-level record tag is {:?}, not Struct", header.type_tag),
            ));
        }
        let body = &r.full_buffer()[r.pos()..];
        Ok(RecordView {
            format_version: 2,
            schema_version: header.schema_version,
            fingerprint: header.fingerprint,
            body,
        })
    }

    /// Wrap an already-isolated struct body (count + field entries), used
    /// for nested struct values that have no header of their own. Nested
    /// struct fields only occur inside a tagged (v2) body.
    fn from_body(body: &'a [u8]) -> Self {
        RecordView { format_version: 2, schema_version: 0, fingerprint: 0, body }
    }

    /// Assemble a view from an already-parsed header and an isolated body
    /// slice. Used by `mmap::RecordIter`, which parses the header once
    /// while locating each record's boundary and shouldn't need to parse
    /// it again here.
    pub(crate) fn from_parts(schema_version: u32, fingerprint: u32, body: &'a [u8]) -> Self {
        RecordView { format_version: 2, schema_version, fingerprint, body }
    }

    pub fn format_version(&self) -> u32 {
        self.format_version
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    /// Scan the field list for `name`, decoding it into a borrowed
    /// `Value` if present. Every other field is skipped structurally
    /// without allocation.
    ///
    /// Only meaningful for a v2 (tagged) body: a v1 body has no field
    /// names or tags on the wire, just the reader's static field order,
    /// so there is nothing to scan by name.
    pub fn get_field(&self, name: &str) -> Result<Option<Value<'a>>> {
        if self.format_version < 2 {
            return Err(Error::new(
                ErrorKind::UnsupportedType,
                "get_field requires a tagged (format_version >= 2) record body",
            ));
        }
        let mut r = ReadCursor::new(self.body);
        let field_count = read_varint_len(&mut r)?;
        for _ in 0..field_count {
            let name_len = read_varint_len(&mut r)? as usize;
            let name_bytes = r.read_bytes(name_len)?;
            let field_name = std::str::from_utf8(name_bytes)
                .map_err(|_| Error::new(ErrorKind::InvalidData, "field name is not valid utf-8"))?;
            let tag = TypeTag::from_u8(r.read_byte()?)?;
            if field_name == name {
                return Ok(Some(decode_value(tag, &mut r)?));
            }
            skip_value(&mut r, tag)?;
        }
        Ok(None)
    }

    /// Fully materialize a `Record` from this view's body, dispatching to
    /// the positional v1 decode or the tagged v2 decode depending on
    /// which framing this view was parsed from.
    pub fn get<T: Record>(&self) -> Result<T> {
        let mut r = ReadCursor::new(self.body);
        if self.format_version < 2 {
            T::read_fields_fixed(&mut r)
        } else {
            T::read_fields(&mut r, None)
        }
    }

    /// The raw bytes of this record's body, for callers that want to
    /// hand it off to `get` themselves (e.g. after re-seeking).
    pub fn body(&self) -> &'a [u8] {
        self.body
    }
}

fn decode_value<'a>(tag: TypeTag, r: &mut ReadCursor<'a>) -> Result<Value<'a>> {
    Ok(match tag {
        TypeTag::Null => Value::Null,
        TypeTag::Bool => Value::Bool(r.read_byte()? != 0),
        TypeTag::U8 => Value::U8(read_varint_bounded(r, 8, tag)? as u8),
        TypeTag::U16 => Value::U16(read_varint_bounded(r, 16, tag)? as u16),
        TypeTag::U32 => Value::U32(read_varint_bounded(r, 32, tag)? as u32),
        TypeTag::U64 => Value::U64(read_varint_bounded(r, 64, tag)? as u64),
        TypeTag::I8 => Value::I8(decode_signed(8, tag, r)? as i8),
        TypeTag::I16 => Value::I16(decode_signed(16, tag, r)? as i16),
        TypeTag::I32 => Value::I32(decode_signed(32, tag, r)? as i32),
        TypeTag::I64 => Value::I64(decode_signed(64, tag, r)? as i64),
        TypeTag::F32 => Value::F32(f32::from_le_bytes(r.read_bytes(4)?.try_into().unwrap())),
        TypeTag::F64 => Value::F64(f64::from_le_bytes(r.read_bytes(8)?.try_into().unwrap())),
        TypeTag::String => {
            let len = read_varint_len(r)? as usize;
            let bytes = r.read_bytes(len)?;
            match std::str::from_utf8(bytes) {
                Ok(s) => Value::Str(s),
                Err(_) => Value::Bytes(bytes),
            }
        }
        TypeTag::Array => {
            let count = read_varint_len(r)?;
            let elem_tag = TypeTag::from_u8(r.read_byte()?)?;
            let mut items = Vec::with_capacity(count.min(1 << 16) as usize);
            for _ in 0..count {
                items.push(decode_value(elem_tag, r)?);
            }
            Value::Array(items)
        }
        TypeTag::Struct => {
            let start = r.pos();
            let field_count = read_varint_len(r)?;
            for _ in 0..field_count {
                let name_len = read_varint_len(r)? as usize;
                r.skip(name_len)?;
                let nested_tag = TypeTag::from_u8(r.read_byte()?)?;
                skip_value(r, nested_tag)?;
            }
            let end = r.pos();
            Value::Struct(RecordView::from_body(&r.full_buffer()[start..end]))
        }
    })
}

fn decode_signed(bits: u32, tag: TypeTag, r: &mut ReadCursor) -> Result<i128> {
    let n = read_varint_bounded(r, bits, tag)?;
    let sign_bit = 1u128 << (bits - 1);
    Ok(if n & sign_bit != 0 { n as i128 - (1i128 << bits) } else { n as i128 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDefinition, Schema};
    use crate::{simple, versioned};

    #[derive(Debug, PartialEq, zcrt_derive::Record)]
    struct PersonV1 {
        id: u32,
        name: String,
    }

    #[test]
    fn get_field_reads_without_materializing_the_struct() {
        let schema = Schema::new("Person", 1)
            .with_field(FieldDefinition::new("id", TypeTag::U32))
            .with_field(FieldDefinition::new("name", TypeTag::String));
        let person = PersonV1 { id: 7, name: "Ada".to_string() };
        let mut buf = [0u8; 128];
        let n = versioned::write(&person, &schema, &mut buf).unwrap();

        let view = RecordView::parse(&buf[..n]).unwrap();
        match view.get_field("name").unwrap() {
            Some(Value::Str(s)) => assert_eq!(s, "Ada"),
            other => panic!("expected Str, got {:?}", other),
        }
        assert!(view.get_field("missing").unwrap().is_none());
    }

    #[test]
    fn get_materializes_the_full_struct() {
        let schema = Schema::new("Person", 1)
            .with_field(FieldDefinition::new("id", TypeTag::U32))
            .with_field(FieldDefinition::new("name", TypeTag::String));
        let person = PersonV1 { id: 7, name: "Ada".to_string() };
        let mut buf = [0u8; 128];
        let n = versioned::write(&person, &schema, &mut buf).unwrap();

        let view = RecordView::parse(&buf[..n]).unwrap();
        let back: PersonV1 = view.get().unwrap();
        assert_eq!(back, person);
    }

    #[test]
    fn parse_accepts_a_v1_framed_record() {
        let person = PersonV1 { id: 7, name: "Ada".to_string() };
        let mut buf = [0u8; 64];
        let n = simple::write(&person, &mut buf).unwrap();

        let view = RecordView::parse(&buf[..n]).unwrap();
        assert_eq!(view.format_version(), 1);
        let back: PersonV1 = view.get().unwrap();
        assert_eq!(back, person);
    }
}
