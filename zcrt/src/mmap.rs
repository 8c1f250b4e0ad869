//! Memory-mapped file input (§6.2) and a multi-record iterator over a
//! buffer holding back-to-back versioned records.
//!
//! `RecordIter` never trusts the reserved `data_size` field to find the
//! next record — it walks the tagged field list structurally instead, the
//! same way `skip_value` does for unknown fields. `data_size` is written
//! as 0 by the encoder (see `versioned`), so trusting it would always
//! under-read.

use crate::cursor::ReadCursor;
use crate::error::{Error, ErrorKind, Result};
use crate::header::HeaderV2;
use crate::record::skip_value;
use crate::tag::TypeTag;
use crate::varint::read_varint_len;
use crate::view::RecordView;
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// A read-only memory-mapped file. Safety follows `memmap2`'s own
/// contract: mapping a file that's concurrently truncated or modified by
/// another process is undefined behavior, same as for any mmap.
pub struct MappedInput {
    mmap: Mmap,
}

impl MappedInput {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::new(ErrorKind::FileNotFound, format!("opening {}: {}", path.display(), e))
        })?;
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| Error::new(ErrorKind::MappingFailed, format!("mapping {}: {}", path.display(), e)))?;
        Ok(MappedInput { mmap })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// Iterate the versioned records packed back-to-back in this file.
    pub fn records(&self) -> RecordIter<'_> {
        RecordIter { buf: &self.mmap, pos: 0 }
    }
}

pub struct RecordIter<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RecordIter<'a> {
    /// Build an iterator directly over a borrowed buffer, without going
    /// through a file mapping — useful for records assembled in memory.
    pub fn over(buf: &'a [u8]) -> Self {
        RecordIter { buf, pos: 0 }
    }
}

impl<'a> Iterator for RecordIter<'a> {
    type Item = Result<RecordView<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let remaining = &self.buf[self.pos..];
        let mut r = ReadCursor::new(remaining);

        let header = match HeaderV2::read(&mut r) {
            Ok(h) => h,
            Err(e) => {
                self.pos = self.buf.len();
                return Some(Err(e));
            }
        };
        if header.type_tag != TypeTag::Struct {
            self.pos = self.buf.len();
            return Some(Err(Error::new(
                ErrorKind::TypeMismatch,
                format!("top-level record tag is {:?}, not Struct", header.type_tag),
            )));
        }

        let body_start = r.pos();
        if let Err(e) = walk_struct_body(&mut r) {
            self.pos = self.buf.len();
            return Some(Err(e));
        }
        let body_end = r.pos();

        let view = RecordView::from_parts(header.schema_version, header.fingerprint, &remaining[body_start..body_end]);
        self.pos += body_end;
        Some(Ok(view))
    }
}

/// Advance `r` past one struct body (count + field entries) without
/// materializing anything, mirroring `skip_value`'s `Struct` arm.
fn walk_struct_body(r: &mut ReadCursor) -> Result<()> {
    let field_count = read_varint_len(r)?;
    for _ in 0..field_count {
        let name_len = read_varint_len(r)? as usize;
        r.skip(name_len)?;
        let tag = TypeTag::from_u8(r.read_byte()?)?;
        skip_value(r, tag)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDefinition, Schema};
    use crate::versioned;
    use crate::view::Value;

    #[derive(Debug, PartialEq, zcrt_derive::Record)]
    struct PersonV1 {
        id: u32,
        name: String,
    }

    #[test]
    fn iterates_multiple_records_packed_back_to_back() {
        let schema = Schema::new("Person", 1)
            .with_field(FieldDefinition::new("id", TypeTag::U32))
            .with_field(FieldDefinition::new("name", TypeTag::String));

        let mut buf = [0u8; 256];
        let mut pos = 0;
        for (id, name) in [(1u32, "Ada"), (2, "Grace")] {
            let person = PersonV1 { id, name: name.to_string() };
            let n = versioned::write(&person, &schema, &mut buf[pos..]).unwrap();
            pos += n;
        }

        let names: Vec<String> = RecordIter::over(&buf[..pos])
            .map(|view| {
                let view = view.unwrap();
                match view.get_field("name").unwrap() {
                    Some(Value::Str(s)) => s.to_string(),
                    other => panic!("expected Str, got {:?}", other),
                }
            })
            .collect();
        assert_eq!(names, vec!["Ada".to_string(), "Grace".to_string()]);
    }
}
