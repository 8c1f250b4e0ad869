//! Record framing (§2, §4.2): the magic bytes plus a version-specific
//! fixed or variable header that precedes every encoded record body.

use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{bail, ensure, ErrorKind, Result};
use crate::tag::TypeTag;
use crate::varint::{read_varint_len, write_varint_len};

pub const MAGIC_BYTES: [u8; 4] = *b"ZCRT";

/// The fixed, 11-byte v1 ("simple") header: magic, a `u16` format version
/// fixed at 1, a type tag, and a `u32` body length.
#[derive(Debug, Clone, Copy)]
pub struct HeaderV1 {
    pub type_tag: TypeTag,
    pub data_size: u32,
}

pub const HEADER_V1_LEN: usize = 4 + 2 + 1 + 4;
/// Offset of `data_size` within a v1 header — where the writer backpatches
/// the body length once it's known.
pub const HEADER_V1_DATA_SIZE_OFFSET: usize = 4 + 2 + 1;

impl HeaderV1 {
    pub fn write(&self, w: &mut WriteCursor) -> Result<()> {
        w.write_bytes(&MAGIC_BYTES)?;
        w.write_bytes(&1u16.to_le_bytes())?;
        w.write_byte(self.type_tag as u8)?;
        w.write_bytes(&self.data_size.to_le_bytes())?;
        Ok(())
    }

    pub fn read(r: &mut ReadCursor) -> Result<Self> {
        let magic = r.read_bytes(4)?;
        ensure!(magic == MAGIC_BYTES, InvalidMagicNumber, "expected ZCRT magic, found {:?}", magic);
        let format_version = u16::from_le_bytes(r.read_bytes(2)?.try_into().unwrap());
        ensure!(
            format_version == 1,
            UnsupportedFormatVersion,
            "v1 header declared format version {}",
            format_version
        );
        let type_tag = TypeTag::from_u8(r.read_byte()?)?;
        let data_size = u32::from_le_bytes(r.read_bytes(4)?.try_into().unwrap());
        Ok(HeaderV1 { type_tag, data_size })
    }
}

/// The variable-length v2 ("versioned") header: magic, a varint format
/// version (`>= 2`), a type tag, a varint schema version, a reserved
/// varint `data_size` (always written as 0 — see the module doc on
/// `versioned`), and a varint schema fingerprint.
#[derive(Debug, Clone, Copy)]
pub struct HeaderV2 {
    pub format_version: u32,
    pub type_tag: TypeTag,
    pub schema_version: u32,
    pub fingerprint: u32,
}

impl HeaderV2 {
    pub fn write(&self, w: &mut WriteCursor) -> Result<()> {
        w.write_bytes(&MAGIC_BYTES)?;
        write_varint_len(w, self.format_version as u64)?;
        w.write_byte(self.type_tag as u8)?;
        write_varint_len(w, self.schema_version as u64)?;
        write_varint_len(w, 0)?; // data_size: reserved, always 0 on the wire
        write_varint_len(w, self.fingerprint as u64)?;
        Ok(())
    }

    pub fn read(r: &mut ReadCursor) -> Result<Self> {
        let magic = r.read_bytes(4)?;
        ensure!(magic == MAGIC_BYTES, InvalidMagicNumber, "expected ZCRT magic, found {:?}", magic);
        let format_version = read_varint_len(r)?;
        ensure!(
            format_version >= 2,
            UnsupportedFormatVersion,
            "v2 header declared format version {}",
            format_version
        );
        if format_version > 2 {
            bail!(
                UnsupportedFormatVersion,
                "format version {} is newer than this reader supports",
                format_version
            );
        }
        let type_tag = TypeTag::from_u8(r.read_byte()?)?;
        let schema_version = read_varint_len(r)?;
        let _data_size = read_varint_len(r)?; // reserved, not trusted
        let fingerprint = read_varint_len(r)?;
        Ok(HeaderV2 {
            format_version: format_version as u32,
            type_tag,
            schema_version: schema_version as u32,
            fingerprint: fingerprint as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v1_header_round_trips() {
        let mut buf = [0u8; HEADER_V1_LEN];
        let header = HeaderV1 { type_tag: TypeTag::Struct, data_size: 42 };
        let mut w = WriteCursor::new(&mut buf);
        header.write(&mut w).unwrap();
        assert_eq!(w.pos(), HEADER_V1_LEN);

        let mut r = ReadCursor::new(&buf);
        let read_back = HeaderV1::read(&mut r).unwrap();
        assert_eq!(read_back.type_tag, TypeTag::Struct);
        assert_eq!(read_back.data_size, 42);
    }

    #[test]
    fn v1_header_rejects_wrong_magic() {
        let buf = *b"XXXX\x01\x00\x0E\x00\x00\x00\x00";
        let mut r = ReadCursor::new(&buf);
        let err = HeaderV1::read(&mut r).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMagicNumber);
    }

    #[test]
    fn v2_header_reserves_data_size_as_zero() {
        let mut buf = [0u8; 32];
        let header =
            HeaderV2 { format_version: 2, type_tag: TypeTag::Struct, schema_version: 3, fingerprint: 0xABCD };
        let mut w = WriteCursor::new(&mut buf);
        header.write(&mut w).unwrap();
        let written = w.pos();

        let mut r = ReadCursor::new(&buf[..written]);
        let read_back = HeaderV2::read(&mut r).unwrap();
        assert_eq!(read_back.schema_version, 3);
        assert_eq!(read_back.fingerprint, 0xABCD);
    }

    #[test]
    fn v2_header_rejects_future_format_version() {
        let mut buf = [0u8; 32];
        let mut w = WriteCursor::new(&mut buf);
        w.write_bytes(&MAGIC_BYTES).unwrap();
        write_varint_len(&mut w, 99).unwrap();
        w.write_byte(TypeTag::Struct as u8).unwrap();
        write_varint_len(&mut w, 1).unwrap();
        write_varint_len(&mut w, 0).unwrap();
        write_varint_len(&mut w, 0).unwrap();
        let written = w.pos();

        let mut r = ReadCursor::new(&buf[..written]);
        let err = HeaderV2::read(&mut r).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFormatVersion);
    }
}
