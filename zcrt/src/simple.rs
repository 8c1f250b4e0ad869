//! The "simple" (v1) codec (§5.1): fixed 11-byte header, fields written
//! positionally in declaration order with no names or per-field tags. No
//! schema evolution — the reader must already agree with the writer on
//! field order and type.

use crate::cursor::{ReadCursor, WriteCursor};
use crate::error::{ensure, Result};
use crate::header::{HeaderV1, HEADER_V1_DATA_SIZE_OFFSET, HEADER_V1_LEN};
use crate::record::Record;
use crate::tag::TypeTag;

/// Encode `value` into `buf`, returning the number of bytes written.
/// Two-pass: the header is written with a placeholder `data_size`, the
/// body follows, then the real size is backpatched in place.
pub fn write<T: Record>(value: &T, buf: &mut [u8]) -> Result<usize> {
    let mut w = WriteCursor::new(buf);
    HeaderV1 { type_tag: TypeTag::Struct, data_size: 0 }.write(&mut w)?;
    let body_start = w.pos();
    value.write_fields_fixed(&mut w)?;
    let body_len = (w.pos() - body_start) as u32;
    w.patch_u32_le(HEADER_V1_DATA_SIZE_OFFSET, body_len)?;
    Ok(w.pos())
}

pub fn read<T: Record>(buf: &[u8]) -> Result<T> {
    let mut r = ReadCursor::new(buf);
    let header = HeaderV1::read(&mut r)?;
    ensure!(
        header.type_tag == TypeTag::Struct,
        TypeMismatch,
        "simple record's top-level tag is {:?}, not Struct",
        header.type_tag
    );
    let body_start = r.pos();
    let value = T::read_fields_fixed(&mut r)?;
    let consumed = r.pos() - body_start;
    ensure!(
        consumed == header.data_size as usize,
        CorruptedData,
        "header declared {} body bytes, read {} decoding fields",
        header.data_size,
        consumed
    );
    Ok(value)
}

/// Size of the header alone, for callers sizing their own buffers.
pub const fn header_len() -> usize {
    HEADER_V1_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, zcrt_derive::Record)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn round_trips_a_struct() {
        let point = Point { x: -7, y: 42 };
        let mut buf = [0u8; 64];
        let written = write(&point, &mut buf).unwrap();
        let back: Point = read(&buf[..written]).unwrap();
        assert_eq!(back, point);
    }

    #[test]
    fn header_carries_exact_body_length() {
        let point = Point { x: 1, y: 2 };
        let mut buf = [0u8; 64];
        let written = write(&point, &mut buf).unwrap();
        let header = HeaderV1::read(&mut ReadCursor::new(&buf[..written])).unwrap();
        assert_eq!(header.data_size as usize, written - HEADER_V1_LEN);
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let point = Point { x: 1, y: 2 };
        let mut buf = [0u8; 64];
        let written = write(&point, &mut buf).unwrap();
        let err = read::<Point>(&buf[..written - 1]).unwrap_err();
        assert!(matches!(
            err.kind(),
            crate::error::ErrorKind::EndOfBuffer | crate::error::ErrorKind::CorruptedData
        ));
    }
}
