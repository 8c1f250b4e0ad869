//! Cursor-based readers/writers over caller-provided buffers.
//!
//! The write path never allocates the output: `WriteCursor` wraps a
//! borrowed `&mut [u8]` and advances a monotonic position. The read path
//! mirrors it over a borrowed `&[u8]`. Both fail loudly rather than panic
//! on out-of-range access — truncated input is an expected adversarial
//! case, not a programmer error.

use crate::error::{Error, ErrorKind, Result};

pub struct WriteCursor<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WriteCursor<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        WriteCursor { buf, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.pos.checked_add(bytes.len()).ok_or_else(|| {
            Error::new(ErrorKind::BufferTooSmall, "write position overflowed usize")
        })?;
        if end > self.buf.len() {
            return Err(Error::new(
                ErrorKind::BufferTooSmall,
                format!(
                    "need {} bytes at offset {} but buffer is {} bytes",
                    bytes.len(),
                    self.pos,
                    self.buf.len()
                ),
            )
            .with_position(self.pos));
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    pub fn write_byte(&mut self, b: u8) -> Result<()> {
        self.write_bytes(&[b])
    }

    /// Overwrite 4 bytes already written at `at` (used to backpatch the v1
    /// header's `data_size` once the body length is known).
    pub fn patch_u32_le(&mut self, at: usize, value: u32) -> Result<()> {
        if at + 4 > self.buf.len() {
            return Err(Error::new(ErrorKind::BufferTooSmall, "patch offset out of range"));
        }
        self.buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }
}

pub struct ReadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ReadCursor { buf, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or_else(|| {
            Error::new(ErrorKind::EndOfBuffer, "read position overflowed usize")
        })?;
        if end > self.buf.len() {
            return Err(Error::new(
                ErrorKind::EndOfBuffer,
                format!(
                    "need {} bytes at offset {} but only {} remain",
                    len,
                    self.pos,
                    self.buf.len() - self.pos
                ),
            )
            .with_position(self.pos));
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len)?;
        Ok(())
    }

    /// Peek at the full underlying buffer — used by the zero-copy view
    /// layer to hand out borrowed slices rooted at arbitrary offsets.
    pub fn full_buffer(&self) -> &'a [u8] {
        self.buf
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }
}
