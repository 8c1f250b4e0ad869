//! A binary record codec with a fixed "simple" (v1) positional mode and a
//! field-tagged "versioned" (v2) mode that tolerates schema evolution:
//! unknown fields are skipped, missing ones fall back to a schema default
//! or zero value, and narrower wire types widen into wider Rust fields
//! without truncation.
//!
//! `simple`/`versioned` operate on caller-provided buffers with no
//! allocation on the write path. `view` and `mmap` add a zero-copy read
//! path over an existing buffer or a memory-mapped file, for callers who
//! want to pick one field out of a record (or scan many records) without
//! materializing a Rust struct at all.
//!
//! `#[derive(Record)]` implements the traits below for a struct of named
//! fields; see `zcrt_derive` for the generated code.

extern crate self as zcrt;

pub mod cursor;
pub mod error;
pub mod header;
pub mod mmap;
pub mod record;
pub mod schema;
pub mod simple;
pub mod tag;
pub mod varint;
pub mod versioned;
pub mod view;

pub use cursor::{ReadCursor, WriteCursor};
pub use error::{Error, ErrorKind, Result};
pub use record::{decode_struct_body, encode_field, materialize_default, skip_value, Bytes, FieldValue, Record};
pub use schema::{FieldDefinition, Schema};
pub use tag::TypeTag;
pub use view::{RecordView, Value};
pub use zcrt_derive::Record;
