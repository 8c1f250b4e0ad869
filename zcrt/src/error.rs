//! Unified error taxonomy.
//!
//! A flat, closed set of kinds rather than an open `Box<dyn Error>` chain —
//! every failure in this crate is one of the kinds below, each optionally
//! carrying the field name, byte position, and expected/actual type that
//! were in scope when it was raised.

use crate::tag::TypeTag;
use std::fmt::{self, Display, Formatter};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    // Schema
    InvalidSchema,
    SchemaVersionMismatch,
    SchemaEvolutionError,
    IncompatibleSchema,
    // Data integrity
    InvalidData,
    InvalidMagicNumber,
    CorruptedData,
    ChecksumMismatch,
    // Type
    UnsupportedType,
    TypeMismatch,
    InvalidTypeTag,
    // Buffer/memory
    BufferTooSmall,
    OutOfMemory,
    EndOfBuffer,
    // Field
    RequiredFieldMissing,
    UnknownField,
    FieldTypeMismatch,
    // File I/O
    FileNotFound,
    FileReadError,
    FileWriteError,
    MappingFailed,
    // Version
    UnsupportedFormatVersion,
    BackwardCompatibilityError,
    ForwardCompatibilityError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::InvalidSchema => "invalid schema",
            ErrorKind::SchemaVersionMismatch => "schema version mismatch",
            ErrorKind::SchemaEvolutionError => "schema evolution error",
            ErrorKind::IncompatibleSchema => "incompatible schema",
            ErrorKind::InvalidData => "invalid data",
            ErrorKind::InvalidMagicNumber => "invalid magic number",
            ErrorKind::CorruptedData => "corrupted data",
            ErrorKind::ChecksumMismatch => "checksum mismatch",
            ErrorKind::UnsupportedType => "unsupported type",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::InvalidTypeTag => "invalid type tag",
            ErrorKind::BufferTooSmall => "buffer too small",
            ErrorKind::OutOfMemory => "out of memory",
            ErrorKind::EndOfBuffer => "end of buffer",
            ErrorKind::RequiredFieldMissing => "required field missing",
            ErrorKind::UnknownField => "unknown field",
            ErrorKind::FieldTypeMismatch => "field type mismatch",
            ErrorKind::FileNotFound => "file not found",
            ErrorKind::FileReadError => "file read error",
            ErrorKind::FileWriteError => "file write error",
            ErrorKind::MappingFailed => "mapping failed",
            ErrorKind::UnsupportedFormatVersion => "unsupported format version",
            ErrorKind::BackwardCompatibilityError => "backward compatibility error",
            ErrorKind::ForwardCompatibilityError => "forward compatibility error",
        })
    }
}

/// An error context record: kind, message, and whatever of field name, byte
/// position, and expected/actual type were known at the point of failure.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    field: Option<String>,
    position: Option<usize>,
    expected_type: Option<TypeTag>,
    actual_type: Option<TypeTag>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            field: None,
            position: None,
            expected_type: None,
            actual_type: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_types(mut self, expected: TypeTag, actual: TypeTag) -> Self {
        self.expected_type = Some(expected);
        self.actual_type = Some(actual);
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(ref field) = self.field {
            write!(f, " (field = {:?})", field)?;
        }
        if let Some(position) = self.position {
            write!(f, " (position = {})", position)?;
        }
        if let (Some(expected), Some(actual)) = (self.expected_type, self.actual_type) {
            write!(f, " (expected {:?}, found {:?})", expected, actual)?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

macro_rules! error {
    ($kind:ident, $($t:tt)*) => {
        $crate::error::Error::new($crate::error::ErrorKind::$kind, format!($($t)*))
    };
}

macro_rules! bail {
    ($($t:tt)*) => {
        return Err(error!($($t)*))
    };
}

macro_rules! ensure {
    ($cond:expr, $($t:tt)*) => {
        if !$cond {
            bail!($($t)*);
        }
    };
}

pub(crate) use bail;
pub(crate) use ensure;
pub(crate) use error;
