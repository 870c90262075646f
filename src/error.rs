//! Error taxonomy untuk codec
//!
//! Semua error dikembalikan ke caller, tidak pernah di-log lalu dibuang.
//! Kebijakan recovery (retry, drop packet) adalah urusan layer di atas codec.

use thiserror::Error;

/// Errors returned by encode/parse primitives and generated codecs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Input ended before a VarNum or declared length was satisfied.
    ///
    /// Recoverable by supplying more bytes (e.g. on a stream transport).
    #[error("incomplete input: {needed} more bytes required")]
    Incomplete { needed: usize },

    /// Structure does not match the schema.
    #[error("invalid format: {0}")]
    InvalidFormat(#[from] FormatError),

    /// Unrecognized TLV whose type number is critical.
    #[error("unrecognized critical TLV type {0:#x}")]
    UnsupportedCriticalType(u64),

    /// Natural number stored in a length other than 1, 2, 4 or 8 bytes.
    #[error("natural number of {0} bytes is out of range (expected 1, 2, 4 or 8)")]
    NumericRange(usize),
}

/// Detail for [`Error::InvalidFormat`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Required field never appeared before the enclosing element ended
    #[error("required field `{name}` (type {type_num:#x}) is missing")]
    MissingField { name: &'static str, type_num: u64 },

    /// Sub-element runs past the end of its enclosing TLV
    #[error("element needs {needed} bytes beyond its enclosing TLV ({available} left)")]
    LengthOverflow { needed: usize, available: usize },

    /// Map key was followed by a TLV of the wrong type
    #[error("map value has type {found:#x}, expected {expected:#x}")]
    MapValueType { expected: u64, found: u64 },

    /// Element has a different TLV type than the one being decoded
    #[error("expected TLV type {expected:#x}, found {found:#x}")]
    UnexpectedType { expected: u64, found: u64 },

    #[error("text field is not valid UTF-8")]
    Utf8,

    /// Marker pair does not describe a span inside the wire
    #[error("marker span {start}..{end} does not fit a {len}-byte wire")]
    MarkerSpan { start: usize, end: usize, len: usize },

    #[error("malformed name: {0}")]
    NameSyntax(String),
}

/// Result alias untuk operasi codec
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True jika error bisa diatasi dengan menambah input.
    #[inline(always)]
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Error::Incomplete { .. })
    }
}

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        let kind = match err {
            Error::Incomplete { .. } => std::io::ErrorKind::UnexpectedEof,
            _ => std::io::ErrorKind::InvalidData,
        };
        std::io::Error::new(kind, err)
    }
}
