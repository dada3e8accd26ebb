//! Decode failures for binary ledger data.

use std::fmt;

/// Error decoding XDR-encoded ledger data.
///
/// Every variant is fatal for the blob being decoded: the bytes are either
/// malformed or use a discriminant this library does not understand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Ran out of bytes while reading a value.
    UnexpectedEof { wanted: usize, remaining: usize },
    /// A union or enum discriminant outside the closed set of known values.
    UnknownDiscriminant { type_name: &'static str, value: i64 },
    /// A counted string did not hold valid UTF-8.
    InvalidUtf8,
    /// Padding bytes were not zero.
    NonZeroPadding,
    /// Input was longer than the decoded value.
    TrailingBytes { remaining: usize },
    /// A declared length exceeds the bytes actually present.
    LengthOverrun { declared: u32, remaining: usize },
    /// The base64 wrapper around the binary payload is invalid.
    InvalidBase64,
    /// A hex string field could not be parsed.
    InvalidHex,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnexpectedEof { wanted, remaining } => {
                write!(f, "unexpected end of input: wanted {wanted} bytes, {remaining} remaining")
            }
            DecodeError::UnknownDiscriminant { type_name, value } => {
                write!(f, "unknown discriminant {value} for {type_name}")
            }
            DecodeError::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            DecodeError::NonZeroPadding => write!(f, "non-zero padding bytes"),
            DecodeError::TrailingBytes { remaining } => {
                write!(f, "{remaining} trailing bytes after value")
            }
            DecodeError::LengthOverrun { declared, remaining } => {
                write!(f, "declared length {declared} exceeds {remaining} remaining bytes")
            }
            DecodeError::InvalidBase64 => write!(f, "invalid base64 payload"),
            DecodeError::InvalidHex => write!(f, "invalid hex string"),
        }
    }
}

impl std::error::Error for DecodeError {}
