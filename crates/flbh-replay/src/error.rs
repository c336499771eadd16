//! Error types for the container codec.

use std::fmt;

/// Errors raised while decoding a container.
///
/// Header-level errors are fatal for a merge. When the same errors come from
/// an individual event record the extractor downgrades them to an
/// [`ExtractionWarning`](crate::ExtractionWarning).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormatError {
    /// The buffer does not start with the `FLBH` magic number.
    InvalidMagic {
        /// The first four bytes found, read as a big-endian `u32`
        /// (`None` if fewer than four bytes were available).
        found: Option<u32>,
    },
    /// A variable-length integer used more than five continuation bytes.
    VarIntTooLong {
        /// Byte offset where the varint started.
        offset: usize,
    },
    /// A field or declared length runs past the end of the buffer.
    Truncated {
        /// What was being read.
        what: &'static str,
        /// Byte offset where the read started.
        offset: usize,
        /// Bytes required.
        needed: usize,
        /// Bytes actually left.
        remaining: usize,
    },
    /// A signed length prefix was out of range (negative, or zero where a
    /// non-empty body is required).
    InvalidLength {
        /// What the length describes.
        what: &'static str,
        /// The decoded value.
        length: i32,
    },
    /// An action name was not valid UTF-8.
    InvalidUtf8 {
        /// Index of the action within the registry.
        index: usize,
    },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidMagic { found: Some(found) } => write!(
                f,
                "invalid magic {found:#010x} (expected {:#010x})",
                crate::MAGIC
            ),
            Self::InvalidMagic { found: None } => {
                write!(f, "buffer too short to hold the container magic")
            }
            Self::VarIntTooLong { offset } => write!(f, "varint too long at offset {offset}"),
            Self::Truncated {
                what,
                offset,
                needed,
                remaining,
            } => write!(
                f,
                "truncated {what} at offset {offset}: need {needed} bytes, {remaining} remaining"
            ),
            Self::InvalidLength { what, length } => {
                write!(f, "invalid {what} length {length}")
            }
            Self::InvalidUtf8 { index } => write!(f, "action name {index} is not valid UTF-8"),
        }
    }
}

impl std::error::Error for FormatError {}
