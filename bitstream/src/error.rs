//! Error types for bitstream operations.

use std::fmt;

/// Result type for bitstream operations.
pub type BitResult<T> = Result<T, BitError>;

/// Failures of the bit writers and the reader.
///
/// Ranged codecs never fail on out-of-range values; they clamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BitError {
    /// A read needed more bits than remain.
    EndOfBuffer { requested: usize, available: usize },

    /// Attempted to write more bits than a fixed buffer can hold.
    ///
    /// Only returned by [`BitWriter`](crate::BitWriter); the growable
    /// [`BitVecWriter`](crate::BitVecWriter) reallocates instead.
    BufferOverflow {
        /// Bit position the write would have reached.
        attempted: usize,
        /// Capacity of the buffer in bits.
        capacity: usize,
    },

    /// Raw bit access wider than [`MAX_BITS`](crate::MAX_BITS).
    InvalidBitCount { bits: u32, max_bits: u32 },

    /// String payload does not fit the single-byte length prefix.
    StringTooLong { len: usize, max: usize },

    /// Decoded string bytes are not valid UTF-8.
    InvalidUtf8,
}

impl fmt::Display for BitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndOfBuffer {
                requested,
                available,
            } => write!(f, "read of {requested} bits with only {available} left"),
            Self::BufferOverflow {
                attempted,
                capacity,
            } => write!(f, "write reaching bit {attempted} overflows {capacity}-bit buffer"),
            Self::InvalidBitCount { bits, max_bits } => {
                write!(f, "bit count {bits} exceeds {max_bits}")
            }
            Self::StringTooLong { len, max } => {
                write!(f, "string is {len} bytes, limit is {max}")
            }
            Self::InvalidUtf8 => write!(f, "invalid UTF-8 in string"),
        }
    }
}

impl std::error::Error for BitError {}
