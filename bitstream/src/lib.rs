//! Bit packing primitives for deterministic state serialization.
//!
//! This crate provides bit-addressable writers and a reader, plus
//! range-limited numeric codecs that spend only as many bits as a known value
//! domain needs.
//!
//! # Design Principles
//!
//! - **Safe code only** - `unsafe` is forbidden workspace-wide.
//! - **Bounded operations** - Reads are bounds-checked; fixed-buffer writes fail on overflow.
//! - **Layer-agnostic** - Nothing here knows about entities or components.
//! - **Structured errors** - Malformed input yields a [`BitError`], never a panic.
//!
//! # Wire layout
//!
//! Bits are packed LSB-first within each byte and bytes follow each other in
//! stream order. Full-width integers therefore appear little-endian. Strings
//! are a one-byte length followed by UTF-8 bytes. There is no framing: a
//! reader must issue the same call sequence the writer did.
//!
//! # Example
//!
//! ```
//! use bitstream::{BitRead, BitReader, BitVecWriter, BitWrite, IntLimit, RangedRead, RangedWrite};
//!
//! let limit = IntLimit::new(-100, 100).unwrap();
//! let mut writer = BitVecWriter::new();
//! writer.write_bool(true).unwrap();
//! writer.write_limited(42, &limit).unwrap();
//!
//! let bytes = writer.finish();
//!
//! let mut reader = BitReader::new(&bytes);
//! assert!(reader.read_bool().unwrap());
//! assert_eq!(reader.read_limited(&limit).unwrap(), 42);
//! ```

mod codec;
mod error;
mod limits;
mod pool;
mod reader;
mod writer;

pub use codec::{Primitive, RangedRead, RangedWrite};
pub use error::{BitError, BitResult};
pub use limits::{
    bits_required, ByteLimit, FloatLimit, IntLimit, Limit, LimitError, SByteLimit, ShortLimit,
    UIntLimit, UShortLimit, DEFAULT_FLOAT_PRECISION,
};
pub use pool::{BufferPool, SimpleBufferPool};
pub use reader::{BitRead, BitReader};
pub use writer::{BitVecWriter, BitWrite, BitWriter, MAX_BITS, MAX_STRING_LEN};
