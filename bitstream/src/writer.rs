//! Bit-level writers for encoding packed binary data.
//!
//! Bits are packed LSB-first within each byte and bytes are emitted
//! sequentially, so a multi-byte value written with its full width lands in
//! little-endian byte order.

use crate::error::{BitError, BitResult};
use crate::pool::BufferPool;

/// Maximum number of bits a single `write_bits` call accepts.
pub const MAX_BITS: u32 = 64;

/// Maximum length of a length-prefixed string in bytes.
pub const MAX_STRING_LEN: usize = u8::MAX as usize;

/// Object-safe sink for packed bits.
///
/// Implementors only provide [`write_bits`](Self::write_bits) and
/// [`bits_written`](Self::bits_written); every typed helper is derived from
/// them, which lets component pools serialize through `&mut dyn BitWrite`.
pub trait BitWrite {
    /// Writes the low `bits` bits of `value`. Higher bits are ignored.
    fn write_bits(&mut self, value: u64, bits: u32) -> BitResult<()>;

    /// Returns the number of bits written so far.
    fn bits_written(&self) -> usize;

    fn write_bool(&mut self, value: bool) -> BitResult<()> {
        self.write_bits(u64::from(value), 1)
    }

    fn write_u8(&mut self, value: u8) -> BitResult<()> {
        self.write_bits(u64::from(value), 8)
    }

    fn write_i8(&mut self, value: i8) -> BitResult<()> {
        self.write_bits(u64::from(value as u8), 8)
    }

    fn write_u16(&mut self, value: u16) -> BitResult<()> {
        self.write_bits(u64::from(value), 16)
    }

    fn write_i16(&mut self, value: i16) -> BitResult<()> {
        self.write_bits(u64::from(value as u16), 16)
    }

    fn write_u32(&mut self, value: u32) -> BitResult<()> {
        self.write_bits(u64::from(value), 32)
    }

    fn write_i32(&mut self, value: i32) -> BitResult<()> {
        self.write_bits(u64::from(value as u32), 32)
    }

    fn write_u64(&mut self, value: u64) -> BitResult<()> {
        self.write_bits(value, 64)
    }

    fn write_i64(&mut self, value: i64) -> BitResult<()> {
        self.write_bits(value as u64, 64)
    }

    /// Writes the IEEE-754 bit pattern of `value`.
    fn write_f32(&mut self, value: f32) -> BitResult<()> {
        self.write_u32(value.to_bits())
    }

    /// Writes the IEEE-754 bit pattern of `value`.
    fn write_f64(&mut self, value: f64) -> BitResult<()> {
        self.write_u64(value.to_bits())
    }

    /// Writes the low `bits` bits of a signed value's two's complement form.
    ///
    /// Pair with [`BitRead::read_signed_bits`](crate::BitRead::read_signed_bits)
    /// to get the value back sign-extended.
    fn write_signed_bits(&mut self, value: i64, bits: u32) -> BitResult<()> {
        self.write_bits(value as u64, bits)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> BitResult<()> {
        for &byte in bytes {
            self.write_u8(byte)?;
        }
        Ok(())
    }

    /// Writes a string as a one-byte length followed by its UTF-8 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::StringTooLong`] if the string exceeds 255 bytes.
    fn write_str(&mut self, value: &str) -> BitResult<()> {
        let len = value.len();
        if len > MAX_STRING_LEN {
            return Err(BitError::StringTooLong {
                len,
                max: MAX_STRING_LEN,
            });
        }
        self.write_u8(len as u8)?;
        self.write_bytes(value.as_bytes())
    }

    /// Advances the cursor by `bits` zero bits.
    fn skip_bits(&mut self, bits: usize) -> BitResult<()> {
        let mut remaining = bits;
        while remaining > 0 {
            let chunk = remaining.min(MAX_BITS as usize);
            self.write_bits(0, chunk as u32)?;
            remaining -= chunk;
        }
        Ok(())
    }

    fn skip_bytes(&mut self, bytes: usize) -> BitResult<()> {
        self.skip_bits(bytes.saturating_mul(8))
    }
}

/// Packs `bits` low bits of `value` into `buf` starting at `bit_pos`.
///
/// The caller guarantees `buf` holds at least `bit_pos + bits` bits and that
/// every bit at or after `bit_pos` is still unwritten.
fn pack_bits(buf: &mut [u8], bit_pos: usize, mut value: u64, bits: u32) {
    let mut pos = bit_pos;
    let mut remaining = bits;
    while remaining > 0 {
        let byte = pos / 8;
        let offset = (pos % 8) as u32;
        if offset == 0 && remaining >= 8 {
            buf[byte] = value as u8;
            value >>= 8;
            remaining -= 8;
            pos += 8;
            continue;
        }
        let take = (8 - offset).min(remaining);
        let chunk = (value as u8) & low_mask(take);
        if offset == 0 {
            buf[byte] = chunk;
        } else {
            buf[byte] |= chunk << offset;
        }
        value >>= take;
        remaining -= take;
        pos += take as usize;
    }
}

const fn low_mask(bits: u32) -> u8 {
    ((1u16 << bits) - 1) as u8
}

const fn check_bit_count(bits: u32) -> BitResult<()> {
    if bits > MAX_BITS {
        return Err(BitError::InvalidBitCount {
            bits,
            max_bits: MAX_BITS,
        });
    }
    Ok(())
}

/// A bit-level writer over a caller-supplied fixed buffer.
///
/// Writes never reallocate: exceeding the buffer fails with
/// [`BitError::BufferOverflow`] and leaves the cursor unchanged.
#[derive(Debug)]
pub struct BitWriter<'a> {
    buf: &'a mut [u8],
    bit_pos: usize,
}

impl<'a> BitWriter<'a> {
    /// Creates a new `BitWriter` over `buf`, starting at bit 0.
    #[must_use]
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, bit_pos: 0 }
    }

    /// Returns the capacity of the underlying buffer in bits.
    #[must_use]
    pub fn capacity_bits(&self) -> usize {
        self.buf.len().saturating_mul(8)
    }

    /// Finishes writing and returns the number of bytes used.
    ///
    /// A trailing partial byte is zero-padded.
    #[must_use]
    pub fn finish(self) -> usize {
        self.bit_pos.div_ceil(8)
    }
}

impl BitWrite for BitWriter<'_> {
    fn write_bits(&mut self, value: u64, bits: u32) -> BitResult<()> {
        check_bit_count(bits)?;
        let end = self.bit_pos + bits as usize;
        if end > self.capacity_bits() {
            return Err(BitError::BufferOverflow {
                attempted: end,
                capacity: self.capacity_bits(),
            });
        }
        pack_bits(self.buf, self.bit_pos, value, bits);
        self.bit_pos = end;
        Ok(())
    }

    fn bits_written(&self) -> usize {
        self.bit_pos
    }
}

/// A bit-level writer that owns a growable buffer.
///
/// When a write would exceed the current buffer, the buffer grows to
/// `2 * len + requested` bytes and existing content is preserved.
#[derive(Debug, Default)]
pub struct BitVecWriter {
    bytes: Vec<u8>,
    bit_pos: usize,
}

impl BitVecWriter {
    /// Creates a new empty `BitVecWriter`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `BitVecWriter` with `bytes` of pre-allocated buffer.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: vec![0; bytes],
            bit_pos: 0,
        }
    }

    /// Reuses `buffer` as backing storage. Its content is discarded.
    #[must_use]
    pub fn from_buffer(mut buffer: Vec<u8>) -> Self {
        let len = buffer.capacity();
        buffer.clear();
        buffer.resize(len, 0);
        Self {
            bytes: buffer,
            bit_pos: 0,
        }
    }

    /// Rents backing storage of at least `min_len` bytes from `pool`.
    #[must_use]
    pub fn from_pool(pool: &mut dyn BufferPool, min_len: usize) -> Self {
        Self {
            bytes: pool.rent(min_len),
            bit_pos: 0,
        }
    }

    /// Returns the size of the backing buffer in bytes.
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the bytes written so far, including a partial trailing byte.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.bit_pos.div_ceil(8)]
    }

    /// Resets the cursor to the start, keeping the allocation.
    pub fn clear(&mut self) {
        self.bytes.fill(0);
        self.bit_pos = 0;
    }

    /// Finishes writing and returns the used bytes.
    ///
    /// A trailing partial byte is zero-padded.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        self.bytes.truncate(self.bit_pos.div_ceil(8));
        self.bytes
    }

    /// Finishes writing and appends the used bytes to `buf`.
    pub fn finish_into(self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.as_slice());
    }

    /// Hands the backing buffer back to `pool`.
    pub fn release_into(self, pool: &mut dyn BufferPool) {
        pool.release(self.bytes);
    }

    fn ensure_space(&mut self, bits: u32) {
        let needed = (self.bit_pos + bits as usize).div_ceil(8);
        let len = self.bytes.len();
        if needed > len {
            let requested = needed - len;
            self.bytes.resize(len * 2 + requested, 0);
        }
    }
}

impl BitWrite for BitVecWriter {
    fn write_bits(&mut self, value: u64, bits: u32) -> BitResult<()> {
        check_bit_count(bits)?;
        self.ensure_space(bits);
        pack_bits(&mut self.bytes, self.bit_pos, value, bits);
        self.bit_pos += bits as usize;
        Ok(())
    }

    fn bits_written(&self) -> usize {
        self.bit_pos
    }
}
