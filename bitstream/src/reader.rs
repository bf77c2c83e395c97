//! Bit-level reader with bounded operations.

use crate::error::{BitError, BitResult};
use crate::writer::MAX_BITS;

/// Object-safe source of packed bits, the mirror of [`BitWrite`](crate::BitWrite).
///
/// Every read is bounds-checked; a short buffer yields
/// [`BitError::EndOfBuffer`] rather than garbage.
pub trait BitRead {
    /// Reads `bits` bits as an unsigned value, zero-extended.
    fn read_bits(&mut self, bits: u32) -> BitResult<u64>;

    /// Returns the number of bits remaining to read.
    fn bits_remaining(&self) -> usize;

    /// Advances the cursor by `bits` without decoding.
    fn skip_bits(&mut self, bits: usize) -> BitResult<()>;

    fn skip_bytes(&mut self, bytes: usize) -> BitResult<()> {
        self.skip_bits(bytes.saturating_mul(8))
    }

    fn read_bool(&mut self) -> BitResult<bool> {
        Ok(self.read_bits(1)? == 1)
    }

    fn read_u8(&mut self) -> BitResult<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    fn read_i8(&mut self) -> BitResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    fn read_u16(&mut self) -> BitResult<u16> {
        Ok(self.read_bits(16)? as u16)
    }

    fn read_i16(&mut self) -> BitResult<i16> {
        Ok(self.read_u16()? as i16)
    }

    fn read_u32(&mut self) -> BitResult<u32> {
        Ok(self.read_bits(32)? as u32)
    }

    fn read_i32(&mut self) -> BitResult<i32> {
        Ok(self.read_u32()? as i32)
    }

    fn read_u64(&mut self) -> BitResult<u64> {
        self.read_bits(64)
    }

    fn read_i64(&mut self) -> BitResult<i64> {
        Ok(self.read_u64()? as i64)
    }

    fn read_f32(&mut self) -> BitResult<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    fn read_f64(&mut self) -> BitResult<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads `bits` bits and sign-extends from the highest one.
    fn read_signed_bits(&mut self, bits: u32) -> BitResult<i64> {
        let raw = self.read_bits(bits)?;
        if bits == 0 || bits >= MAX_BITS {
            return Ok(raw as i64);
        }
        let shift = MAX_BITS - bits;
        Ok(((raw << shift) as i64) >> shift)
    }

    fn read_bytes(&mut self, len: usize) -> BitResult<Vec<u8>> {
        let available = self.bits_remaining();
        let requested = len.saturating_mul(8);
        if requested > available {
            return Err(BitError::EndOfBuffer {
                requested,
                available,
            });
        }
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.read_u8()?);
        }
        Ok(out)
    }

    /// Reads a one-byte length followed by that many UTF-8 bytes.
    fn read_string(&mut self) -> BitResult<String> {
        let len = usize::from(self.read_u8()?);
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| BitError::InvalidUtf8)
    }
}

/// A bit-level reader for decoding packed binary data.
///
/// The reader never panics on malformed input.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a new `BitReader` from a byte slice.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Returns `true` if there are no more bits to read.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Returns the current bit position.
    #[must_use]
    pub const fn bit_position(&self) -> usize {
        self.bit_pos
    }

    const fn remaining(&self) -> usize {
        self.data
            .len()
            .saturating_mul(8)
            .saturating_sub(self.bit_pos)
    }

    fn ensure_bits(&self, bits: usize) -> BitResult<()> {
        let available = self.remaining();
        if bits > available {
            return Err(BitError::EndOfBuffer {
                requested: bits,
                available,
            });
        }
        Ok(())
    }
}

impl BitRead for BitReader<'_> {
    fn read_bits(&mut self, bits: u32) -> BitResult<u64> {
        if bits > MAX_BITS {
            return Err(BitError::InvalidBitCount {
                bits,
                max_bits: MAX_BITS,
            });
        }
        self.ensure_bits(bits as usize)?;

        let mut value = 0u64;
        let mut shift = 0u32;
        let mut remaining = bits;
        while remaining > 0 {
            let byte = self.data[self.bit_pos / 8];
            let offset = (self.bit_pos % 8) as u32;
            if offset == 0 && remaining >= 8 {
                value |= u64::from(byte) << shift;
                shift += 8;
                remaining -= 8;
                self.bit_pos += 8;
                continue;
            }
            let take = (8 - offset).min(remaining);
            let chunk = (byte >> offset) & (((1u16 << take) - 1) as u8);
            value |= u64::from(chunk) << shift;
            shift += take;
            remaining -= take;
            self.bit_pos += take as usize;
        }
        Ok(value)
    }

    fn bits_remaining(&self) -> usize {
        self.remaining()
    }

    fn skip_bits(&mut self, bits: usize) -> BitResult<()> {
        self.ensure_bits(bits)?;
        self.bit_pos += bits;
        Ok(())
    }
}
