//! Range-limited and change-aware encoding on top of [`BitWrite`]/[`BitRead`].
//!
//! Change encodings emit a leading "changed" bit; when the value is
//! unchanged the reader returns the caller's baseline. Diff encodings add a
//! second bit choosing between a delta under a tight `diff_limit` and the
//! absolute value under the full `limit`.

use crate::error::BitResult;
use crate::limits::{Limit, DEFAULT_FLOAT_PRECISION};
use crate::reader::BitRead;
use crate::writer::BitWrite;

/// A value with a fixed full-width wire encoding.
pub trait Primitive: Copy + PartialEq {
    fn write_to<W: BitWrite + ?Sized>(self, writer: &mut W) -> BitResult<()>;
    fn read_from<R: BitRead + ?Sized>(reader: &mut R) -> BitResult<Self>;

    fn is_unchanged(baseline: Self, updated: Self) -> bool {
        baseline == updated
    }
}

macro_rules! primitive {
    ($ty:ty, $write:ident, $read:ident) => {
        impl Primitive for $ty {
            fn write_to<W: BitWrite + ?Sized>(self, writer: &mut W) -> BitResult<()> {
                writer.$write(self)
            }

            fn read_from<R: BitRead + ?Sized>(reader: &mut R) -> BitResult<Self> {
                reader.$read()
            }
        }
    };
}

primitive!(bool, write_bool, read_bool);
primitive!(u8, write_u8, read_u8);
primitive!(i8, write_i8, read_i8);
primitive!(u16, write_u16, read_u16);
primitive!(i16, write_i16, read_i16);
primitive!(u32, write_u32, read_u32);
primitive!(i32, write_i32, read_i32);
primitive!(u64, write_u64, read_u64);
primitive!(i64, write_i64, read_i64);

impl Primitive for f32 {
    fn write_to<W: BitWrite + ?Sized>(self, writer: &mut W) -> BitResult<()> {
        writer.write_f32(self)
    }

    fn read_from<R: BitRead + ?Sized>(reader: &mut R) -> BitResult<Self> {
        reader.read_f32()
    }

    fn is_unchanged(baseline: Self, updated: Self) -> bool {
        (updated - baseline).abs() < DEFAULT_FLOAT_PRECISION
    }
}

impl Primitive for f64 {
    fn write_to<W: BitWrite + ?Sized>(self, writer: &mut W) -> BitResult<()> {
        writer.write_f64(self)
    }

    fn read_from<R: BitRead + ?Sized>(reader: &mut R) -> BitResult<Self> {
        reader.read_f64()
    }

    fn is_unchanged(baseline: Self, updated: Self) -> bool {
        (updated - baseline).abs() < f64::from(DEFAULT_FLOAT_PRECISION)
    }
}

/// Write side of the ranged and change-aware codecs.
pub trait RangedWrite: BitWrite {
    /// Writes `value` in exactly `limit.bit_count()` bits.
    fn write_limited<L: Limit>(&mut self, value: L::Value, limit: &L) -> BitResult<()> {
        self.write_bits(limit.encode(value), limit.bit_count())
    }

    /// Writes a changed bit, then `updated` at full width if it changed.
    fn write_value_if_changed<P: Primitive>(&mut self, baseline: P, updated: P) -> BitResult<()> {
        if P::is_unchanged(baseline, updated) {
            return self.write_bool(false);
        }
        self.write_bool(true)?;
        updated.write_to(self)
    }

    /// Writes a changed bit, then `updated` under `limit` if it changed.
    fn write_limited_if_changed<L: Limit>(
        &mut self,
        baseline: L::Value,
        updated: L::Value,
        limit: &L,
    ) -> BitResult<()> {
        if limit.is_unchanged(baseline, updated) {
            return self.write_bool(false);
        }
        self.write_bool(true)?;
        self.write_limited(updated, limit)
    }

    /// Writes a changed bit and, if changed, either the delta under
    /// `diff_limit` or the absolute value under `limit`.
    ///
    /// The delta is used only when it lies strictly inside `diff_limit`.
    fn write_diff_if_changed<L: Limit>(
        &mut self,
        baseline: L::Value,
        updated: L::Value,
        limit: &L,
        diff_limit: &L,
    ) -> BitResult<()> {
        if limit.is_unchanged(baseline, updated) {
            return self.write_bool(false);
        }
        self.write_bool(true)?;
        let diff = limit.diff(baseline, updated);
        if diff_limit.contains_strict(diff) {
            self.write_bool(true)?;
            self.write_limited(diff, diff_limit)
        } else {
            self.write_bool(false)?;
            self.write_limited(updated, limit)
        }
    }
}

impl<W: BitWrite + ?Sized> RangedWrite for W {}

/// Read side of the ranged and change-aware codecs.
pub trait RangedRead: BitRead {
    fn read_limited<L: Limit>(&mut self, limit: &L) -> BitResult<L::Value> {
        Ok(limit.decode(self.read_bits(limit.bit_count())?))
    }

    fn read_value_if_changed<P: Primitive>(&mut self, baseline: P) -> BitResult<P> {
        if self.read_bool()? {
            P::read_from(self)
        } else {
            Ok(baseline)
        }
    }

    fn read_limited_if_changed<L: Limit>(
        &mut self,
        baseline: L::Value,
        limit: &L,
    ) -> BitResult<L::Value> {
        if self.read_bool()? {
            self.read_limited(limit)
        } else {
            Ok(baseline)
        }
    }

    fn read_diff_if_changed<L: Limit>(
        &mut self,
        baseline: L::Value,
        limit: &L,
        diff_limit: &L,
    ) -> BitResult<L::Value> {
        if !self.read_bool()? {
            return Ok(baseline);
        }
        if self.read_bool()? {
            let diff = self.read_limited(diff_limit)?;
            Ok(limit.apply_diff(baseline, diff))
        } else {
            self.read_limited(limit)
        }
    }
}

impl<R: BitRead + ?Sized> RangedRead for R {}
