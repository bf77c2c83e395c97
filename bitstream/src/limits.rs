//! Value-domain descriptors driving minimum-width range encoding.
//!
//! A limit maps a value in `[min, max]` onto an unsigned integer of
//! [`Limit::bit_count`] bits. Integer limits are exact; [`FloatLimit`]
//! quantizes and only reproduces a value to within half its precision.

use std::fmt;

/// Default quantization step for float limits.
pub const DEFAULT_FLOAT_PRECISION: f32 = 1e-7;

/// Largest bit count a float quantization may use.
const MAX_FLOAT_BITS: u32 = 32;

/// Number of bits needed to represent every value in `0..=range`.
///
/// A zero range still uses one bit.
#[must_use]
pub const fn bits_required(range: u64) -> u32 {
    if range == 0 {
        1
    } else {
        u64::BITS - range.leading_zeros()
    }
}

/// Errors raised when constructing a limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitError {
    /// Integer limit with `min > max`.
    InvalidRange {
        min: i64,
        max: i64,
    },
    /// Float limit with `min >= max` or a non-finite bound.
    InvalidFloatRange {
        min: f32,
        max: f32,
    },
    /// Float precision that is not strictly positive.
    InvalidPrecision {
        precision: f32,
    },
    /// Float range and precision need more than 32 bits.
    TooManySteps {
        steps: f64,
    },
}

impl fmt::Display for LimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange { min, max } => {
                write!(f, "invalid limit range: min {min} > max {max}")
            }
            Self::InvalidFloatRange { min, max } => {
                write!(f, "invalid float limit range: min {min} must be below max {max}")
            }
            Self::InvalidPrecision { precision } => {
                write!(f, "float limit precision {precision} must be positive")
            }
            Self::TooManySteps { steps } => {
                write!(
                    f,
                    "float limit needs {steps} steps, more than {MAX_FLOAT_BITS} bits can hold"
                )
            }
        }
    }
}

impl std::error::Error for LimitError {}

/// A value domain with a minimum-width unsigned encoding.
pub trait Limit {
    type Value: Copy + PartialEq;

    /// Number of bits one encoded value occupies.
    fn bit_count(&self) -> u32;

    /// Maps `value` onto `0..2^bit_count`. Values outside the domain are clamped.
    fn encode(&self, value: Self::Value) -> u64;

    /// Inverse of [`encode`](Self::encode).
    fn decode(&self, raw: u64) -> Self::Value;

    /// Whether `updated` counts as unchanged relative to `baseline`.
    fn is_unchanged(&self, baseline: Self::Value, updated: Self::Value) -> bool {
        baseline == updated
    }

    /// `updated - baseline` in the value's own arithmetic.
    fn diff(&self, baseline: Self::Value, updated: Self::Value) -> Self::Value;

    /// `baseline + diff` in the value's own arithmetic.
    fn apply_diff(&self, baseline: Self::Value, diff: Self::Value) -> Self::Value;

    /// Whether `value` lies strictly inside `(min, max)`.
    fn contains_strict(&self, value: Self::Value) -> bool;
}

macro_rules! int_limit {
    ($(#[$meta:meta])* $name:ident, $ty:ty, $unsigned:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name {
            min: $ty,
            max: $ty,
            bit_count: u32,
        }

        impl $name {
            /// Creates a limit over `[min, max]`.
            pub fn new(min: $ty, max: $ty) -> Result<Self, LimitError> {
                if min > max {
                    return Err(LimitError::InvalidRange {
                        min: i64::from(min),
                        max: i64::from(max),
                    });
                }
                let range = max.wrapping_sub(min) as $unsigned;
                Ok(Self {
                    min,
                    max,
                    bit_count: bits_required(u64::from(range)),
                })
            }

            #[must_use]
            pub const fn min(&self) -> $ty {
                self.min
            }

            #[must_use]
            pub const fn max(&self) -> $ty {
                self.max
            }
        }

        impl Limit for $name {
            type Value = $ty;

            fn bit_count(&self) -> u32 {
                self.bit_count
            }

            fn encode(&self, value: $ty) -> u64 {
                let value = value.clamp(self.min, self.max);
                u64::from(value.wrapping_sub(self.min) as $unsigned)
            }

            fn decode(&self, raw: u64) -> $ty {
                (raw as $unsigned as $ty).wrapping_add(self.min)
            }

            fn diff(&self, baseline: $ty, updated: $ty) -> $ty {
                updated.wrapping_sub(baseline)
            }

            fn apply_diff(&self, baseline: $ty, diff: $ty) -> $ty {
                baseline.wrapping_add(diff)
            }

            fn contains_strict(&self, value: $ty) -> bool {
                self.min < value && value < self.max
            }
        }
    };
}

int_limit!(
    /// Range limit for `u8` values.
    ByteLimit,
    u8,
    u8
);
int_limit!(
    /// Range limit for `i8` values.
    SByteLimit,
    i8,
    u8
);
int_limit!(
    /// Range limit for `i16` values.
    ShortLimit,
    i16,
    u16
);
int_limit!(
    /// Range limit for `u16` values.
    UShortLimit,
    u16,
    u16
);
int_limit!(
    /// Range limit for `i32` values.
    IntLimit,
    i32,
    u32
);
int_limit!(
    /// Range limit for `u32` values.
    UIntLimit,
    u32,
    u32
);

/// Quantized range limit for `f32` values.
///
/// The domain `[min, max]` is split into `ceil((max - min) / precision)`
/// steps; encoding rounds to the nearest step, so a decoded value is within
/// `precision / 2` of the original (plus float rounding noise).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatLimit {
    min: f32,
    max: f32,
    precision: f32,
    delta: f64,
    max_integer_value: u32,
    bit_count: u32,
}

impl FloatLimit {
    /// Creates a limit over `[min, max]` quantized to `precision`.
    pub fn new(min: f32, max: f32, precision: f32) -> Result<Self, LimitError> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(LimitError::InvalidFloatRange { min, max });
        }
        if !precision.is_finite() || precision <= 0.0 {
            return Err(LimitError::InvalidPrecision { precision });
        }
        let delta = f64::from(max) - f64::from(min);
        let steps = (delta / f64::from(precision)).ceil();
        if steps > f64::from(u32::MAX) {
            return Err(LimitError::TooManySteps { steps });
        }
        let max_integer_value = steps as u32;
        Ok(Self {
            min,
            max,
            precision,
            delta,
            max_integer_value,
            bit_count: bits_required(u64::from(max_integer_value)),
        })
    }

    /// Creates a limit with [`DEFAULT_FLOAT_PRECISION`].
    pub fn with_default_precision(min: f32, max: f32) -> Result<Self, LimitError> {
        Self::new(min, max, DEFAULT_FLOAT_PRECISION)
    }

    #[must_use]
    pub const fn min(&self) -> f32 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> f32 {
        self.max
    }

    #[must_use]
    pub const fn precision(&self) -> f32 {
        self.precision
    }

    /// Largest encoded integer, reached at `max`.
    #[must_use]
    pub const fn max_integer_value(&self) -> u32 {
        self.max_integer_value
    }
}

impl Limit for FloatLimit {
    type Value = f32;

    fn bit_count(&self) -> u32 {
        self.bit_count
    }

    fn encode(&self, value: f32) -> u64 {
        let normalized = ((f64::from(value) - f64::from(self.min)) / self.delta).clamp(0.0, 1.0);
        (normalized * f64::from(self.max_integer_value) + 0.5).floor() as u64
    }

    fn decode(&self, raw: u64) -> f32 {
        let normalized = raw as f64 / f64::from(self.max_integer_value);
        (normalized * self.delta + f64::from(self.min)) as f32
    }

    fn is_unchanged(&self, baseline: f32, updated: f32) -> bool {
        (updated - baseline).abs() < self.precision
    }

    fn diff(&self, baseline: f32, updated: f32) -> f32 {
        updated - baseline
    }

    fn apply_diff(&self, baseline: f32, diff: f32) -> f32 {
        baseline + diff
    }

    fn contains_strict(&self, value: f32) -> bool {
        self.min < value && value < self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_required_boundaries() {
        assert_eq!(bits_required(0), 1);
        assert_eq!(bits_required(1), 1);
        assert_eq!(bits_required(2), 2);
        assert_eq!(bits_required(127), 7);
        assert_eq!(bits_required(255), 8);
        assert_eq!(bits_required(256), 9);
        assert_eq!(bits_required(u64::from(u32::MAX)), 32);
        assert_eq!(bits_required(u64::MAX), 64);
    }

    #[test]
    fn int_limit_bit_counts() {
        assert_eq!(IntLimit::new(5, 5).unwrap().bit_count(), 1);
        assert_eq!(IntLimit::new(-100, 100).unwrap().bit_count(), 8);
        assert_eq!(IntLimit::new(i32::MIN, i32::MAX).unwrap().bit_count(), 32);
        assert_eq!(SByteLimit::new(i8::MIN, i8::MAX).unwrap().bit_count(), 8);
        assert_eq!(UShortLimit::new(0, 1000).unwrap().bit_count(), 10);
    }

    #[test]
    fn int_limit_rejects_inverted_range() {
        assert_eq!(
            IntLimit::new(10, -10),
            Err(LimitError::InvalidRange { min: 10, max: -10 })
        );
        assert!(ByteLimit::new(3, 2).is_err());
    }

    #[test]
    fn int_limit_encodes_offset_from_min() {
        let limit = ShortLimit::new(-50, 50).unwrap();
        assert_eq!(limit.encode(-50), 0);
        assert_eq!(limit.encode(0), 50);
        assert_eq!(limit.encode(50), 100);
        assert_eq!(limit.decode(100), 50);
        assert_eq!(limit.decode(0), -50);
    }

    #[test]
    fn int_limit_clamps_out_of_domain() {
        let limit = ByteLimit::new(10, 20).unwrap();
        assert_eq!(limit.encode(0), 0);
        assert_eq!(limit.encode(255), 10);
    }

    #[test]
    fn contains_strict_excludes_bounds() {
        let limit = IntLimit::new(-4, 4).unwrap();
        assert!(limit.contains_strict(3));
        assert!(!limit.contains_strict(4));
        assert!(!limit.contains_strict(-4));
    }

    #[test]
    fn float_limit_rejects_bad_ranges() {
        assert!(matches!(
            FloatLimit::new(1.0, 1.0, 0.1),
            Err(LimitError::InvalidFloatRange { .. })
        ));
        assert!(matches!(
            FloatLimit::new(2.0, 1.0, 0.1),
            Err(LimitError::InvalidFloatRange { .. })
        ));
        assert!(matches!(
            FloatLimit::new(0.0, 1.0, 0.0),
            Err(LimitError::InvalidPrecision { .. })
        ));
        assert!(matches!(
            FloatLimit::new(f32::NEG_INFINITY, 1.0, 0.1),
            Err(LimitError::InvalidFloatRange { .. })
        ));
        assert!(matches!(
            FloatLimit::new(-1.0e6, 1.0e6, 1.0e-7),
            Err(LimitError::TooManySteps { .. })
        ));
    }

    #[test]
    fn float_limit_quantization_parameters() {
        let limit = FloatLimit::new(-100.0, 100.001, 0.01).unwrap();
        assert_eq!(limit.max_integer_value(), 20001);
        assert_eq!(limit.bit_count(), 15);
    }

    #[test]
    fn float_limit_endpoints_are_exact_steps() {
        let limit = FloatLimit::new(0.0, 10.0, 0.5).unwrap();
        assert_eq!(limit.encode(0.0), 0);
        assert_eq!(limit.encode(10.0), 20);
        assert_eq!(limit.encode(-3.0), 0);
        assert_eq!(limit.encode(99.0), 20);
        assert!((limit.decode(20) - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn float_limit_unchanged_within_precision() {
        let limit = FloatLimit::new(0.0, 1.0, 0.01).unwrap();
        assert!(limit.is_unchanged(0.5, 0.505));
        assert!(!limit.is_unchanged(0.5, 0.52));
    }
}
