use bitstream::{
    BitRead, BitReader, BitVecWriter, BitWrite, FloatLimit, IntLimit, RangedRead, RangedWrite,
};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Bit(bool),
    Bits { bits: u32, value: u64 },
    Signed { bits: u32, value: i64 },
    U8(u8),
    U16(u16),
    I32(i32),
    U64(u64),
    F32(f32),
    Str(String),
    Ranged { min: i32, span: u32, offset: u32 },
}

fn mask_value(bits: u32, value: u64) -> u64 {
    if bits >= 64 {
        value
    } else {
        let mask = (1u64 << bits) - 1;
        value & mask
    }
}

fn sign_fit(bits: u32, value: i64) -> i64 {
    if bits >= 64 {
        value
    } else {
        let shift = 64 - bits;
        (value << shift) >> shift
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(Op::Bit),
        (1u32..=64, any::<u64>()).prop_map(|(bits, value)| Op::Bits {
            bits,
            value: mask_value(bits, value),
        }),
        (1u32..=64, any::<i64>()).prop_map(|(bits, value)| Op::Signed {
            bits,
            value: sign_fit(bits, value),
        }),
        any::<u8>().prop_map(Op::U8),
        any::<u16>().prop_map(Op::U16),
        any::<i32>().prop_map(Op::I32),
        any::<u64>().prop_map(Op::U64),
        any::<f32>()
            .prop_filter("nan never compares equal", |v| !v.is_nan())
            .prop_map(Op::F32),
        "[a-z0-9]{0,40}".prop_map(Op::Str),
        (-1_000_000i32..1_000_000, 0u32..100_000, any::<u32>()).prop_map(
            |(min, span, offset)| Op::Ranged {
                min,
                span,
                offset: if span == 0 { 0 } else { offset % (span + 1) },
            }
        ),
    ]
}

proptest! {
    #[test]
    fn prop_roundtrip_ops(ops in prop::collection::vec(op_strategy(), 1..64)) {
        let mut writer = BitVecWriter::new();

        for op in &ops {
            match op {
                Op::Bit(b) => writer.write_bool(*b).unwrap(),
                Op::Bits { bits, value } => writer.write_bits(*value, *bits).unwrap(),
                Op::Signed { bits, value } => writer.write_signed_bits(*value, *bits).unwrap(),
                Op::U8(v) => writer.write_u8(*v).unwrap(),
                Op::U16(v) => writer.write_u16(*v).unwrap(),
                Op::I32(v) => writer.write_i32(*v).unwrap(),
                Op::U64(v) => writer.write_u64(*v).unwrap(),
                Op::F32(v) => writer.write_f32(*v).unwrap(),
                Op::Str(s) => writer.write_str(s).unwrap(),
                Op::Ranged { min, span, offset } => {
                    let limit = IntLimit::new(*min, min + *span as i32).unwrap();
                    writer.write_limited(min + *offset as i32, &limit).unwrap();
                }
            }
        }

        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);

        for op in &ops {
            match op {
                Op::Bit(b) => prop_assert_eq!(reader.read_bool().unwrap(), *b),
                Op::Bits { bits, value } => prop_assert_eq!(reader.read_bits(*bits).unwrap(), *value),
                Op::Signed { bits, value } => {
                    prop_assert_eq!(reader.read_signed_bits(*bits).unwrap(), *value);
                }
                Op::U8(v) => prop_assert_eq!(reader.read_u8().unwrap(), *v),
                Op::U16(v) => prop_assert_eq!(reader.read_u16().unwrap(), *v),
                Op::I32(v) => prop_assert_eq!(reader.read_i32().unwrap(), *v),
                Op::U64(v) => prop_assert_eq!(reader.read_u64().unwrap(), *v),
                Op::F32(v) => prop_assert_eq!(reader.read_f32().unwrap(), *v),
                Op::Str(s) => prop_assert_eq!(&reader.read_string().unwrap(), s),
                Op::Ranged { min, span, offset } => {
                    let limit = IntLimit::new(*min, min + *span as i32).unwrap();
                    prop_assert_eq!(reader.read_limited(&limit).unwrap(), min + *offset as i32);
                }
            }
        }
        prop_assert!(reader.bits_remaining() < 8);
    }

    #[test]
    fn prop_quantized_float_within_precision(
        min in -10_000.0f32..0.0,
        span in 1.0f32..10_000.0,
        precision in 0.01f32..1.0,
        t in 0.0f32..=1.0,
    ) {
        let max = min + span;
        let limit = FloatLimit::new(min, max, precision).unwrap();
        let value = min + span * t;

        let mut writer = BitVecWriter::new();
        writer.write_limited(value, &limit).unwrap();
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);
        let decoded = reader.read_limited(&limit).unwrap();

        prop_assert!((decoded - value).abs() <= precision, "{} vs {}", decoded, value);
    }

    #[test]
    fn prop_diff_codec_symmetric(
        baseline in -50_000i32..50_000,
        updated in -50_000i32..50_000,
        radius in 1i32..1000,
    ) {
        let limit = IntLimit::new(-50_000, 50_000).unwrap();
        let diff_limit = IntLimit::new(-radius, radius).unwrap();

        let mut writer = BitVecWriter::new();
        writer.write_diff_if_changed(baseline, updated, &limit, &diff_limit).unwrap();
        let bytes = writer.finish();
        let mut reader = BitReader::new(&bytes);

        prop_assert_eq!(
            reader.read_diff_if_changed(baseline, &limit, &diff_limit).unwrap(),
            updated
        );
    }
}
