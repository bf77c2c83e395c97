use bitstream::{
    BitRead, BitReader, BitVecWriter, BitWrite, BitWriter, FloatLimit, IntLimit, Limit,
    RangedRead, RangedWrite, UIntLimit,
};

#[test]
fn bounded_writer_roundtrip_bits() {
    let mut buf = [0u8; 8];
    let mut writer = BitWriter::new(&mut buf);
    writer.write_bits(0b1010, 4).unwrap();
    writer.write_bits(0xAB, 8).unwrap();
    let bytes_used = writer.finish();

    let mut reader = BitReader::new(&buf[..bytes_used]);
    assert_eq!(reader.read_bits(4).unwrap(), 0b1010);
    assert_eq!(reader.read_bits(8).unwrap(), 0xAB);
}

#[test]
fn raw_bits_roundtrip_boundary_values() {
    for bits in [1u32, 7, 8, 9, 16, 17, 32] {
        let max = (1u64 << bits) - 1;
        let values = [0, 1, max, max / 2];

        let mut writer = BitVecWriter::new();
        // misalign the stream so every width crosses byte boundaries
        writer.write_bits(1, 3).unwrap();
        for value in values {
            writer.write_bits(value, bits).unwrap();
        }
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_bits(3).unwrap(), 1);
        for value in values {
            assert_eq!(
                reader.read_bits(bits).unwrap(),
                value,
                "{bits}-bit value {value}"
            );
        }
    }
}

#[test]
fn signed_bits_roundtrip_boundary_values() {
    for bits in [1u32, 7, 8, 9, 16, 17, 32] {
        let min = -(1i64 << (bits - 1));
        let max = (1i64 << (bits - 1)) - 1;
        let values = [0, min, max, max / 2, min / 2];

        let mut writer = BitVecWriter::new();
        for value in values {
            writer.write_signed_bits(value, bits).unwrap();
        }
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        for value in values {
            assert_eq!(
                reader.read_signed_bits(bits).unwrap(),
                value,
                "{bits}-bit value {value}"
            );
        }
    }
}

#[test]
fn ranged_int_bit_counts_and_boundaries() {
    let cases = [
        (UIntLimit::new(0, 1).unwrap(), 1),
        (UIntLimit::new(0, 127).unwrap(), 7),
        (UIntLimit::new(0, 255).unwrap(), 8),
        (UIntLimit::new(0, 256).unwrap(), 9),
        (UIntLimit::new(0, 65_535).unwrap(), 16),
        (UIntLimit::new(0, 65_536).unwrap(), 17),
        (UIntLimit::new(0, u32::MAX).unwrap(), 32),
    ];

    for (limit, bits) in cases {
        assert_eq!(limit.bit_count(), bits);
        let values = [0, 1.min(limit.max()), limit.max(), limit.max() / 2];

        let mut writer = BitVecWriter::new();
        for value in values {
            writer.write_limited(value, &limit).unwrap();
        }
        assert_eq!(writer.bits_written(), values.len() * bits as usize);
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        for value in values {
            assert_eq!(reader.read_limited(&limit).unwrap(), value);
        }
    }
}

#[test]
fn ranged_signed_int_full_domain() {
    let limit = IntLimit::new(i32::MIN, i32::MAX).unwrap();
    let mut writer = BitVecWriter::new();
    for value in [i32::MIN, -1, 0, 1, i32::MAX] {
        writer.write_limited(value, &limit).unwrap();
    }
    let bytes = writer.finish();
    let mut reader = BitReader::new(&bytes);
    for value in [i32::MIN, -1, 0, 1, i32::MAX] {
        assert_eq!(reader.read_limited(&limit).unwrap(), value);
    }
}

#[test]
fn quantized_float_is_approximate() {
    let limit = FloatLimit::new(-100.0, 100.001, 0.01).unwrap();
    let mut writer = BitVecWriter::new();
    writer.write_limited(37.2345, &limit).unwrap();
    assert_eq!(writer.bits_written(), 15);
    let bytes = writer.finish();

    let mut reader = BitReader::new(&bytes);
    let decoded = reader.read_limited(&limit).unwrap();
    assert!(
        (decoded - 37.2345).abs() <= 0.01,
        "decoded {decoded} too far from 37.2345"
    );
}

#[test]
fn vec_writer_roundtrip_mixed() {
    let mut writer = BitVecWriter::with_capacity(1);
    writer.write_bool(true).unwrap();
    writer.write_bits(0b1010, 4).unwrap();
    writer.write_u16(0xBEEF).unwrap();
    writer.write_str("entity").unwrap();
    writer.write_i8(-5).unwrap();
    writer.write_f32(1.5).unwrap();
    let bytes = writer.finish();

    let mut reader = BitReader::new(&bytes);
    assert!(reader.read_bool().unwrap());
    assert_eq!(reader.read_bits(4).unwrap(), 0b1010);
    assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
    assert_eq!(reader.read_string().unwrap(), "entity");
    assert_eq!(reader.read_i8().unwrap(), -5);
    assert_eq!(reader.read_f32().unwrap(), 1.5);
    assert!(reader.bits_remaining() < 8);
}
