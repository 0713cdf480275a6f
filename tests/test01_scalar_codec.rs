use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use sql_marshal::prelude::*;

fn kind_of(codec: &ScalarCodec, value: HostValue, column_type: ColumnType) -> ErrorKind {
    codec
        .encode(&value, &column_type)
        .expect_err("encode should have failed")
        .kind()
}

fn instant(h: u32, m: u32, s: u32) -> HostValue {
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    offset
        .with_ymd_and_hms(2006, 1, 1, h, m, s)
        .single()
        .unwrap()
        .into()
}

#[test]
fn integer_widths_are_enforced() {
    let codec = ScalarCodec::default();
    assert_eq!(
        codec.encode(&32_767.into(), &ColumnType::SmallInt).unwrap(),
        WireValue::SmallInt(32_767)
    );
    assert_eq!(
        kind_of(&codec, 100_000.into(), ColumnType::SmallInt),
        ErrorKind::RangeOverflow
    );
    assert_eq!(
        kind_of(&codec, 5_000_000_000_i64.into(), ColumnType::Integer),
        ErrorKind::RangeOverflow
    );
    let beyond_bigint = HostValue::Integer(i128::from(u64::MAX) * 10);
    assert_eq!(
        kind_of(&codec, beyond_bigint, ColumnType::BigInt),
        ErrorKind::RangeOverflow
    );
    assert_eq!(
        codec
            .encode(&HostValue::Integer(9_000_000_000), &ColumnType::BigInt)
            .unwrap(),
        WireValue::BigInt(9_000_000_000)
    );
}

#[test]
fn numeric_columns_reject_text_and_temporals() {
    let codec = ScalarCodec::default();
    for column_type in [
        ColumnType::Integer,
        ColumnType::SmallInt,
        ColumnType::BigInt,
        ColumnType::Float,
        ColumnType::Double,
    ] {
        assert_eq!(
            kind_of(&codec, "five".into(), column_type),
            ErrorKind::TypeMismatch,
            "{column_type}"
        );
        assert_eq!(
            kind_of(&codec, instant(1, 1, 1), column_type),
            ErrorKind::TypeMismatch,
            "{column_type}"
        );
    }
}

#[test]
fn reals_into_integer_columns_must_be_whole() {
    let codec = ScalarCodec::default();
    assert_eq!(
        codec.encode(&3.0.into(), &ColumnType::Integer).unwrap(),
        WireValue::Integer(3)
    );
    assert_eq!(
        kind_of(&codec, 2.5.into(), ColumnType::Integer),
        ErrorKind::RangeOverflow
    );
    assert_eq!(
        kind_of(&codec, f64::NAN.into(), ColumnType::BigInt),
        ErrorKind::RangeOverflow
    );
}

#[test]
fn float_range_is_single_precision() {
    let codec = ScalarCodec::default();
    assert_eq!(
        codec.encode(&1.5.into(), &ColumnType::Float).unwrap(),
        WireValue::Float(1.5)
    );
    // No i128 exceeds f32::MAX, so overflow is only reachable with a Real.
    assert_eq!(
        kind_of(&codec, 1e39.into(), ColumnType::Float),
        ErrorKind::RangeOverflow
    );
    assert!(matches!(
        codec.encode(&HostValue::Integer(i128::MAX), &ColumnType::Float),
        Ok(WireValue::Float(_))
    ));
    assert_eq!(
        kind_of(&codec, 1e-50.into(), ColumnType::Float),
        ErrorKind::RangeOverflow
    );
    assert_eq!(
        codec.encode(&0.0.into(), &ColumnType::Float).unwrap(),
        WireValue::Float(0.0)
    );
    assert_eq!(
        codec.encode(&1e39.into(), &ColumnType::Double).unwrap(),
        WireValue::Double(1e39)
    );
    assert_eq!(
        kind_of(&codec, f64::INFINITY.into(), ColumnType::Double),
        ErrorKind::RangeOverflow
    );
}

#[test]
fn character_columns_check_length_and_never_stringify() {
    let codec = ScalarCodec::default();
    let vc1 = ColumnType::VarChar { max_length: 1 };
    let vc10 = ColumnType::VarChar { max_length: 10 };
    let vc10000 = ColumnType::VarChar { max_length: 10_000 };
    let c1 = ColumnType::FixedChar { length: 1 };
    let c10 = ColumnType::FixedChar { length: 10 };

    assert_eq!(kind_of(&codec, "too long".into(), vc1), ErrorKind::RangeOverflow);
    assert_eq!(kind_of(&codec, (1.0 / 3.0).into(), vc1), ErrorKind::RangeOverflow);
    assert_eq!(kind_of(&codec, (1.0 / 3.0).into(), vc10), ErrorKind::RangeOverflow);
    assert_eq!(
        kind_of(&codec, "X".repeat(10_001).into(), vc10000),
        ErrorKind::RangeOverflow
    );
    assert!(codec.encode(&"X".repeat(10_000).into(), &vc10000).is_ok());
    assert_eq!(kind_of(&codec, "too long".into(), c1), ErrorKind::RangeOverflow);
    assert_eq!(kind_of(&codec, instant(0, 0, 0), c10), ErrorKind::RangeOverflow);
}

#[test]
fn fixed_char_decodes_right_padded() {
    let codec = ScalarCodec::default();
    let c10 = ColumnType::FixedChar { length: 10 };
    let wire = codec.encode(&"AAAAA".into(), &c10).unwrap();
    assert_eq!(
        codec.decode(wire, &c10).unwrap(),
        HostValue::Text("AAAAA     ".into())
    );
}

#[test]
fn length_semantics_change_what_fits() {
    let c1 = ColumnType::FixedChar { length: 1 };
    let chars = ScalarCodec::new(LengthSemantics::Characters);
    let bytes = ScalarCodec::new(LengthSemantics::Bytes);
    assert!(chars.encode(&"é".into(), &c1).is_ok());
    assert_eq!(kind_of(&bytes, "é".into(), c1), ErrorKind::RangeOverflow);
}

#[test]
fn date_requires_a_calendar_date() {
    let codec = ScalarCodec::default();
    let date = NaiveDate::from_ymd_opt(2000, 2, 2).unwrap();
    assert_eq!(
        codec.encode(&date.into(), &ColumnType::Date).unwrap(),
        WireValue::Date(date)
    );
    assert_eq!(
        kind_of(&codec, 2006.into(), ColumnType::Date),
        ErrorKind::InvalidArgument
    );
    assert_eq!(
        kind_of(&codec, "2006-01-01".into(), ColumnType::Date),
        ErrorKind::TypeMismatch
    );
}

#[test]
fn time_and_timestamp_reject_strings_and_numbers() {
    let codec = ScalarCodec::default();
    for column_type in [ColumnType::Time, ColumnType::Timestamp] {
        assert_eq!(
            kind_of(&codec, "2006/1/1".into(), column_type),
            ErrorKind::TypeMismatch
        );
        assert_eq!(
            kind_of(&codec, 10_000.into(), column_type),
            ErrorKind::TypeMismatch
        );
    }
}

#[test]
fn time_of_day_is_taken_in_utc() {
    let codec = ScalarCodec::default();
    let wire = codec.encode(&instant(12, 5, 5), &ColumnType::Time).unwrap();
    assert_eq!(
        wire,
        WireValue::Time(NaiveTime::from_hms_opt(10, 5, 5).unwrap())
    );
}

#[test]
fn timestamp_round_trips_the_instant() {
    let codec = ScalarCodec::default();
    let original = instant(3, 4, 5);
    let wire = codec.encode(&original, &ColumnType::Timestamp).unwrap();
    let decoded = codec.decode(wire, &ColumnType::Timestamp).unwrap();
    assert_eq!(decoded, original);

    let as_utc = Utc.with_ymd_and_hms(2006, 1, 1, 1, 4, 5).single().unwrap();
    assert_eq!(decoded.as_instant().unwrap(), as_utc);
    assert_eq!(decoded.as_instant().unwrap().offset().local_minus_utc(), 0);
}

#[test]
fn null_binds_to_every_type() {
    let codec = ScalarCodec::default();
    for column_type in [
        ColumnType::Integer,
        ColumnType::Float,
        ColumnType::VarChar { max_length: 1 },
        ColumnType::Date,
        ColumnType::Timestamp,
    ] {
        assert_eq!(
            codec.encode(&HostValue::Null, &column_type).unwrap(),
            WireValue::Null
        );
        assert_eq!(
            codec.decode(WireValue::Null, &column_type).unwrap(),
            HostValue::Null
        );
    }
}

#[test]
fn generated_rows_survive_encode_then_decode() {
    let codec = ScalarCodec::default();
    for i in 0..10_u32 {
        let c = char::from_u32(i + 64).unwrap().to_string();
        let cases: Vec<(HostValue, ColumnType)> = vec![
            (HostValue::Integer(i128::from(i)), ColumnType::Integer),
            (HostValue::Integer(i128::from(i)), ColumnType::SmallInt),
            (HostValue::Integer(i128::from(i) * 1_000_000_000), ColumnType::BigInt),
            (HostValue::Real(f64::from(i) / 2.0), ColumnType::Float),
            (HostValue::Real(f64::from(i * 3333) / 2.0), ColumnType::Double),
            (c.clone().into(), ColumnType::FixedChar { length: 1 }),
            (c.repeat(i as usize).into(), ColumnType::VarChar { max_length: 10 }),
            (
                NaiveDate::from_ymd_opt(2000, i + 1, i + 1).unwrap().into(),
                ColumnType::Date,
            ),
            (
                NaiveTime::from_hms_opt(12, i, i).unwrap().into(),
                ColumnType::Time,
            ),
            (instant(i, i, i), ColumnType::Timestamp),
        ];
        for (value, column_type) in cases {
            let wire = codec.encode(&value, &column_type).unwrap();
            assert_eq!(codec.decode(wire, &column_type).unwrap(), value, "{column_type} row {i}");
        }
    }
}

#[test]
fn blob_columns_are_not_encoded_inline() {
    let codec = ScalarCodec::default();
    let blob = ColumnType::Blob {
        subtype: BlobSubtype::Binary,
        segment_size: 80,
    };
    assert_eq!(
        kind_of(&codec, vec![1_u8, 2].into(), blob),
        ErrorKind::InvalidArgument
    );
    assert_eq!(
        codec
            .decode(WireValue::BlobData(vec![1, 2]), &blob)
            .unwrap(),
        HostValue::Bytes(vec![1, 2])
    );
}
