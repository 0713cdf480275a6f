use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::types::Value;

use crate::error::SqlMarshalError;
use crate::types::{ColumnType, WireValue};

use super::blobs::BlobStore;
use super::params::{DATE_FORMAT, TIME_FORMAT, TIMESTAMP_FORMAT};

/// Map a stored `SQLite` value onto the wire form of its declared column type.
///
/// Integers are narrowed only when they fit; a value outside the column's width is
/// passed on as BIGINT so the codec reports the overflow. Blob content is staged in
/// `blobs` and handed out as an engine blob id.
///
/// # Errors
///
/// Returns `SqlMarshalError::ExecutionError` if the stored value cannot represent the
/// declared type (for example malformed temporal text).
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(super) fn wire_value(
    value: Value,
    column_type: &ColumnType,
    blobs: &mut BlobStore,
) -> Result<WireValue, SqlMarshalError> {
    let wire = match (column_type, value) {
        (_, Value::Null) => WireValue::Null,
        (ColumnType::SmallInt, Value::Integer(i)) => {
            i16::try_from(i).map_or(WireValue::BigInt(i), WireValue::SmallInt)
        }
        (ColumnType::Integer, Value::Integer(i)) => {
            i32::try_from(i).map_or(WireValue::BigInt(i), WireValue::Integer)
        }
        (ColumnType::BigInt, Value::Integer(i)) => WireValue::BigInt(i),
        (ColumnType::Float, Value::Real(f)) => WireValue::Float(f as f32),
        (ColumnType::Float, Value::Integer(i)) => WireValue::Float(i as f32),
        (ColumnType::Double, Value::Real(f)) => WireValue::Double(f),
        (ColumnType::Double, Value::Integer(i)) => WireValue::Double(i as f64),
        (ColumnType::FixedChar { .. } | ColumnType::VarChar { .. }, Value::Text(s)) => {
            WireValue::Text(s)
        }
        (ColumnType::Date, Value::Text(s)) => NaiveDate::parse_from_str(&s, DATE_FORMAT)
            .map(WireValue::Date)
            .map_err(|err| malformed(column_type, &s, &err))?,
        (ColumnType::Time, Value::Text(s)) => NaiveTime::parse_from_str(&s, TIME_FORMAT)
            .map(WireValue::Time)
            .map_err(|err| malformed(column_type, &s, &err))?,
        (ColumnType::Timestamp, Value::Text(s)) => {
            NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT)
                .map(WireValue::Timestamp)
                .map_err(|err| malformed(column_type, &s, &err))?
        }
        (
            ColumnType::Blob {
                subtype,
                segment_size,
            },
            Value::Blob(bytes),
        ) => WireValue::Blob(blobs.register_fetched(*subtype, *segment_size, bytes)),
        (
            ColumnType::Blob {
                subtype,
                segment_size,
            },
            Value::Text(s),
        ) => WireValue::Blob(blobs.register_fetched(*subtype, *segment_size, s.into_bytes())),
        (_, other) => {
            return Err(SqlMarshalError::ExecutionError(format!(
                "stored {} value cannot be read as {column_type}",
                storage_class(&other)
            )));
        }
    };
    Ok(wire)
}

fn storage_class(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Integer(_) => "INTEGER",
        Value::Real(_) => "REAL",
        Value::Text(_) => "TEXT",
        Value::Blob(_) => "BLOB",
    }
}

fn malformed(column_type: &ColumnType, stored: &str, err: &chrono::ParseError) -> SqlMarshalError {
    SqlMarshalError::ExecutionError(format!(
        "stored text '{stored}' is not a valid {column_type}: {err}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlobSubtype;

    #[test]
    fn out_of_width_integers_widen_to_bigint() {
        let mut blobs = BlobStore::default();
        let wire = wire_value(Value::Integer(100_000), &ColumnType::SmallInt, &mut blobs).unwrap();
        assert_eq!(wire, WireValue::BigInt(100_000));
    }

    #[test]
    fn temporal_text_is_parsed() {
        let mut blobs = BlobStore::default();
        let wire = wire_value(
            Value::Text("2006-01-01 01:01:01".into()),
            &ColumnType::Timestamp,
            &mut blobs,
        )
        .unwrap();
        let expected = NaiveDate::from_ymd_opt(2006, 1, 1)
            .and_then(|d| d.and_hms_opt(1, 1, 1))
            .unwrap();
        assert_eq!(wire, WireValue::Timestamp(expected));

        let err = wire_value(Value::Text("noon".into()), &ColumnType::Time, &mut blobs).unwrap_err();
        assert!(matches!(err, SqlMarshalError::ExecutionError(_)));
    }

    #[test]
    fn blob_content_is_staged() {
        let mut blobs = BlobStore::default();
        let column_type = ColumnType::Blob {
            subtype: BlobSubtype::Binary,
            segment_size: 2,
        };
        let wire = wire_value(Value::Blob(vec![1, 2, 3]), &column_type, &mut blobs).unwrap();
        let WireValue::Blob(id) = wire else {
            panic!("expected a blob id, got {wire:?}");
        };
        assert_eq!(blobs.shared(id).unwrap().as_slice(), &[1, 2, 3]);
    }
}
