use std::sync::Arc;

use rusqlite::ToSql;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};

use crate::binder::BoundValue;
use crate::error::SqlMarshalError;
use crate::types::WireValue;

use super::blobs::BlobStore;

pub(super) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(super) const TIME_FORMAT: &str = "%H:%M:%S%.f";
pub(super) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A bound parameter in the form rusqlite executes.
pub(super) enum SqliteParam {
    Value(Value),
    /// Staged blob content, bound by reference.
    Blob(Arc<Vec<u8>>),
}

impl ToSql for SqliteParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqliteParam::Value(value) => value.to_sql(),
            SqliteParam::Blob(bytes) => Ok(ToSqlOutput::Borrowed(ValueRef::Blob(bytes.as_slice()))),
        }
    }
}

/// Convert validated parameters into `SQLite` values.
///
/// # Errors
///
/// Returns `SqlMarshalError::ExecutionError` if a blob parameter refers to a blob that
/// is unknown or still open.
pub(super) fn convert(
    params: &[BoundValue],
    blobs: &BlobStore,
) -> Result<Vec<SqliteParam>, SqlMarshalError> {
    params
        .iter()
        .map(|param| wire_to_sqlite(param.wire(), blobs))
        .collect()
}

fn wire_to_sqlite(wire: &WireValue, blobs: &BlobStore) -> Result<SqliteParam, SqlMarshalError> {
    let value = match wire {
        WireValue::Null => Value::Null,
        WireValue::SmallInt(v) => Value::Integer(i64::from(*v)),
        WireValue::Integer(v) => Value::Integer(i64::from(*v)),
        WireValue::BigInt(v) => Value::Integer(*v),
        WireValue::Float(v) => Value::Real(f64::from(*v)),
        WireValue::Double(v) => Value::Real(*v),
        WireValue::Text(s) => Value::Text(s.clone()),
        WireValue::Date(d) => Value::Text(d.format(DATE_FORMAT).to_string()),
        WireValue::Time(t) => Value::Text(t.format(TIME_FORMAT).to_string()),
        WireValue::Timestamp(ts) => Value::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
        WireValue::BlobData(bytes) => Value::Blob(bytes.clone()),
        WireValue::Blob(id) => return blobs.shared(*id).map(SqliteParam::Blob),
    };
    Ok(SqliteParam::Value(value))
}
