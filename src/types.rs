use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::EngineBlobId;

mod column;

pub use column::{BlobSubtype, ColumnType, DEFAULT_SEGMENT_SIZE};

/// Values a caller hands to the driver, or gets back from a decoded row.
///
/// The variant is checked against the target [`ColumnType`] at bind time; nothing
/// is coerced implicitly:
/// ```rust
/// use sql_marshal::prelude::*;
///
/// let params = vec![
///     HostValue::Integer(1),
///     HostValue::Text("alice".into()),
///     HostValue::Null,
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostValue {
    /// SQL NULL
    Null,
    /// Integer value, wide enough to carry values that overflow BIGINT.
    ///
    /// The largest magnitude is about 1.7e38, which still fits FLOAT; a FLOAT
    /// overflow can only be expressed as a [`HostValue::Real`].
    Integer(i128),
    /// Floating point value (64-bit)
    Real(f64),
    /// Text/string value
    Text(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Calendar date without time-of-day
    Date(NaiveDate),
    /// Time-of-day, interpreted as UTC
    Time(NaiveTime),
    /// A point in time; equality compares the instant, not the offset
    Instant(DateTime<FixedOffset>),
}

impl HostValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<i128> {
        if let HostValue::Integer(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_int().and_then(|value| i64::try_from(value).ok())
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let HostValue::Real(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let HostValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        if let HostValue::Bytes(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        if let HostValue::Date(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_time(&self) -> Option<NaiveTime> {
        if let HostValue::Time(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_instant(&self) -> Option<DateTime<FixedOffset>> {
        if let HostValue::Instant(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    /// Short name of the variant, used in conversion error messages.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Integer(_) => "integer",
            HostValue::Real(_) => "real",
            HostValue::Text(_) => "text",
            HostValue::Bytes(_) => "bytes",
            HostValue::Date(_) => "date",
            HostValue::Time(_) => "time",
            HostValue::Instant(_) => "instant",
        }
    }
}

impl From<i16> for HostValue {
    fn from(value: i16) -> Self {
        HostValue::Integer(i128::from(value))
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        HostValue::Integer(i128::from(value))
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Integer(i128::from(value))
    }
}

impl From<i128> for HostValue {
    fn from(value: i128) -> Self {
        HostValue::Integer(value)
    }
}

impl From<f32> for HostValue {
    fn from(value: f32) -> Self {
        HostValue::Real(f64::from(value))
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        HostValue::Real(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Text(value.to_owned())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::Text(value)
    }
}

impl From<Vec<u8>> for HostValue {
    fn from(value: Vec<u8>) -> Self {
        HostValue::Bytes(value)
    }
}

impl From<&[u8]> for HostValue {
    fn from(value: &[u8]) -> Self {
        HostValue::Bytes(value.to_vec())
    }
}

impl From<NaiveDate> for HostValue {
    fn from(value: NaiveDate) -> Self {
        HostValue::Date(value)
    }
}

impl From<NaiveTime> for HostValue {
    fn from(value: NaiveTime) -> Self {
        HostValue::Time(value)
    }
}

impl From<DateTime<FixedOffset>> for HostValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        HostValue::Instant(value)
    }
}

impl From<DateTime<Utc>> for HostValue {
    fn from(value: DateTime<Utc>) -> Self {
        HostValue::Instant(value.into())
    }
}

impl From<DateTime<Local>> for HostValue {
    fn from(value: DateTime<Local>) -> Self {
        HostValue::Instant(value.into())
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(HostValue::Null, Into::into)
    }
}

/// A value in the representation handed to (or received from) the engine client.
///
/// Widths are already narrowed to the column type; temporal values are UTC.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    SmallInt(i16),
    Integer(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    /// Reference to a blob living on the engine side
    Blob(EngineBlobId),
    /// Blob content after it was streamed back through a `BlobChannel`
    BlobData(Vec<u8>),
}

impl WireValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::SmallInt(_) => "smallint",
            WireValue::Integer(_) => "integer",
            WireValue::BigInt(_) => "bigint",
            WireValue::Float(_) => "float",
            WireValue::Double(_) => "double",
            WireValue::Text(_) => "text",
            WireValue::Date(_) => "date",
            WireValue::Time(_) => "time",
            WireValue::Timestamp(_) => "timestamp",
            WireValue::Blob(_) => "blob reference",
            WireValue::BlobData(_) => "blob data",
        }
    }
}
