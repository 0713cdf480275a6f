use chrono::{TimeZone, Utc};

use crate::error::SqlMarshalError;
use crate::types::{ColumnType, HostValue, WireValue};

pub(super) fn encode_date(value: &HostValue) -> Result<WireValue, SqlMarshalError> {
    match value {
        HostValue::Date(date) => Ok(WireValue::Date(*date)),
        HostValue::Integer(_) | HostValue::Real(_) => Err(SqlMarshalError::InvalidArgument(
            format!(
                "a bare {} is not a calendar date; DATE needs a year, month and day",
                value.kind_name()
            ),
        )),
        other => Err(mismatch(other, ColumnType::Date)),
    }
}

/// Instants are shifted to UTC before the time-of-day is taken.
pub(super) fn encode_time(value: &HostValue) -> Result<WireValue, SqlMarshalError> {
    match value {
        HostValue::Time(time) => Ok(WireValue::Time(*time)),
        HostValue::Instant(instant) => Ok(WireValue::Time(instant.with_timezone(&Utc).time())),
        other => Err(mismatch(other, ColumnType::Time)),
    }
}

pub(super) fn encode_timestamp(value: &HostValue) -> Result<WireValue, SqlMarshalError> {
    match value {
        HostValue::Instant(instant) => Ok(WireValue::Timestamp(instant.naive_utc())),
        other => Err(mismatch(other, ColumnType::Timestamp)),
    }
}

pub(super) fn decode_date(wire: WireValue) -> Result<HostValue, SqlMarshalError> {
    match wire {
        WireValue::Date(date) => Ok(HostValue::Date(date)),
        other => Err(unexpected_wire(&other, ColumnType::Date)),
    }
}

pub(super) fn decode_time(wire: WireValue) -> Result<HostValue, SqlMarshalError> {
    match wire {
        WireValue::Time(time) => Ok(HostValue::Time(time)),
        other => Err(unexpected_wire(&other, ColumnType::Time)),
    }
}

/// Timestamps travel as naive UTC and come back carrying a `+00:00` offset.
pub(super) fn decode_timestamp(wire: WireValue) -> Result<HostValue, SqlMarshalError> {
    match wire {
        WireValue::Timestamp(naive) => Ok(HostValue::Instant(Utc.from_utc_datetime(&naive).into())),
        other => Err(unexpected_wire(&other, ColumnType::Timestamp)),
    }
}

fn mismatch(value: &HostValue, column_type: ColumnType) -> SqlMarshalError {
    SqlMarshalError::TypeMismatch(format!(
        "cannot encode {} value as {column_type}",
        value.kind_name()
    ))
}

fn unexpected_wire(wire: &WireValue, column_type: ColumnType) -> SqlMarshalError {
    SqlMarshalError::TypeMismatch(format!(
        "engine returned a {} value for a {column_type} column",
        wire.kind_name()
    ))
}
