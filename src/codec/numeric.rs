use crate::error::SqlMarshalError;
use crate::types::{ColumnType, HostValue, WireValue};

pub(super) fn encode_smallint(value: &HostValue) -> Result<WireValue, SqlMarshalError> {
    let wide = integral(value, ColumnType::SmallInt)?;
    i16::try_from(wide)
        .map(WireValue::SmallInt)
        .map_err(|_| out_of_range(wide, ColumnType::SmallInt))
}

pub(super) fn encode_integer(value: &HostValue) -> Result<WireValue, SqlMarshalError> {
    let wide = integral(value, ColumnType::Integer)?;
    i32::try_from(wide)
        .map(WireValue::Integer)
        .map_err(|_| out_of_range(wide, ColumnType::Integer))
}

pub(super) fn encode_bigint(value: &HostValue) -> Result<WireValue, SqlMarshalError> {
    let wide = integral(value, ColumnType::BigInt)?;
    i64::try_from(wide)
        .map(WireValue::BigInt)
        .map_err(|_| out_of_range(wide, ColumnType::BigInt))
}

#[allow(clippy::cast_possible_truncation)]
pub(super) fn encode_float(value: &HostValue) -> Result<WireValue, SqlMarshalError> {
    let wide = real(value, ColumnType::Float)?;
    if wide.abs() > f64::from(f32::MAX) {
        return Err(SqlMarshalError::RangeOverflow(format!(
            "{wide:e} exceeds the single-precision range of FLOAT"
        )));
    }
    let narrow = wide as f32;
    if narrow == 0.0 && wide != 0.0 {
        return Err(SqlMarshalError::RangeOverflow(format!(
            "{wide:e} is too small for the single-precision range of FLOAT"
        )));
    }
    Ok(WireValue::Float(narrow))
}

pub(super) fn encode_double(value: &HostValue) -> Result<WireValue, SqlMarshalError> {
    real(value, ColumnType::Double).map(WireValue::Double)
}

pub(super) fn decode_integral(
    wire: WireValue,
    column_type: &ColumnType,
) -> Result<HostValue, SqlMarshalError> {
    let wide = match wire {
        WireValue::SmallInt(v) => i128::from(v),
        WireValue::Integer(v) => i128::from(v),
        WireValue::BigInt(v) => i128::from(v),
        other => return Err(unexpected_wire(&other, column_type)),
    };
    let (min, max) = bounds(column_type);
    if wide < min || wide > max {
        return Err(SqlMarshalError::RangeOverflow(format!(
            "engine returned {wide}, outside the {column_type} range [{min}, {max}]"
        )));
    }
    Ok(HostValue::Integer(wide))
}

#[allow(clippy::cast_precision_loss)]
pub(super) fn decode_real(
    wire: WireValue,
    column_type: &ColumnType,
) -> Result<HostValue, SqlMarshalError> {
    match wire {
        WireValue::Float(v) => Ok(HostValue::Real(f64::from(v))),
        WireValue::Double(v) => Ok(HostValue::Real(v)),
        WireValue::SmallInt(v) => Ok(HostValue::Real(f64::from(v))),
        WireValue::Integer(v) => Ok(HostValue::Real(f64::from(v))),
        WireValue::BigInt(v) => Ok(HostValue::Real(v as f64)),
        other => Err(unexpected_wire(&other, column_type)),
    }
}

fn integral(value: &HostValue, column_type: ColumnType) -> Result<i128, SqlMarshalError> {
    match value {
        HostValue::Integer(v) => Ok(*v),
        HostValue::Real(v) => real_to_integral(*v, column_type),
        other => Err(not_numeric(other, column_type)),
    }
}

// A real only binds to an integer column when it converts without losing anything.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn real_to_integral(value: f64, column_type: ColumnType) -> Result<i128, SqlMarshalError> {
    if !value.is_finite() {
        return Err(SqlMarshalError::RangeOverflow(format!(
            "{value} is not a finite number and cannot be stored in {column_type}"
        )));
    }
    if value.fract() != 0.0 {
        return Err(SqlMarshalError::RangeOverflow(format!(
            "{value} has a fractional part and would be truncated by {column_type}"
        )));
    }
    if value < i128::MIN as f64 || value >= i128::MAX as f64 {
        return Err(SqlMarshalError::RangeOverflow(format!(
            "{value:e} is outside the {column_type} range"
        )));
    }
    Ok(value as i128)
}

#[allow(clippy::cast_precision_loss)]
fn real(value: &HostValue, column_type: ColumnType) -> Result<f64, SqlMarshalError> {
    let wide = match value {
        HostValue::Integer(v) => *v as f64,
        HostValue::Real(v) => *v,
        other => return Err(not_numeric(other, column_type)),
    };
    if !wide.is_finite() {
        return Err(SqlMarshalError::RangeOverflow(format!(
            "{wide} is not a finite number and cannot be stored in {column_type}"
        )));
    }
    Ok(wide)
}

fn bounds(column_type: &ColumnType) -> (i128, i128) {
    match column_type {
        ColumnType::SmallInt => (i128::from(i16::MIN), i128::from(i16::MAX)),
        ColumnType::Integer => (i128::from(i32::MIN), i128::from(i32::MAX)),
        _ => (i128::from(i64::MIN), i128::from(i64::MAX)),
    }
}

fn out_of_range(value: i128, column_type: ColumnType) -> SqlMarshalError {
    let (min, max) = bounds(&column_type);
    SqlMarshalError::RangeOverflow(format!(
        "{value} is outside the {column_type} range [{min}, {max}]"
    ))
}

fn not_numeric(value: &HostValue, column_type: ColumnType) -> SqlMarshalError {
    SqlMarshalError::TypeMismatch(format!(
        "cannot encode {} value as {column_type}",
        value.kind_name()
    ))
}

fn unexpected_wire(wire: &WireValue, column_type: &ColumnType) -> SqlMarshalError {
    SqlMarshalError::TypeMismatch(format!(
        "engine returned a {} value for a {column_type} column",
        wire.kind_name()
    ))
}
