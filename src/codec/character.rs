use crate::config::LengthSemantics;
use crate::error::SqlMarshalError;
use crate::types::{ColumnType, HostValue, WireValue};

pub(super) fn encode_fixed(
    value: &HostValue,
    length: usize,
    semantics: LengthSemantics,
) -> Result<WireValue, SqlMarshalError> {
    let column_type = ColumnType::FixedChar { length };
    let text = text_only(value, column_type)?;
    check_length(text, length, semantics, column_type)?;
    Ok(WireValue::Text(text.to_owned()))
}

pub(super) fn encode_varying(
    value: &HostValue,
    max_length: usize,
    semantics: LengthSemantics,
) -> Result<WireValue, SqlMarshalError> {
    let column_type = ColumnType::VarChar { max_length };
    let text = text_only(value, column_type)?;
    check_length(text, max_length, semantics, column_type)?;
    Ok(WireValue::Text(text.to_owned()))
}

pub(super) fn decode_fixed(
    wire: WireValue,
    length: usize,
    semantics: LengthSemantics,
) -> Result<HostValue, SqlMarshalError> {
    match wire {
        WireValue::Text(mut text) => {
            let current = measure(&text, semantics);
            if current < length {
                text.push_str(&" ".repeat(length - current));
            }
            Ok(HostValue::Text(text))
        }
        other => Err(unexpected_wire(&other, &ColumnType::FixedChar { length })),
    }
}

pub(super) fn decode_varying(
    wire: WireValue,
    column_type: &ColumnType,
) -> Result<HostValue, SqlMarshalError> {
    match wire {
        WireValue::Text(text) => Ok(HostValue::Text(text)),
        other => Err(unexpected_wire(&other, column_type)),
    }
}

pub(super) fn measure(text: &str, semantics: LengthSemantics) -> usize {
    match semantics {
        LengthSemantics::Characters => text.chars().count(),
        LengthSemantics::Bytes => text.len(),
    }
}

// Character columns never stringify other kinds; anything but text is a length-class error.
fn text_only(value: &HostValue, column_type: ColumnType) -> Result<&str, SqlMarshalError> {
    match value {
        HostValue::Text(text) => Ok(text),
        other => Err(SqlMarshalError::RangeOverflow(format!(
            "{} value cannot be stored in {column_type} without converting it to text",
            other.kind_name()
        ))),
    }
}

fn check_length(
    text: &str,
    limit: usize,
    semantics: LengthSemantics,
    column_type: ColumnType,
) -> Result<(), SqlMarshalError> {
    let measured = measure(text, semantics);
    if measured > limit {
        let unit = match semantics {
            LengthSemantics::Characters => "characters",
            LengthSemantics::Bytes => "bytes",
        };
        return Err(SqlMarshalError::RangeOverflow(format!(
            "string of {measured} {unit} exceeds {column_type}"
        )));
    }
    Ok(())
}

fn unexpected_wire(wire: &WireValue, column_type: &ColumnType) -> SqlMarshalError {
    SqlMarshalError::TypeMismatch(format!(
        "engine returned a {} value for a {column_type} column",
        wire.kind_name()
    ))
}
