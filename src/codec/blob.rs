use crate::error::SqlMarshalError;
use crate::types::{BlobSubtype, HostValue, WireValue};

pub(super) fn payload(
    value: &HostValue,
    subtype: BlobSubtype,
) -> Result<Option<&[u8]>, SqlMarshalError> {
    match (value, subtype) {
        (HostValue::Null, _) => Ok(None),
        (HostValue::Text(text), _) => Ok(Some(text.as_bytes())),
        (HostValue::Bytes(bytes), BlobSubtype::Binary) => Ok(Some(bytes)),
        (HostValue::Bytes(bytes), BlobSubtype::Text) => match std::str::from_utf8(bytes) {
            Ok(_) => Ok(Some(bytes)),
            Err(err) => Err(SqlMarshalError::TypeMismatch(format!(
                "bytes are not valid UTF-8 for a BLOB SUB_TYPE TEXT: {err}"
            ))),
        },
        (other, _) => Err(SqlMarshalError::TypeMismatch(format!(
            "cannot store {} value in a BLOB SUB_TYPE {subtype}",
            other.kind_name()
        ))),
    }
}

pub(super) fn decode(wire: WireValue, subtype: BlobSubtype) -> Result<HostValue, SqlMarshalError> {
    match (wire, subtype) {
        (WireValue::BlobData(bytes), BlobSubtype::Binary) => Ok(HostValue::Bytes(bytes)),
        (WireValue::BlobData(bytes), BlobSubtype::Text) => String::from_utf8(bytes)
            .map(HostValue::Text)
            .map_err(|err| {
                SqlMarshalError::TypeMismatch(format!(
                    "BLOB SUB_TYPE TEXT content is not valid UTF-8: {err}"
                ))
            }),
        (WireValue::Text(text), BlobSubtype::Text) => Ok(HostValue::Text(text)),
        (WireValue::Text(text), BlobSubtype::Binary) => Ok(HostValue::Bytes(text.into_bytes())),
        (WireValue::Blob(id), _) => Err(SqlMarshalError::InvalidArgument(format!(
            "{id} must be streamed through a BlobChannel before it can be decoded"
        ))),
        (other, _) => Err(SqlMarshalError::TypeMismatch(format!(
            "engine returned a {} value for a BLOB SUB_TYPE {subtype} column",
            other.kind_name()
        ))),
    }
}
