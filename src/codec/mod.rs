//! Host ⇄ wire conversion for the fixed set of column types.
//!
//! Encoding validates before it converts: a value that would be truncated, rounded
//! into a different kind, or silently stringified is rejected with a
//! `TypeMismatch`, `RangeOverflow` or `InvalidArgument` error instead.

mod blob;
mod character;
mod numeric;
mod temporal;

use crate::config::{LengthSemantics, MarshalOptions};
use crate::error::SqlMarshalError;
use crate::types::{BlobSubtype, ColumnType, HostValue, WireValue};

/// Stateless scalar codec.
///
/// ```rust
/// use sql_marshal::prelude::*;
///
/// let codec = ScalarCodec::default();
/// let wire = codec.encode(&HostValue::Integer(7), &ColumnType::SmallInt)?;
/// assert_eq!(wire, WireValue::SmallInt(7));
///
/// let err = codec
///     .encode(&HostValue::Integer(100_000), &ColumnType::SmallInt)
///     .unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::RangeOverflow);
/// # Ok::<(), SqlMarshalError>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScalarCodec {
    length_semantics: LengthSemantics,
}

impl ScalarCodec {
    #[must_use]
    pub fn new(length_semantics: LengthSemantics) -> Self {
        Self { length_semantics }
    }

    #[must_use]
    pub fn from_options(opts: &MarshalOptions) -> Self {
        Self::new(opts.length_semantics)
    }

    #[must_use]
    pub fn length_semantics(&self) -> LengthSemantics {
        self.length_semantics
    }

    /// Convert a host value into the wire form for `column_type`.
    ///
    /// NULL encodes to a wire NULL for every column type.
    ///
    /// # Errors
    /// - `TypeMismatch` when the value's kind cannot target the column type
    /// - `RangeOverflow` when the value does not fit the column
    /// - `InvalidArgument` for a bare number bound to DATE, or for BLOB columns,
    ///   which are written through a `BlobChannel`
    pub fn encode(
        &self,
        value: &HostValue,
        column_type: &ColumnType,
    ) -> Result<WireValue, SqlMarshalError> {
        if value.is_null() {
            return Ok(WireValue::Null);
        }
        match *column_type {
            ColumnType::SmallInt => numeric::encode_smallint(value),
            ColumnType::Integer => numeric::encode_integer(value),
            ColumnType::BigInt => numeric::encode_bigint(value),
            ColumnType::Float => numeric::encode_float(value),
            ColumnType::Double => numeric::encode_double(value),
            ColumnType::FixedChar { length } => {
                character::encode_fixed(value, length, self.length_semantics)
            }
            ColumnType::VarChar { max_length } => {
                character::encode_varying(value, max_length, self.length_semantics)
            }
            ColumnType::Date => temporal::encode_date(value),
            ColumnType::Time => temporal::encode_time(value),
            ColumnType::Timestamp => temporal::encode_timestamp(value),
            ColumnType::Blob { .. } => Err(SqlMarshalError::InvalidArgument(
                "BLOB values are written through a BlobChannel, not encoded inline".into(),
            )),
        }
    }

    /// Convert an engine value back into a host value.
    ///
    /// `CHAR(n)` values come back right-padded with spaces to `n`; BLOB columns must
    /// already carry their streamed content (`WireValue::BlobData`).
    ///
    /// # Errors
    /// Returns `TypeMismatch` if the engine produced a value whose kind does not match
    /// the declared column type, or `RangeOverflow` if it does not fit the declared width.
    pub fn decode(
        &self,
        wire: WireValue,
        column_type: &ColumnType,
    ) -> Result<HostValue, SqlMarshalError> {
        if wire.is_null() {
            return Ok(HostValue::Null);
        }
        match *column_type {
            ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt => {
                numeric::decode_integral(wire, column_type)
            }
            ColumnType::Float | ColumnType::Double => numeric::decode_real(wire, column_type),
            ColumnType::FixedChar { length } => {
                character::decode_fixed(wire, length, self.length_semantics)
            }
            ColumnType::VarChar { .. } => character::decode_varying(wire, column_type),
            ColumnType::Date => temporal::decode_date(wire),
            ColumnType::Time => temporal::decode_time(wire),
            ColumnType::Timestamp => temporal::decode_timestamp(wire),
            ColumnType::Blob { subtype, .. } => blob::decode(wire, subtype),
        }
    }

    /// Validate a value bound to a BLOB column and borrow its bytes.
    ///
    /// Returns `None` for NULL, in which case no blob is created.
    ///
    /// # Errors
    /// Returns `TypeMismatch` for non text/bytes values, or for bytes that are not
    /// valid UTF-8 when the subtype is TEXT.
    pub fn blob_payload<'v>(
        &self,
        value: &'v HostValue,
        subtype: BlobSubtype,
    ) -> Result<Option<&'v [u8]>, SqlMarshalError> {
        blob::payload(value, subtype)
    }
}
