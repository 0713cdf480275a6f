//! Binding host values to a statement's declared parameter types.

use tracing::debug;

use crate::blob::BlobChannel;
use crate::codec::ScalarCodec;
use crate::engine::EngineClient;
use crate::error::SqlMarshalError;
use crate::types::{BlobSubtype, ColumnType, HostValue, WireValue};

/// A validated parameter, ready for the engine.
///
/// Only [`ParameterBinder`] creates these, so every value an engine receives has
/// passed the codec for its column type.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundValue {
    column_type: ColumnType,
    wire: WireValue,
}

impl BoundValue {
    #[must_use]
    pub fn column_type(&self) -> &ColumnType {
        &self.column_type
    }

    #[must_use]
    pub fn wire(&self) -> &WireValue {
        &self.wire
    }

    #[must_use]
    pub fn into_wire(self) -> WireValue {
        self.wire
    }
}

// A parameter that passed validation but whose blob has not been written yet.
enum Staged<'v> {
    Ready(WireValue),
    Blob {
        subtype: BlobSubtype,
        segment_size: usize,
        bytes: &'v [u8],
    },
}

/// Routes each parameter to the scalar codec or the blob channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParameterBinder {
    codec: ScalarCodec,
}

impl ParameterBinder {
    #[must_use]
    pub fn new(codec: ScalarCodec) -> Self {
        Self { codec }
    }

    #[must_use]
    pub fn codec(&self) -> &ScalarCodec {
        &self.codec
    }

    /// Validate every parameter without touching the engine.
    ///
    /// # Errors
    /// Returns `InvalidArgument` on an arity mismatch, otherwise the first
    /// parameter's conversion error prefixed with its position and type.
    pub fn validate(
        &self,
        param_types: &[ColumnType],
        values: &[HostValue],
    ) -> Result<(), SqlMarshalError> {
        self.stage(param_types, values).map(|_| ())
    }

    /// Bind `values` to `param_types`.
    ///
    /// All parameters are validated before anything reaches the engine. Blob
    /// parameters are then written in full through `blobs`, so the returned values
    /// refer to closed engine blobs.
    ///
    /// # Errors
    /// Returns `InvalidArgument` on an arity mismatch, the first parameter's
    /// `TypeMismatch`/`RangeOverflow`/`InvalidArgument`, or the engine's error if a
    /// blob write fails.
    pub fn bind<E: EngineClient + ?Sized>(
        &self,
        engine: &mut E,
        blobs: &mut BlobChannel,
        param_types: &[ColumnType],
        values: &[HostValue],
    ) -> Result<Vec<BoundValue>, SqlMarshalError> {
        let staged = self.stage(param_types, values)?;

        let mut bound = Vec::with_capacity(staged.len());
        for (position, (column_type, staged)) in param_types.iter().zip(staged).enumerate() {
            let wire = match staged {
                Staged::Ready(wire) => wire,
                Staged::Blob {
                    subtype,
                    segment_size,
                    bytes,
                } => {
                    let blob = blobs
                        .write_all(engine, subtype, segment_size, bytes)
                        .map_err(|err| err.with_context(param_label(position, column_type)))?;
                    WireValue::Blob(blob)
                }
            };
            bound.push(BoundValue {
                column_type: *column_type,
                wire,
            });
        }

        debug!(params = bound.len(), "parameters bound");
        Ok(bound)
    }

    fn stage<'v>(
        &self,
        param_types: &[ColumnType],
        values: &'v [HostValue],
    ) -> Result<Vec<Staged<'v>>, SqlMarshalError> {
        if param_types.len() != values.len() {
            return Err(SqlMarshalError::InvalidArgument(format!(
                "statement expects {} parameter(s), got {}",
                param_types.len(),
                values.len()
            )));
        }

        param_types
            .iter()
            .zip(values)
            .enumerate()
            .map(|(position, (column_type, value))| {
                self.stage_one(column_type, value)
                    .map_err(|err| err.with_context(param_label(position, column_type)))
            })
            .collect()
    }

    fn stage_one<'v>(
        &self,
        column_type: &ColumnType,
        value: &'v HostValue,
    ) -> Result<Staged<'v>, SqlMarshalError> {
        match *column_type {
            ColumnType::Blob {
                subtype,
                segment_size,
            } => Ok(match self.codec.blob_payload(value, subtype)? {
                Some(bytes) => Staged::Blob {
                    subtype,
                    segment_size,
                    bytes,
                },
                None => Staged::Ready(WireValue::Null),
            }),
            _ => self.codec.encode(value, column_type).map(Staged::Ready),
        }
    }
}

fn param_label(position: usize, column_type: &ColumnType) -> String {
    format!("parameter {} ({column_type})", position + 1)
}
