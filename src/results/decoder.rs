use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::codec::ScalarCodec;
use crate::engine::{RawRow, ResultColumn};
use crate::error::SqlMarshalError;
use crate::types::ColumnType;

use super::row::{Row, build_index};

/// Decodes raw engine rows for one statement's result columns.
///
/// Names are uppercased once, up front; two columns that normalize to the same name
/// are rejected so that name lookup is never ambiguous.
#[derive(Debug, Clone)]
pub struct RowDecoder {
    codec: ScalarCodec,
    column_types: Arc<Vec<ColumnType>>,
    column_names: Arc<Vec<String>>,
    column_index: Arc<HashMap<String, usize>>,
}

impl RowDecoder {
    /// # Errors
    /// Returns `InvalidArgument` if two columns share a name after uppercasing.
    pub fn new(codec: ScalarCodec, columns: &[ResultColumn]) -> Result<Self, SqlMarshalError> {
        let column_types = columns.iter().map(|column| column.column_type).collect();
        let column_names: Vec<&str> = columns.iter().map(|column| column.name.as_str()).collect();
        Self::from_parts(codec, column_types, &column_names)
    }

    /// # Errors
    /// Returns `InvalidArgument` if the two lists differ in length or two names
    /// collide after uppercasing.
    pub fn from_parts<S: AsRef<str>>(
        codec: ScalarCodec,
        column_types: Vec<ColumnType>,
        column_names: &[S],
    ) -> Result<Self, SqlMarshalError> {
        if column_types.len() != column_names.len() {
            return Err(SqlMarshalError::InvalidArgument(format!(
                "{} column type(s) but {} column name(s)",
                column_types.len(),
                column_names.len()
            )));
        }

        let names: Vec<String> = column_names
            .iter()
            .map(|name| name.as_ref().to_uppercase())
            .collect();
        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(SqlMarshalError::InvalidArgument(format!(
                    "duplicate result column name {name}"
                )));
            }
        }

        let index = build_index(&names);
        Ok(Self {
            codec,
            column_types: Arc::new(column_types),
            column_names: Arc::new(names),
            column_index: Arc::new(index),
        })
    }

    #[must_use]
    pub fn column_types(&self) -> &[ColumnType] {
        &self.column_types
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub(crate) fn shared_column_names(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.column_names)
    }

    pub(crate) fn column_label(&self, index: usize) -> String {
        match (self.column_names.get(index), self.column_types.get(index)) {
            (Some(name), Some(column_type)) => format!("column {name} ({column_type})"),
            _ => format!("column #{}", index + 1),
        }
    }

    /// Decode one raw row. Blob columns must already carry their content.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if the row width differs from the column count, or the
    /// first column's decode error prefixed with its name and type.
    pub fn decode(&self, raw: RawRow) -> Result<Row, SqlMarshalError> {
        if raw.len() != self.column_types.len() {
            return Err(SqlMarshalError::InvalidArgument(format!(
                "row has {} value(s) but {} column(s) were described",
                raw.len(),
                self.column_types.len()
            )));
        }

        let values = raw
            .into_iter()
            .zip(self.column_types.iter())
            .enumerate()
            .map(|(index, (wire, column_type))| {
                self.codec
                    .decode(wire, column_type)
                    .map_err(|err| err.with_context(self.column_label(index)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Row::from_shared(
            Arc::clone(&self.column_names),
            Arc::clone(&self.column_index),
            values,
        ))
    }
}

/// Decode a single row without keeping a decoder around.
///
/// # Errors
/// Same as [`RowDecoder::from_parts`] and [`RowDecoder::decode`].
pub fn decode_row<S: AsRef<str>>(
    codec: &ScalarCodec,
    raw: RawRow,
    column_types: &[ColumnType],
    column_names: &[S],
) -> Result<Row, SqlMarshalError> {
    RowDecoder::from_parts(*codec, column_types.to_vec(), column_names)?.decode(raw)
}
