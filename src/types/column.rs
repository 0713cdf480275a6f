use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SqlMarshalError;

/// Segment size assumed for a BLOB column declared without `SEGMENT SIZE`.
pub const DEFAULT_SEGMENT_SIZE: usize = 80;

/// Content interpretation of a BLOB column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlobSubtype {
    /// Character data (`SUB_TYPE TEXT`, numeric subtype 1)
    Text,
    /// Untyped bytes (`SUB_TYPE BINARY`, numeric subtype 0)
    Binary,
}

impl fmt::Display for BlobSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobSubtype::Text => f.write_str("TEXT"),
            BlobSubtype::Binary => f.write_str("BINARY"),
        }
    }
}

/// Declared SQL type of a statement parameter or result column.
///
/// Derived once when the engine describes a statement and read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// 32-bit signed integer
    Integer,
    /// 16-bit signed integer
    SmallInt,
    /// 64-bit signed integer
    BigInt,
    /// Single-precision float
    Float,
    /// Double-precision float
    Double,
    /// `CHAR(n)`, space padded to `length`
    FixedChar { length: usize },
    /// `VARCHAR(n)`
    VarChar { max_length: usize },
    Date,
    Time,
    Timestamp,
    /// Large object streamed in segments
    Blob {
        subtype: BlobSubtype,
        segment_size: usize,
    },
}

impl ColumnType {
    #[must_use]
    pub fn is_blob(&self) -> bool {
        matches!(self, ColumnType::Blob { .. })
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Integer
                | ColumnType::SmallInt
                | ColumnType::BigInt
                | ColumnType::Float
                | ColumnType::Double
        )
    }

    #[must_use]
    pub fn is_character(&self) -> bool {
        matches!(self, ColumnType::FixedChar { .. } | ColumnType::VarChar { .. })
    }

    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnType::Date | ColumnType::Time | ColumnType::Timestamp)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Integer => f.write_str("INTEGER"),
            ColumnType::SmallInt => f.write_str("SMALLINT"),
            ColumnType::BigInt => f.write_str("BIGINT"),
            ColumnType::Float => f.write_str("FLOAT"),
            ColumnType::Double => f.write_str("DOUBLE PRECISION"),
            ColumnType::FixedChar { length } => write!(f, "CHAR({length})"),
            ColumnType::VarChar { max_length } => write!(f, "VARCHAR({max_length})"),
            ColumnType::Date => f.write_str("DATE"),
            ColumnType::Time => f.write_str("TIME"),
            ColumnType::Timestamp => f.write_str("TIMESTAMP"),
            ColumnType::Blob {
                subtype,
                segment_size,
            } => write!(f, "BLOB SUB_TYPE {subtype} SEGMENT SIZE {segment_size}"),
        }
    }
}

/// Parses a declared type as written in DDL, e.g. `VARCHAR(10)`, `DOUBLE PRECISION`
/// or `blob sub_type text segment size 1000`.
impl FromStr for ColumnType {
    type Err = SqlMarshalError;

    fn from_str(declared: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(declared);
        let unsupported =
            || SqlMarshalError::InvalidArgument(format!("unsupported column type '{declared}'"));

        let (head, length) = split_length(&normalized).ok_or_else(unsupported)?;
        let words: Vec<&str> = head.split_whitespace().collect();

        let column_type = match (words.as_slice(), length) {
            (["INTEGER" | "INT"], None) => ColumnType::Integer,
            (["SMALLINT"], None) => ColumnType::SmallInt,
            (["BIGINT"], None) => ColumnType::BigInt,
            (["FLOAT" | "REAL"], None) => ColumnType::Float,
            (["DOUBLE"] | ["DOUBLE", "PRECISION"], None) => ColumnType::Double,
            (["CHAR" | "CHARACTER"], length) => ColumnType::FixedChar {
                length: positive(length.unwrap_or(1), declared)?,
            },
            (["VARCHAR"] | ["CHARACTER", "VARYING"], Some(max)) => ColumnType::VarChar {
                max_length: positive(max, declared)?,
            },
            (["DATE"], None) => ColumnType::Date,
            (["TIME"], None) => ColumnType::Time,
            (["TIMESTAMP"], None) => ColumnType::Timestamp,
            (["BLOB", rest @ ..], length) => parse_blob(rest, length, declared)?,
            _ => return Err(unsupported()),
        };
        Ok(column_type)
    }
}

fn normalize(declared: &str) -> String {
    declared
        .trim()
        .trim_end_matches(';')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

// Splits `VARCHAR(10)` into ("VARCHAR", Some(10)); text after the closing paren is rejected.
fn split_length(normalized: &str) -> Option<(String, Option<usize>)> {
    match normalized.find('(') {
        None => Some((normalized.to_string(), None)),
        Some(open) => {
            let close = normalized.rfind(')')?;
            if close + 1 != normalized.len() || close < open {
                return None;
            }
            let length = normalized[open + 1..close].trim().parse::<usize>().ok()?;
            Some((normalized[..open].trim().to_string(), Some(length)))
        }
    }
}

fn positive(length: usize, declared: &str) -> Result<usize, SqlMarshalError> {
    if length == 0 {
        return Err(SqlMarshalError::InvalidArgument(format!(
            "column type '{declared}' declares a zero length"
        )));
    }
    Ok(length)
}

// Accepts both `SEGMENT SIZE 80` and `SEGMENT SIZE(80)`; SQLite only allows the latter.
fn parse_blob(
    mut rest: &[&str],
    trailing_length: Option<usize>,
    declared: &str,
) -> Result<ColumnType, SqlMarshalError> {
    let mut subtype = BlobSubtype::Binary;
    let mut segment_size = DEFAULT_SEGMENT_SIZE;
    let malformed =
        || SqlMarshalError::InvalidArgument(format!("malformed blob declaration '{declared}'"));

    if let Some(size) = trailing_length {
        match rest {
            [head @ .., "SEGMENT", "SIZE"] => {
                segment_size = positive(size, declared)?;
                rest = head;
            }
            _ => return Err(malformed()),
        }
    }

    while !rest.is_empty() {
        match rest {
            ["SUB_TYPE", value, tail @ ..] => {
                subtype = match *value {
                    "TEXT" | "1" => BlobSubtype::Text,
                    "BINARY" | "0" => BlobSubtype::Binary,
                    _ => return Err(malformed()),
                };
                rest = tail;
            }
            ["SEGMENT", "SIZE", value, tail @ ..] => {
                let size = value.parse::<usize>().map_err(|_| malformed())?;
                segment_size = positive(size, declared)?;
                rest = tail;
            }
            _ => return Err(malformed()),
        }
    }

    Ok(ColumnType::Blob {
        subtype,
        segment_size,
    })
}
