//! The engine-client seam.
//!
//! Everything below this trait (transport, SQL planning, cursor mechanics) belongs to
//! the database engine. The marshalling core only needs statement descriptions, a way
//! to run a bound statement, transaction control and segmented blob I/O.

use std::fmt;
use std::sync::Arc;

use crate::binder::BoundValue;
use crate::error::SqlMarshalError;
use crate::types::{BlobSubtype, ColumnType, WireValue};

/// Engine-assigned identifier of a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EngineBlobId(pub u64);

impl fmt::Display for EngineBlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blob#{}", self.0)
    }
}

/// Name and declared type of one result column.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn {
    pub name: String,
    pub column_type: ColumnType,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// A statement as described by the engine.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    sql: Arc<String>,
    param_types: Arc<Vec<ColumnType>>,
    result_columns: Arc<Vec<ResultColumn>>,
}

impl PreparedStatement {
    #[must_use]
    pub fn new(
        sql: impl Into<String>,
        param_types: Vec<ColumnType>,
        result_columns: Vec<ResultColumn>,
    ) -> Self {
        Self {
            sql: Arc::new(sql.into()),
            param_types: Arc::new(param_types),
            result_columns: Arc::new(result_columns),
        }
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub fn param_types(&self) -> &[ColumnType] {
        &self.param_types
    }

    #[must_use]
    pub fn result_columns(&self) -> &[ResultColumn] {
        &self.result_columns
    }

    /// True when executing the statement yields rows.
    #[must_use]
    pub fn returns_rows(&self) -> bool {
        !self.result_columns.is_empty()
    }
}

/// One row as returned by the engine, in declared column order.
pub type RawRow = Vec<WireValue>;

/// Lazy, finite, forward-only sequence of raw rows.
pub struct RawRows {
    rows: Box<dyn Iterator<Item = Result<RawRow, SqlMarshalError>>>,
    rows_affected: usize,
}

impl RawRows {
    pub fn new(
        rows: impl Iterator<Item = Result<RawRow, SqlMarshalError>> + 'static,
        rows_affected: usize,
    ) -> Self {
        Self {
            rows: Box::new(rows),
            rows_affected,
        }
    }

    /// A result with no rows, as produced by DML.
    #[must_use]
    pub fn empty(rows_affected: usize) -> Self {
        Self::new(std::iter::empty(), rows_affected)
    }

    #[must_use]
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        let count = rows.len();
        Self::new(rows.into_iter().map(Ok), count)
    }

    /// Rows changed by DML, or rows produced by a query.
    #[must_use]
    pub fn rows_affected(&self) -> usize {
        self.rows_affected
    }
}

impl Iterator for RawRows {
    type Item = Result<RawRow, SqlMarshalError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}

impl fmt::Debug for RawRows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRows")
            .field("rows_affected", &self.rows_affected)
            .finish_non_exhaustive()
    }
}

/// Readable side of an engine blob.
pub trait SegmentStream {
    /// Next chunk of the blob, or `None` once the end has been reached.
    ///
    /// # Errors
    /// Returns `SqlMarshalError` if the engine fails to deliver the segment.
    fn next_segment(&mut self) -> Result<Option<Vec<u8>>, SqlMarshalError>;
}

/// Operations the marshalling core needs from a database engine.
///
/// Calls are synchronous and may block; an implementation is free to buffer rows or
/// segments internally as long as the observable sequence is preserved.
pub trait EngineClient {
    /// Describe a statement's parameters and result columns.
    ///
    /// # Errors
    /// Returns `SqlMarshalError` if the statement cannot be prepared or described.
    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement, SqlMarshalError>;

    /// Run a statement with parameters that have already passed validation.
    ///
    /// # Errors
    /// Returns `SqlMarshalError` if execution fails.
    fn execute(
        &mut self,
        statement: &PreparedStatement,
        params: &[BoundValue],
    ) -> Result<RawRows, SqlMarshalError>;

    /// # Errors
    /// Returns `SqlMarshalError` if the engine refuses to start a transaction.
    fn begin_transaction(&mut self) -> Result<(), SqlMarshalError>;

    /// # Errors
    /// Returns `SqlMarshalError` if the commit fails.
    fn commit_transaction(&mut self) -> Result<(), SqlMarshalError>;

    /// # Errors
    /// Returns `SqlMarshalError` if the rollback fails.
    fn rollback_transaction(&mut self) -> Result<(), SqlMarshalError>;

    /// # Errors
    /// Returns `SqlMarshalError` if the engine cannot allocate a blob.
    fn create_blob(
        &mut self,
        subtype: BlobSubtype,
        segment_size: usize,
    ) -> Result<EngineBlobId, SqlMarshalError>;

    /// # Errors
    /// Returns `SqlMarshalError` if the blob is unknown, closed, or the write fails.
    fn write_blob_segment(&mut self, id: EngineBlobId, bytes: &[u8])
    -> Result<(), SqlMarshalError>;

    /// Finalize a written blob, or release a blob opened for reading.
    ///
    /// # Errors
    /// Returns `SqlMarshalError` if the blob is unknown.
    fn close_blob(&mut self, id: EngineBlobId) -> Result<(), SqlMarshalError>;

    /// Discard a blob whose write did not complete.
    ///
    /// # Errors
    /// Returns `SqlMarshalError` if the engine fails to discard the blob.
    fn cancel_blob(&mut self, _id: EngineBlobId) -> Result<(), SqlMarshalError> {
        Ok(())
    }

    /// # Errors
    /// Returns `SqlMarshalError` if the blob is unknown or cannot be read.
    fn open_blob(&mut self, id: EngineBlobId) -> Result<Box<dyn SegmentStream>, SqlMarshalError>;

    /// Run a batch of DDL/SQL statements without parameters.
    ///
    /// # Errors
    /// Returns `SqlMarshalError` if any statement in the batch fails.
    fn execute_script(&mut self, sql: &str) -> Result<(), SqlMarshalError>;
}
