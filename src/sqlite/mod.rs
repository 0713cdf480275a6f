// SQLite engine client
//
// - config: options, builder and connection setup
// - describe: parameter type inference from statement text
// - scanner: placeholder scanning that skips literals and comments
// - params: bound values to rusqlite values
// - query: stored values back to wire values
// - blobs: staging for blob content written or fetched in a transaction

mod blobs;
pub mod config;
mod describe;
mod params;
mod query;
mod scanner;

use std::path::Path;

use rusqlite::types::Value;
use tracing::debug;

use crate::binder::BoundValue;
use crate::engine::{
    EngineBlobId, EngineClient, PreparedStatement, RawRows, ResultColumn, SegmentStream,
};
use crate::error::SqlMarshalError;
use crate::types::{BlobSubtype, ColumnType};

use blobs::BlobStore;

pub use config::{SqliteOptions, SqliteOptionsBuilder};

/// [`EngineClient`] over a single rusqlite connection.
///
/// Result columns are described from their declared types, so queries should select
/// table columns rather than computed expressions.
#[derive(Debug)]
pub struct SqliteEngine {
    conn: rusqlite::Connection,
    blobs: BlobStore,
}

impl SqliteEngine {
    /// # Errors
    /// Returns `SqlMarshalError::SqliteError` if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SqlMarshalError> {
        Ok(Self::from_connection(rusqlite::Connection::open(path)?))
    }

    /// # Errors
    /// Returns `SqlMarshalError::SqliteError` if the database cannot be created.
    pub fn open_in_memory() -> Result<Self, SqlMarshalError> {
        Ok(Self::from_connection(rusqlite::Connection::open_in_memory()?))
    }

    #[must_use]
    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn,
            blobs: BlobStore::default(),
        }
    }

    #[must_use]
    pub fn connection(&self) -> &rusqlite::Connection {
        &self.conn
    }

    /// Blobs currently staged on this connection.
    #[must_use]
    pub fn staged_blobs(&self) -> usize {
        self.blobs.len()
    }
}

impl EngineClient for SqliteEngine {
    fn prepare(&mut self, sql: &str) -> Result<PreparedStatement, SqlMarshalError> {
        let stmt = self.conn.prepare_cached(sql)?;
        let expected_params = stmt.parameter_count();
        let mut result_columns = Vec::with_capacity(stmt.column_count());
        for column in stmt.columns() {
            let name = column.name();
            let declared = column.decl_type().ok_or_else(|| {
                SqlMarshalError::Unimplemented(format!(
                    "result column {name} has no declared type; select a table column"
                ))
            })?;
            let column_type = declared
                .parse::<ColumnType>()
                .map_err(|err| err.with_context(format!("result column {name}")))?;
            result_columns.push(ResultColumn::new(name, column_type));
        }
        drop(stmt);

        let param_types = describe::parameter_types(&self.conn, sql)?;
        if param_types.len() != expected_params {
            return Err(SqlMarshalError::Unimplemented(format!(
                "described {} of {expected_params} parameter(s); numbered and named placeholders are not supported",
                param_types.len()
            )));
        }
        Ok(PreparedStatement::new(sql, param_types, result_columns))
    }

    fn execute(
        &mut self,
        statement: &PreparedStatement,
        params: &[BoundValue],
    ) -> Result<RawRows, SqlMarshalError> {
        let values = params::convert(params, &self.blobs)?;
        let mut stmt = self.conn.prepare_cached(statement.sql())?;

        if !statement.returns_rows() {
            let changed = stmt.execute(rusqlite::params_from_iter(values.iter()))?;
            return Ok(RawRows::empty(changed));
        }

        let column_types: Vec<ColumnType> = statement
            .result_columns()
            .iter()
            .map(|column| column.column_type)
            .collect();
        let mut rows = stmt.query(rusqlite::params_from_iter(values.iter()))?;
        let mut raw_rows = Vec::new();
        while let Some(row) = rows.next()? {
            let mut raw = Vec::with_capacity(column_types.len());
            for (idx, column_type) in column_types.iter().enumerate() {
                let value: Value = row.get(idx)?;
                raw.push(query::wire_value(value, column_type, &mut self.blobs)?);
            }
            raw_rows.push(raw);
        }
        Ok(RawRows::from_rows(raw_rows))
    }

    fn begin_transaction(&mut self) -> Result<(), SqlMarshalError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    fn commit_transaction(&mut self) -> Result<(), SqlMarshalError> {
        self.conn.execute_batch("COMMIT")?;
        self.blobs.clear();
        Ok(())
    }

    fn rollback_transaction(&mut self) -> Result<(), SqlMarshalError> {
        let outcome = self.conn.execute_batch("ROLLBACK");
        self.blobs.clear();
        outcome?;
        Ok(())
    }

    fn create_blob(
        &mut self,
        subtype: BlobSubtype,
        segment_size: usize,
    ) -> Result<EngineBlobId, SqlMarshalError> {
        let id = self.blobs.create(subtype, segment_size);
        debug!(%id, %subtype, segment_size, "sqlite blob created");
        Ok(id)
    }

    fn write_blob_segment(&mut self, id: EngineBlobId, bytes: &[u8]) -> Result<(), SqlMarshalError> {
        self.blobs.append(id, bytes)
    }

    fn close_blob(&mut self, id: EngineBlobId) -> Result<(), SqlMarshalError> {
        self.blobs.close(id)
    }

    fn cancel_blob(&mut self, id: EngineBlobId) -> Result<(), SqlMarshalError> {
        self.blobs.cancel(id);
        Ok(())
    }

    fn open_blob(&mut self, id: EngineBlobId) -> Result<Box<dyn SegmentStream>, SqlMarshalError> {
        self.blobs.stream(id)
    }

    fn execute_script(&mut self, sql: &str) -> Result<(), SqlMarshalError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}
