use std::fmt;

use tracing::{debug, warn};

use crate::blob::BlobHandle;
use crate::connection::Connection;
use crate::engine::{EngineBlobId, EngineClient, PreparedStatement};
use crate::error::SqlMarshalError;
use crate::results::ResultSet;
use crate::types::{BlobSubtype, HostValue};

/// Lifecycle of a [`TransactionScope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    Idle,
    Active,
    Committed,
    RolledBack,
}

impl TransactionState {
    /// True once the scope has committed or rolled back.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionState::Committed | TransactionState::RolledBack)
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionState::Idle => "idle",
            TransactionState::Active => "active",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled back",
        };
        f.write_str(label)
    }
}

/// One unit of work on a [`Connection`].
///
/// A scope moves `Idle → Active → Committed | RolledBack` exactly once. Every blob
/// handle opened through it stops working when it leaves `Active`. Dropping an
/// active scope rolls it back.
///
/// Most callers want [`Connection::transaction`], which picks commit or rollback
/// from the closure's result:
///
/// ```rust,no_run
/// # #[cfg(feature = "sqlite")]
/// # fn demo() -> Result<(), sql_marshal::SqlMarshalError> {
/// use sql_marshal::prelude::*;
///
/// let mut conn = SqliteOptionsBuilder::new(":memory:".into()).build()?;
/// conn.execute_script("CREATE TABLE t (i INTEGER, si SMALLINT);")?;
///
/// let err = conn
///     .transaction(|tx| {
///         tx.execute("INSERT INTO t (i, si) VALUES (?, ?)", &[1.into(), 1.into()])?;
///         tx.execute("INSERT INTO t (i, si) VALUES (?, ?)", &[2.into(), 100_000.into()])
///     })
///     .unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::RangeOverflow);
/// assert!(conn.query("SELECT i FROM t", &[])?.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct TransactionScope<'c, E: EngineClient> {
    conn: &'c mut Connection<E>,
    state: TransactionState,
}

impl<'c, E: EngineClient> TransactionScope<'c, E> {
    pub(crate) fn new(conn: &'c mut Connection<E>) -> Self {
        Self {
            conn,
            state: TransactionState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Start the transaction on the engine.
    ///
    /// # Errors
    /// Returns `InvalidState` if this scope was already started, or if the connection
    /// already has an active transaction; otherwise the engine's error.
    pub fn begin(&mut self) -> Result<(), SqlMarshalError> {
        if self.state != TransactionState::Idle {
            return Err(SqlMarshalError::InvalidState(format!(
                "cannot begin: transaction is already {}",
                self.state
            )));
        }
        if self.conn.in_transaction() {
            return Err(SqlMarshalError::InvalidState(
                "cannot begin: connection already has an active transaction".into(),
            ));
        }
        self.conn.engine_mut().begin_transaction()?;
        self.conn.set_in_transaction(true);
        self.state = TransactionState::Active;
        debug!("transaction started");
        Ok(())
    }

    /// Commit the transaction.
    ///
    /// If the engine refuses the commit, the transaction is rolled back and the
    /// commit error returned; the scope ends `RolledBack` either way.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the scope is active, or the engine's commit error.
    pub fn commit(&mut self) -> Result<(), SqlMarshalError> {
        self.ensure_active("commit")?;
        self.conn.release_blobs();
        let outcome = self.conn.engine_mut().commit_transaction();
        self.conn.set_in_transaction(false);
        match outcome {
            Ok(()) => {
                self.state = TransactionState::Committed;
                debug!("transaction committed");
                Ok(())
            }
            Err(err) => {
                self.state = TransactionState::RolledBack;
                if let Err(rollback_err) = self.conn.engine_mut().rollback_transaction() {
                    warn!(error = %rollback_err, "rollback after failed commit also failed");
                }
                debug!(error = %err, "commit failed; transaction rolled back");
                Err(err)
            }
        }
    }

    /// Roll the transaction back.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the scope is active, or the engine's rollback error.
    /// The scope is `RolledBack` afterwards even when the engine reports an error.
    pub fn rollback(&mut self) -> Result<(), SqlMarshalError> {
        self.ensure_active("roll back")?;
        self.conn.release_blobs();
        let outcome = self.conn.engine_mut().rollback_transaction();
        self.conn.set_in_transaction(false);
        self.state = TransactionState::RolledBack;
        debug!(ok = outcome.is_ok(), "transaction rolled back");
        outcome
    }

    /// # Errors
    /// Returns `InvalidState` unless the scope is active, or the engine's error.
    pub fn prepare(&mut self, sql: &str) -> Result<PreparedStatement, SqlMarshalError> {
        self.ensure_active("prepare")?;
        self.conn.engine_mut().prepare(sql)
    }

    /// Prepare and run a statement, returning the number of rows it changed.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the scope is active, a bind error for the first
    /// invalid parameter, or the engine's error.
    pub fn execute(&mut self, sql: &str, params: &[HostValue]) -> Result<usize, SqlMarshalError> {
        let statement = self.prepare(sql)?;
        self.execute_prepared(&statement, params)
    }

    /// # Errors
    /// Same as [`TransactionScope::execute`].
    pub fn execute_prepared(
        &mut self,
        statement: &PreparedStatement,
        params: &[HostValue],
    ) -> Result<usize, SqlMarshalError> {
        self.ensure_active("execute")?;
        self.conn
            .run(statement, params)
            .map(|result_set| result_set.rows_affected)
    }

    /// Prepare and run a query, decoding every row.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the scope is active, a bind or decode error, or the
    /// engine's error.
    pub fn query(
        &mut self,
        sql: &str,
        params: &[HostValue],
    ) -> Result<ResultSet, SqlMarshalError> {
        let statement = self.prepare(sql)?;
        self.query_prepared(&statement, params)
    }

    /// # Errors
    /// Same as [`TransactionScope::query`].
    pub fn query_prepared(
        &mut self,
        statement: &PreparedStatement,
        params: &[HostValue],
    ) -> Result<ResultSet, SqlMarshalError> {
        self.ensure_active("query")?;
        self.conn.run(statement, params)
    }

    /// # Errors
    /// Returns `InvalidState` unless the scope is active, or the engine's error.
    pub fn execute_script(&mut self, sql: &str) -> Result<(), SqlMarshalError> {
        self.ensure_active("execute a script")?;
        self.conn.engine_mut().execute_script(sql)
    }

    /// # Errors
    /// Returns `InvalidState` unless the scope is active, `InvalidArgument` for a zero
    /// segment size, or the engine's error.
    pub fn open_blob_for_write(
        &mut self,
        subtype: BlobSubtype,
        segment_size: usize,
    ) -> Result<BlobHandle, SqlMarshalError> {
        self.ensure_active("open a blob")?;
        let (engine, blobs) = self.conn.engine_and_blobs();
        blobs.open_for_write(engine, subtype, segment_size)
    }

    /// # Errors
    /// Returns `InvalidState` unless the scope is active and `handle` is open for
    /// writing, or the engine's error.
    pub fn write_blob_segment(
        &mut self,
        handle: BlobHandle,
        bytes: &[u8],
    ) -> Result<(), SqlMarshalError> {
        self.ensure_active("write a blob segment")?;
        let (engine, blobs) = self.conn.engine_and_blobs();
        blobs.write_segment(engine, handle, bytes)
    }

    /// Finalize a written blob, or release one opened for reading.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the scope is active and `handle` is live, or the
    /// engine's error.
    pub fn close_blob(&mut self, handle: BlobHandle) -> Result<EngineBlobId, SqlMarshalError> {
        self.ensure_active("close a blob")?;
        let (engine, blobs) = self.conn.engine_and_blobs();
        blobs.close(engine, handle)
    }

    /// # Errors
    /// Returns `InvalidState` unless the scope is active, or the engine's error.
    pub fn open_blob_for_read(
        &mut self,
        blob: EngineBlobId,
    ) -> Result<BlobHandle, SqlMarshalError> {
        self.ensure_active("open a blob")?;
        let (engine, blobs) = self.conn.engine_and_blobs();
        blobs.open_for_read(engine, blob)
    }

    /// Next segment of a blob opened for reading; `None` once exhausted.
    ///
    /// # Errors
    /// Returns `InvalidState` unless the scope is active and `handle` is open for
    /// reading, or the engine's error.
    pub fn read_blob_segment(
        &mut self,
        handle: BlobHandle,
    ) -> Result<Option<Vec<u8>>, SqlMarshalError> {
        self.ensure_active("read a blob segment")?;
        self.conn.blobs_mut().read_segment(handle)
    }

    fn ensure_active(&self, operation: &str) -> Result<(), SqlMarshalError> {
        if self.state == TransactionState::Active {
            Ok(())
        } else {
            Err(SqlMarshalError::InvalidState(format!(
                "cannot {operation}: transaction is {}",
                self.state
            )))
        }
    }
}

impl<E: EngineClient> Drop for TransactionScope<'_, E> {
    fn drop(&mut self) {
        if self.state == TransactionState::Active
            && let Err(err) = self.rollback()
        {
            warn!(error = %err, "rollback of dropped transaction failed");
        }
    }
}

impl<E: EngineClient> fmt::Debug for TransactionScope<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionScope")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
