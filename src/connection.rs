use tracing::{debug, warn};

use crate::binder::ParameterBinder;
use crate::blob::BlobChannel;
use crate::codec::ScalarCodec;
use crate::config::MarshalOptions;
use crate::engine::{EngineClient, PreparedStatement, RawRow};
use crate::error::SqlMarshalError;
use crate::results::{ResultSet, RowDecoder};
use crate::transaction::{TransactionScope, TransactionState};
use crate::types::{ColumnType, HostValue, WireValue};

/// An engine client together with the marshalling state that belongs to it.
///
/// The connection owns the single [`BlobChannel`] and [`ParameterBinder`] used by
/// every transaction it runs. Statements issued directly on the connection run in
/// their own single-statement transaction.
pub struct Connection<E: EngineClient> {
    engine: E,
    blobs: BlobChannel,
    binder: ParameterBinder,
    options: MarshalOptions,
    in_transaction: bool,
}

impl<E: EngineClient> Connection<E> {
    /// # Errors
    /// Returns `SqlMarshalError::ConfigError` if `options` fail validation.
    pub fn new(engine: E, options: MarshalOptions) -> Result<Self, SqlMarshalError> {
        options.validate()?;
        Ok(Self {
            engine,
            blobs: BlobChannel::new(&options),
            binder: ParameterBinder::new(ScalarCodec::from_options(&options)),
            options,
            in_transaction: false,
        })
    }

    /// Wrap `engine` with default options.
    pub fn with_defaults(engine: E) -> Self {
        let options = MarshalOptions::default();
        Self {
            engine,
            blobs: BlobChannel::new(&options),
            binder: ParameterBinder::default(),
            options,
            in_transaction: false,
        }
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    #[must_use]
    pub fn into_engine(self) -> E {
        self.engine
    }

    #[must_use]
    pub fn options(&self) -> &MarshalOptions {
        &self.options
    }

    #[must_use]
    pub fn binder(&self) -> &ParameterBinder {
        &self.binder
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// An idle scope; call [`TransactionScope::begin`] to start it.
    pub fn scope(&mut self) -> TransactionScope<'_, E> {
        TransactionScope::new(self)
    }

    /// Start a transaction and return its active scope.
    ///
    /// # Errors
    /// Returns `InvalidState` if a transaction is already active, or the engine's error.
    pub fn begin(&mut self) -> Result<TransactionScope<'_, E>, SqlMarshalError> {
        let mut scope = self.scope();
        scope.begin()?;
        Ok(scope)
    }

    /// Run `work` inside a transaction.
    ///
    /// The transaction commits when `work` returns `Ok` and rolls back when it returns
    /// `Err`, in which case the closure's error is returned. A scope that `work`
    /// already ended itself is left as it is.
    ///
    /// # Errors
    /// Returns the closure's error, or the engine's error from begin or commit.
    pub fn transaction<T, F>(&mut self, work: F) -> Result<T, SqlMarshalError>
    where
        F: FnOnce(&mut TransactionScope<'_, E>) -> Result<T, SqlMarshalError>,
    {
        let mut scope = self.begin()?;
        match work(&mut scope) {
            Ok(value) => {
                if scope.state() == TransactionState::Active {
                    scope.commit()?;
                }
                Ok(value)
            }
            Err(err) => {
                if scope.state() == TransactionState::Active
                    && let Err(rollback_err) = scope.rollback()
                {
                    warn!(error = %rollback_err, "rollback after failed unit of work failed");
                }
                Err(err)
            }
        }
    }

    /// # Errors
    /// Returns the engine's error if the statement cannot be described.
    pub fn prepare(&mut self, sql: &str) -> Result<PreparedStatement, SqlMarshalError> {
        self.engine.prepare(sql)
    }

    /// Run one statement in its own transaction and return the rows it changed.
    ///
    /// # Errors
    /// Returns a bind error for the first invalid parameter or the engine's error;
    /// nothing is committed in either case.
    pub fn execute(&mut self, sql: &str, params: &[HostValue]) -> Result<usize, SqlMarshalError> {
        self.transaction(|tx| tx.execute(sql, params))
    }

    /// Run one query in its own transaction.
    ///
    /// # Errors
    /// Returns a bind or decode error, or the engine's error.
    pub fn query(
        &mut self,
        sql: &str,
        params: &[HostValue],
    ) -> Result<ResultSet, SqlMarshalError> {
        self.transaction(|tx| tx.query(sql, params))
    }

    /// Run a batch of parameterless statements, typically DDL.
    ///
    /// # Errors
    /// Returns the engine's error.
    pub fn execute_script(&mut self, sql: &str) -> Result<(), SqlMarshalError> {
        self.engine.execute_script(sql)
    }

    pub(crate) fn set_in_transaction(&mut self, active: bool) {
        self.in_transaction = active;
    }

    pub(crate) fn blobs_mut(&mut self) -> &mut BlobChannel {
        &mut self.blobs
    }

    pub(crate) fn engine_and_blobs(&mut self) -> (&mut E, &mut BlobChannel) {
        (&mut self.engine, &mut self.blobs)
    }

    pub(crate) fn release_blobs(&mut self) {
        self.blobs.invalidate_all(&mut self.engine);
    }

    /// Bind, execute and decode one statement.
    pub(crate) fn run(
        &mut self,
        statement: &PreparedStatement,
        params: &[HostValue],
    ) -> Result<ResultSet, SqlMarshalError> {
        let bound = self.binder.bind(
            &mut self.engine,
            &mut self.blobs,
            statement.param_types(),
            params,
        )?;
        debug!(sql = statement.sql(), params = bound.len(), "executing statement");
        let raw_rows = self.engine.execute(statement, &bound)?;
        let rows_affected = raw_rows.rows_affected();

        if !statement.returns_rows() {
            let mut result_set = ResultSet::default();
            result_set.rows_affected = rows_affected;
            return Ok(result_set);
        }

        let decoder = RowDecoder::new(
            ScalarCodec::from_options(&self.options),
            statement.result_columns(),
        )?;
        let mut result_set = ResultSet::with_capacity(rows_affected);
        result_set.set_column_names(decoder.shared_column_names());
        for raw in raw_rows {
            let raw = self.stream_blob_columns(raw?, &decoder)?;
            result_set.add_row(decoder.decode(raw)?);
        }
        Ok(result_set)
    }

    // Replace each fetched blob id with the bytes read through the channel.
    fn stream_blob_columns(
        &mut self,
        mut raw: RawRow,
        decoder: &RowDecoder,
    ) -> Result<RawRow, SqlMarshalError> {
        for (index, value) in raw.iter_mut().enumerate() {
            if let WireValue::Blob(blob) = *value
                && let Some(ColumnType::Blob { .. }) = decoder.column_types().get(index)
            {
                let content = self
                    .blobs
                    .read_to_end(&mut self.engine, blob)
                    .map_err(|err| err.with_context(decoder.column_label(index)))?;
                *value = WireValue::BlobData(content);
            }
        }
        Ok(raw)
    }
}

impl<E: EngineClient + std::fmt::Debug> std::fmt::Debug for Connection<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("engine", &self.engine)
            .field("blobs", &self.blobs)
            .field("options", &self.options)
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}
