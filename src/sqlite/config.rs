use crate::config::{LengthSemantics, MarshalOptions};
use crate::connection::Connection;
use crate::error::SqlMarshalError;

use super::SqliteEngine;

/// Options for opening a `SQLite`-backed [`Connection`].
#[derive(Debug, Clone)]
pub struct SqliteOptions {
    pub db_path: String,
    pub wal: bool,
    pub marshal: MarshalOptions,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            wal: false,
            marshal: MarshalOptions::default(),
        }
    }

    #[must_use]
    pub fn with_wal(mut self, wal: bool) -> Self {
        self.wal = wal;
        self
    }

    #[must_use]
    pub fn with_marshal(mut self, marshal: MarshalOptions) -> Self {
        self.marshal = marshal;
        self
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
        }
    }

    #[must_use]
    pub fn wal(mut self, wal: bool) -> Self {
        self.opts.wal = wal;
        self
    }

    #[must_use]
    pub fn length_semantics(mut self, length_semantics: LengthSemantics) -> Self {
        self.opts.marshal.length_semantics = length_semantics;
        self
    }

    #[must_use]
    pub fn max_segment_size(mut self, max_segment_size: usize) -> Self {
        self.opts.marshal.max_segment_size = max_segment_size;
        self
    }

    #[must_use]
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Open the database and wrap it in a [`Connection`].
    ///
    /// # Errors
    ///
    /// Returns `SqlMarshalError` if the options are invalid or the database cannot be
    /// opened.
    pub fn build(self) -> Result<Connection<SqliteEngine>, SqlMarshalError> {
        Connection::open_sqlite(self.finish())
    }
}

impl Connection<SqliteEngine> {
    #[must_use]
    pub fn sqlite_builder(db_path: String) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Open a `SQLite` database, enabling WAL journaling when requested.
    ///
    /// # Errors
    /// Returns `SqlMarshalError::ConfigError` for invalid marshalling options, or
    /// `SqlMarshalError::SqliteError` if the database cannot be opened.
    pub fn open_sqlite(opts: SqliteOptions) -> Result<Self, SqlMarshalError> {
        opts.marshal.validate()?;
        let engine = SqliteEngine::open(&opts.db_path)?;
        if opts.wal {
            engine.connection().execute_batch(
                "
                PRAGMA journal_mode = WAL;
            ",
            )?;
        }
        Connection::new(engine, opts.marshal)
    }
}
