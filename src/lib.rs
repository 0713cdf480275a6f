//! Value marshalling for relational database drivers.
//!
//! Host values are checked against the declared type of each parameter before
//! anything reaches the engine, large objects move in bounded segments, and every
//! unit of work ends in exactly one commit or rollback.
//!
//! ```rust,no_run
//! # #[cfg(feature = "sqlite")]
//! # fn demo() -> Result<(), sql_marshal::SqlMarshalError> {
//! use sql_marshal::prelude::*;
//!
//! let mut conn = SqliteOptionsBuilder::new("marshal.db".into()).build()?;
//! conn.execute_script("CREATE TABLE t (i INTEGER, c10 CHAR(10));")?;
//! conn.execute("INSERT INTO t (i, c10) VALUES (?, ?)", &[1.into(), "a".into()])?;
//!
//! let rows = conn.query("SELECT i, c10 FROM t WHERE i = ?", &[1.into()])?;
//! assert_eq!(rows.results[0].get("c10"), Some(&HostValue::from("a         ")));
//! # Ok(())
//! # }
//! ```

pub mod binder;
pub mod blob;
pub mod codec;
pub mod config;
pub mod connection;
pub mod engine;
pub mod error;
pub mod prelude;
pub mod results;
pub mod transaction;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use binder::{BoundValue, ParameterBinder};
pub use blob::{BlobChannel, BlobHandle, BlobSegments};
pub use codec::ScalarCodec;
pub use config::{LengthSemantics, MAX_SEGMENT_SIZE, MarshalOptions, MarshalOptionsBuilder};
pub use connection::Connection;
pub use engine::{
    EngineBlobId, EngineClient, PreparedStatement, RawRow, RawRows, ResultColumn, SegmentStream,
};
pub use error::{ErrorKind, SqlMarshalError};
pub use results::{ResultSet, Row, RowDecoder, decode_row};
pub use transaction::{TransactionScope, TransactionState};
pub use types::{BlobSubtype, ColumnType, DEFAULT_SEGMENT_SIZE, HostValue, WireValue};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteEngine, SqliteOptions, SqliteOptionsBuilder};
