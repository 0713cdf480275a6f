//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::binder::{BoundValue, ParameterBinder};
pub use crate::blob::{BlobChannel, BlobHandle};
pub use crate::codec::ScalarCodec;
pub use crate::config::{LengthSemantics, MarshalOptions, MarshalOptionsBuilder};
pub use crate::connection::Connection;
pub use crate::engine::{
    EngineBlobId, EngineClient, PreparedStatement, RawRows, ResultColumn, SegmentStream,
};
pub use crate::error::{ErrorKind, SqlMarshalError};
pub use crate::results::{ResultSet, Row, RowDecoder};
pub use crate::transaction::{TransactionScope, TransactionState};
pub use crate::types::{BlobSubtype, ColumnType, HostValue, WireValue};

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteEngine, SqliteOptions, SqliteOptionsBuilder};
