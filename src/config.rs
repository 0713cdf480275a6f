use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::engine::EngineClient;
use crate::error::SqlMarshalError;

/// Largest segment a single engine write may carry.
pub const MAX_SEGMENT_SIZE: usize = 65_535;

/// How CHAR/VARCHAR lengths are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LengthSemantics {
    /// Count Unicode scalar values
    #[default]
    Characters,
    /// Count UTF-8 bytes
    Bytes,
}

/// Options shared by the codec, the binder and the blob channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarshalOptions {
    pub length_semantics: LengthSemantics,
    pub max_segment_size: usize,
}

impl Default for MarshalOptions {
    fn default() -> Self {
        Self {
            length_semantics: LengthSemantics::default(),
            max_segment_size: MAX_SEGMENT_SIZE,
        }
    }
}

impl MarshalOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_length_semantics(mut self, length_semantics: LengthSemantics) -> Self {
        self.length_semantics = length_semantics;
        self
    }

    #[must_use]
    pub fn with_max_segment_size(mut self, max_segment_size: usize) -> Self {
        self.max_segment_size = max_segment_size;
        self
    }

    /// Load options from a JSON document; missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns `SqlMarshalError::ConfigError` if the document is malformed or invalid.
    pub fn from_json_str(json: &str) -> Result<Self, SqlMarshalError> {
        let opts: MarshalOptions = serde_json::from_str(json)?;
        opts.validate()?;
        Ok(opts)
    }

    /// # Errors
    /// Returns `SqlMarshalError::ConfigError` if `max_segment_size` is zero.
    pub fn validate(&self) -> Result<(), SqlMarshalError> {
        if self.max_segment_size == 0 {
            return Err(SqlMarshalError::ConfigError(
                "max_segment_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for marshalling options.
#[derive(Debug, Clone, Default)]
pub struct MarshalOptionsBuilder {
    opts: MarshalOptions,
}

impl MarshalOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn length_semantics(mut self, length_semantics: LengthSemantics) -> Self {
        self.opts.length_semantics = length_semantics;
        self
    }

    #[must_use]
    pub fn max_segment_size(mut self, max_segment_size: usize) -> Self {
        self.opts.max_segment_size = max_segment_size;
        self
    }

    #[must_use]
    pub fn finish(self) -> MarshalOptions {
        self.opts
    }

    /// Validate the options and wrap `engine` in a [`Connection`].
    ///
    /// # Errors
    /// Returns `SqlMarshalError::ConfigError` if the options are invalid.
    pub fn connect<E: EngineClient>(self, engine: E) -> Result<Connection<E>, SqlMarshalError> {
        Connection::new(engine, self.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let opts = MarshalOptions::from_json_str(r#"{"length_semantics":"bytes"}"#).unwrap();
        assert_eq!(opts.length_semantics, LengthSemantics::Bytes);
        assert_eq!(opts.max_segment_size, MAX_SEGMENT_SIZE);
    }

    #[test]
    fn zero_segment_size_is_rejected() {
        let err = MarshalOptions::from_json_str(r#"{"max_segment_size":0}"#).unwrap_err();
        assert!(matches!(err, SqlMarshalError::ConfigError(_)));
    }
}
