//! Error taxonomy for the station, one enum per task boundary (see §7 of the design).
//!
//! Only [`ConfigError`] and [`ModelLoadError`] are fatal — everything else is caught
//! and logged at the task boundary that produced it and never propagates further.

use std::path::PathBuf;

use thiserror::Error;

/// Frame decode rejection. Never fatal; the ingest task counts these and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("frame has {got} bytes, expected {expected}")]
    BadSize { got: usize, expected: usize },

    #[error("frame timestamp field `{field}` out of range: {value}")]
    BadTimestamp { field: &'static str, value: i64 },
}

/// Startup configuration failure. Fatal: the caller exits non-zero.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path} as JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing required field `{field}` in {path}")]
    MissingField { path: PathBuf, field: &'static str },
}

/// Model load failure at startup. Fatal.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("model file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to initialize inference session: {0}")]
    Backend(String),
}

/// Failure inside one inference cycle. Recoverable: the window's picks are dropped
/// and the engine proceeds to the next interval.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("preprocessing failed: {0}")]
    Preprocess(String),

    #[error("model invocation failed: {0}")]
    Invoke(String),
}

/// Failure publishing or persisting a pick. Recoverable: logged, not retried.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("event bus publish failed: {0}")]
    Bus(String),

    #[error("failed to append to pick log {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
