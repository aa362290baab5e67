//! Error types.

use thiserror::Error;

/// Failures reported by a storage host.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage is unavailable")]
    Unavailable,

    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Failures of the persistent-value mirror.
///
/// None of these are fatal: the mirror always recovers locally and the
/// error is only reported so callers can decide whether to surface it.
#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("failed to serialize value for `{key}`: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse stored value for `{key}`: {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read `{key}`: {source}")]
    Read {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to write `{key}`: {source}")]
    Write {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to write cookie `{name}`: {source}")]
    Cookie {
        name: String,
        #[source]
        source: StorageError,
    },
}

/// Result type for mirror operations
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Errors raised while loading hook configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
