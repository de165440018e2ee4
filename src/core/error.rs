//! Centralized error types for the indexer.

use thiserror::Error;

/// Main indexer error type.
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("processing error: {0}")]
    Processing(String),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt {kind} document at key {key}: {reason}")]
    Corrupt {
        kind: &'static str,
        key: String,
        reason: String,
    },
}

/// Errors from the read-only chain collaborator.
#[derive(Error, Debug)]
pub enum ChainError {
    /// The called contract reverted. Fatal for the current event unless the
    /// call site documents a fallback.
    #[error("call {call} to {contract} reverted")]
    Reverted {
        contract: String,
        call: &'static str,
    },

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed result for {call}: {reason}")]
    Decode {
        call: &'static str,
        reason: String,
    },
}

impl ChainError {
    pub fn is_revert(&self) -> bool {
        matches!(self, ChainError::Reverted { .. })
    }
}

/// Result type alias for indexer operations.
pub type IndexerResult<T> = Result<T, IndexerError>;

impl From<bincode::Error> for IndexerError {
    fn from(err: bincode::Error) -> Self {
        IndexerError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for IndexerError {
    fn from(err: serde_json::Error) -> Self {
        IndexerError::Serialization(err.to_string())
    }
}

impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<rocksdb::Error> for IndexerError {
    fn from(err: rocksdb::Error) -> Self {
        IndexerError::Storage(StorageError::from(err))
    }
}
