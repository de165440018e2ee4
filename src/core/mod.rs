//! Error taxonomy and primitive types shared by every module.

pub mod error;
pub mod serde_util;
pub mod types;

pub use error::{ChainError, IndexerError, IndexerResult, StorageError};
pub use types::{Address, EventContext};
