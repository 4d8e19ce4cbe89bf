//! Error types for transaction dispatch

use crate::config::ConfigError;
use crate::transport::TransportError;
use meridian_codec::CodecError;
use meridian_keyring::KeyringError;
use meridian_types::{ResultTx, SdkError};
use std::time::Duration;
use thiserror::Error;

/// Client error types
#[derive(Error, Debug)]
pub enum Error {
    /// A message failed stateless validation; nothing was sent
    #[error("invalid message at index {index}: {source}")]
    Validation {
        index: usize,
        #[source]
        source: SdkError,
    },

    /// A transaction exceeded the node's size limit
    #[error("transaction of {size} bytes exceeds the size limit of {limit} bytes")]
    SizeLimitExceeded { size: usize, limit: u64 },

    /// The node kept rejecting the account sequence
    #[error("sequence mismatch for {signer} in batch {batch} after {attempts} attempts: {log}")]
    SequenceMismatch {
        signer: String,
        batch: usize,
        attempts: u32,
        log: String,
    },

    /// The node refused a transaction for a non-retryable reason
    #[error("broadcast of batch {batch} for {signer} failed: {source}")]
    Broadcast {
        signer: String,
        batch: usize,
        #[source]
        source: TransportError,
    },

    /// Unrecoverable failure, including panics caught at the dispatch boundary
    #[error("fatal: {0}")]
    Fatal(String),

    /// A node query failed
    #[error("query {path} failed: {source}")]
    Query {
        path: String,
        #[source]
        source: TransportError,
    },

    #[error("keyring error: {0}")]
    Keyring(#[from] KeyringError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// A node call did not complete in time
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a send, carrying every result obtained before it
#[derive(Error, Debug)]
#[error("{error} ({} transactions succeeded)", .results.len())]
pub struct SendError {
    /// Results of the sub-batches that succeeded, in order
    pub results: Vec<ResultTx>,
    #[source]
    pub error: Error,
}

impl SendError {
    pub fn new(results: Vec<ResultTx>, error: Error) -> Self {
        Self { results, error }
    }
}

impl From<Error> for SendError {
    fn from(error: Error) -> Self {
        Self::new(Vec::new(), error)
    }
}
