//! Node transport contract

use crate::error;
use async_trait::async_trait;
use meridian_types::{codes, BroadcastMode, ResultTx};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by a node transport
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The node processed the request and refused it
    #[error("rejected by node: codespace={codespace} code={code} log={log}")]
    Rejected {
        codespace: String,
        code: u32,
        log: String,
    },

    /// The request never produced a node answer
    #[error("network error: {0}")]
    Network(String),

    /// The node answered with something unreadable
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    pub fn rejected(codespace: impl Into<String>, code: u32, log: impl Into<String>) -> Self {
        TransportError::Rejected {
            codespace: codespace.into(),
            code,
            log: log.into(),
        }
    }

    /// Stale or out-of-order account sequence
    pub fn is_invalid_sequence(&self) -> bool {
        matches!(
            self,
            TransportError::Rejected { codespace, code, .. }
                if codespace == codes::SDK_CODESPACE && *code == codes::INVALID_SEQUENCE
        )
    }

    /// Node log for rejections, the error text otherwise
    pub fn log(&self) -> String {
        match self {
            TransportError::Rejected { log, .. } => log.clone(),
            other => other.to_string(),
        }
    }
}

/// Remote node operations used by the client
#[async_trait]
pub trait NodeTransport: Send + Sync {
    /// ABCI query; returns the raw response value
    async fn query(&self, path: &str, data: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Submit signed transaction bytes
    async fn broadcast(&self, tx: &[u8], mode: BroadcastMode) -> Result<ResultTx, TransportError>;

    /// Execute signed transaction bytes without committing them
    async fn simulate(&self, tx: &[u8]) -> Result<ResultTx, TransportError>;
}

/// Bound a node call by `after`
pub(crate) async fn bounded<T>(
    operation: &'static str,
    after: Duration,
    call: impl Future<Output = T>,
) -> error::Result<T> {
    tokio::time::timeout(after, call)
        .await
        .map_err(|_| error::Error::Timeout { operation, after })
}

/// ABCI query bounded by `after`, with transport failures tagged by path
pub(crate) async fn query_bounded(
    transport: &dyn NodeTransport,
    path: &str,
    data: &[u8],
    after: Duration,
) -> error::Result<Vec<u8>> {
    bounded("query", after, transport.query(path, data))
        .await?
        .map_err(|source| error::Error::Query {
            path: path.to_string(),
            source,
        })
}
