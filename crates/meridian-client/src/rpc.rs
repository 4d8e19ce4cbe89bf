//! Tendermint JSON-RPC transport

use crate::builder::tx_hash;
use crate::transport::{NodeTransport, TransportError};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use meridian_types::{codes, BroadcastMode, ResultTx};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// ABCI path used to dry-run a transaction
pub const SIMULATE_PATH: &str = "/app/simulate";

/// RPC request
#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

/// RPC response
#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<String>,
}

#[derive(Deserialize)]
struct AbciQueryResult {
    response: AbciQueryResponse,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct AbciQueryResponse {
    code: u32,
    log: String,
    codespace: String,
    value: Option<String>,
}

/// Result of `broadcast_tx_sync` and `broadcast_tx_async`
#[derive(Deserialize, Default)]
#[serde(default)]
struct CheckTxResult {
    code: u32,
    log: String,
    codespace: String,
    hash: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ExecTxResult {
    code: u32,
    log: String,
    codespace: String,
}

/// Result of `broadcast_tx_commit`
#[derive(Deserialize)]
struct CommitTxResult {
    #[serde(default)]
    check_tx: ExecTxResult,
    #[serde(default, alias = "tx_result")]
    deliver_tx: ExecTxResult,
    hash: String,
    #[serde(with = "crate::amino")]
    height: u64,
}

fn rejection(code: u32, codespace: String, log: String) -> TransportError {
    let codespace = if codespace.is_empty() {
        codes::SDK_CODESPACE.to_string()
    } else {
        codespace
    };
    TransportError::Rejected {
        codespace,
        code,
        log,
    }
}

fn decode_result<T: DeserializeOwned>(value: Value) -> Result<T, TransportError> {
    serde_json::from_value(value).map_err(|e| TransportError::InvalidResponse(e.to_string()))
}

fn query_value(result: AbciQueryResult) -> Result<Vec<u8>, TransportError> {
    let response = result.response;
    if response.code != codes::OK {
        return Err(rejection(response.code, response.codespace, response.log));
    }
    match response.value {
        Some(value) => STANDARD
            .decode(value)
            .map_err(|e| TransportError::InvalidResponse(format!("invalid query value: {e}"))),
        None => Ok(Vec::new()),
    }
}

fn broadcast_result(mode: BroadcastMode, value: Value) -> Result<ResultTx, TransportError> {
    match mode {
        BroadcastMode::Async | BroadcastMode::Sync => {
            let result: CheckTxResult = decode_result(value)?;
            if result.code != codes::OK {
                return Err(rejection(result.code, result.codespace, result.log));
            }
            Ok(ResultTx {
                hash: result.hash,
                height: 0,
                code: result.code,
                log: result.log,
            })
        }
        BroadcastMode::Commit => {
            let result: CommitTxResult = decode_result(value)?;
            for stage in [&result.check_tx, &result.deliver_tx] {
                if stage.code != codes::OK {
                    return Err(rejection(stage.code, stage.codespace.clone(), stage.log.clone()));
                }
            }
            Ok(ResultTx {
                hash: result.hash,
                height: i64::try_from(result.height)
                    .map_err(|e| TransportError::InvalidResponse(e.to_string()))?,
                code: codes::OK,
                log: result.deliver_tx.log,
            })
        }
    }
}

/// Node transport over HTTP JSON-RPC
#[derive(Clone, Debug)]
pub struct RpcTransport {
    node_url: Url,
    http_client: HttpClient,
}

impl RpcTransport {
    /// Create a transport for `node`; `timeout` bounds each HTTP request
    pub fn new(node: &str, timeout: Duration) -> Result<Self, TransportError> {
        let node_url = Url::parse(node)
            .map_err(|e| TransportError::Network(format!("invalid node url {node}: {e}")))?;
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            node_url,
            http_client,
        })
    }

    pub fn node_url(&self) -> &Url {
        &self.node_url
    }

    /// Make an RPC request
    async fn rpc_request(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response = self
            .http_client
            .post(self.node_url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let rpc_response: RpcResponse<Value> = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        if let Some(error) = rpc_response.error {
            let log = match error.data {
                Some(data) if !data.is_empty() => format!("{}: {}", error.message, data),
                _ => error.message,
            };
            return Err(TransportError::rejected(
                "rpc",
                u32::try_from(error.code.unsigned_abs()).unwrap_or(u32::MAX),
                log,
            ));
        }

        rpc_response
            .result
            .ok_or_else(|| TransportError::InvalidResponse("missing result field".to_string()))
    }

    /// Query the application
    pub async fn abci_query(&self, path: &str, data: &[u8]) -> Result<Vec<u8>, TransportError> {
        let params = serde_json::json!({
            "path": path,
            "data": hex::encode(data),
            "prove": false,
        });

        let result = self.rpc_request("abci_query", params).await?;
        query_value(decode_result(result)?)
    }
}

#[async_trait]
impl NodeTransport for RpcTransport {
    async fn query(&self, path: &str, data: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.abci_query(path, data).await
    }

    async fn broadcast(&self, tx: &[u8], mode: BroadcastMode) -> Result<ResultTx, TransportError> {
        let params = serde_json::json!({ "tx": STANDARD.encode(tx) });
        let result = self.rpc_request(mode.rpc_method(), params).await?;
        broadcast_result(mode, result)
    }

    async fn simulate(&self, tx: &[u8]) -> Result<ResultTx, TransportError> {
        let value = self.abci_query(SIMULATE_PATH, tx).await?;
        Ok(ResultTx {
            hash: tx_hash(tx),
            height: 0,
            code: codes::OK,
            log: String::from_utf8_lossy(&value).into_owned(),
        })
    }
}
