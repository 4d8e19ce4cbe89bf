//! Transaction documents and results

use crate::coin::Coins;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Delivery semantics requested from the node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BroadcastMode {
    /// Return as soon as the tx is handed to the node
    Async,
    /// Return after CheckTx
    #[default]
    Sync,
    /// Return after the tx is included in a block
    Commit,
}

impl BroadcastMode {
    /// Tendermint RPC method for this mode
    pub fn rpc_method(&self) -> &'static str {
        match self {
            BroadcastMode::Async => "broadcast_tx_async",
            BroadcastMode::Sync => "broadcast_tx_sync",
            BroadcastMode::Commit => "broadcast_tx_commit",
        }
    }
}

impl fmt::Display for BroadcastMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BroadcastMode::Async => "async",
            BroadcastMode::Sync => "sync",
            BroadcastMode::Commit => "commit",
        };
        f.write_str(s)
    }
}

impl FromStr for BroadcastMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "async" => Ok(BroadcastMode::Async),
            "sync" => Ok(BroadcastMode::Sync),
            "commit" | "block" => Ok(BroadcastMode::Commit),
            other => Err(format!("unknown broadcast mode: {other}")),
        }
    }
}

/// Fee paid by a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Coins,
    #[serde(with = "u64_string")]
    pub gas: u64,
}

impl StdFee {
    pub fn new(amount: Coins, gas: u64) -> Self {
        Self { amount, gas }
    }
}

/// Document covered by the signature
///
/// Numbers are carried as strings and `msgs` holds `{type, value}` envelopes,
/// following the legacy amino JSON sign mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StdSignDoc {
    #[serde(with = "u64_string")]
    pub account_number: u64,
    pub chain_id: String,
    pub fee: StdFee,
    pub memo: String,
    pub msgs: Vec<Value>,
    #[serde(with = "u64_string")]
    pub sequence: u64,
}

/// A signature together with the public key that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdSignature {
    /// Compressed secp256k1 public key
    pub pub_key: Vec<u8>,
    /// 64-byte compact signature
    pub signature: Vec<u8>,
}

/// Outcome of one submitted transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTx {
    pub hash: String,
    pub height: i64,
    pub code: u32,
    pub log: String,
}

mod u64_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
