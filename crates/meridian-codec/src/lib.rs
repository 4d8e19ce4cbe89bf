//! Encoding and decoding utilities for the meridian client.
//!
//! The [`Codec`] is an explicit registry built once at startup and shared by
//! every component that (de)serializes messages. It names each message type for
//! the amino-style `{type, value}` JSON envelope used in sign documents and
//! encodes signed transactions into length-prefixed protobuf for submission.

pub mod wire;

use meridian_types::msgs::{bank, htlc};
use meridian_types::{Coin, Coins, Msg, StdFee, StdSignature};
use prost::Message;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use thiserror::Error;
use wire::{AnyProto, AuthInfoProto, CoinProto, FeeProto, SignerInfoProto, TxBodyProto, TxProto};

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    /// Message type was never registered
    #[error("unregistered message type: {0}")]
    Unregistered(String),

    /// JSON encoding or decoding failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Protobuf decoding failed
    #[error("failed to decode protobuf: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Structurally valid bytes with invalid content
    #[error("invalid transaction: {0}")]
    InvalidTx(String),

    /// Message content could not be produced
    #[error("message encoding failed: {0}")]
    Msg(#[from] meridian_types::SdkError),
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

type DecodeFn = Box<dyn Fn(&[u8]) -> Result<Box<dyn Msg>> + Send + Sync>;

/// A signed transaction ready to be encoded
pub struct StdTx<'a> {
    pub msgs: &'a [Box<dyn Msg>],
    pub fee: &'a StdFee,
    pub memo: &'a str,
    pub sequence: u64,
    pub signatures: &'a [StdSignature],
}

/// A transaction read back from wire bytes
#[derive(Debug)]
pub struct DecodedTx {
    pub msgs: Vec<Box<dyn Msg>>,
    pub fee: StdFee,
    pub memo: String,
    pub sequence: u64,
    pub signatures: Vec<StdSignature>,
}

/// Message registry and transaction codec
#[derive(Default)]
pub struct Codec {
    names: HashMap<TypeId, &'static str>,
    decoders: HashMap<&'static str, DecodeFn>,
}

impl Codec {
    /// Create an empty codec
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with the bank and htlc messages registered
    pub fn with_defaults() -> Self {
        let mut codec = Self::new();
        codec.register::<bank::MsgSend>("cosmos-sdk/MsgSend");
        codec.register::<bank::MsgMultiSend>("cosmos-sdk/MsgMultiSend");
        codec.register::<htlc::MsgCreateHtlc>("htlc/MsgCreateHTLC");
        codec.register::<htlc::MsgClaimHtlc>("htlc/MsgClaimHTLC");
        codec.register::<htlc::MsgRefundHtlc>("htlc/MsgRefundHTLC");
        codec
    }

    /// Register a concrete message type under a name
    pub fn register<M>(&mut self, name: &'static str)
    where
        M: Msg + DeserializeOwned,
    {
        self.names.insert(TypeId::of::<M>(), name);
        self.decoders.insert(
            name,
            Box::new(|bytes: &[u8]| -> Result<Box<dyn Msg>> {
                let msg: M = serde_json::from_slice(bytes)?;
                Ok(Box::new(msg) as Box<dyn Msg>)
            }),
        );
    }

    /// Check if a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    /// Registered name of a message
    pub fn type_name(&self, msg: &dyn Msg) -> Result<&'static str> {
        self.names
            .get(&Any::type_id(msg.as_any()))
            .copied()
            .ok_or_else(|| {
                CodecError::Unregistered(format!("{}/{}", msg.route(), msg.msg_type()))
            })
    }

    /// `{"type": name, "value": content}` envelope used inside sign documents
    pub fn msg_envelope(&self, msg: &dyn Msg) -> Result<Value> {
        Ok(serde_json::json!({
            "type": self.type_name(msg)?,
            "value": msg.value()?,
        }))
    }

    /// Decode the canonical JSON of a registered message
    pub fn decode_msg(&self, name: &str, bytes: &[u8]) -> Result<Box<dyn Msg>> {
        let decode = self
            .decoders
            .get(name)
            .ok_or_else(|| CodecError::Unregistered(name.to_string()))?;
        decode(bytes)
    }

    /// Encode a signed transaction as length-prefixed protobuf
    pub fn encode_tx(&self, tx: &StdTx<'_>) -> Result<Vec<u8>> {
        let messages = tx
            .msgs
            .iter()
            .map(|msg| {
                Ok(AnyProto {
                    type_url: self.type_name(msg.as_ref())?.to_string(),
                    value: msg.sign_bytes()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let fee = FeeProto {
            amount: tx
                .fee
                .amount
                .as_slice()
                .iter()
                .map(|coin| CoinProto {
                    denom: coin.denom.clone(),
                    amount: coin.amount.to_string(),
                })
                .collect(),
            gas_limit: tx.fee.gas,
        };

        let proto = TxProto {
            body: Some(TxBodyProto {
                messages,
                memo: tx.memo.to_string(),
            }),
            auth_info: Some(AuthInfoProto {
                signer_infos: tx
                    .signatures
                    .iter()
                    .map(|sig| SignerInfoProto {
                        public_key: sig.pub_key.clone(),
                        sequence: tx.sequence,
                    })
                    .collect(),
                fee: Some(fee),
            }),
            signatures: tx.signatures.iter().map(|s| s.signature.clone()).collect(),
        };

        Ok(proto.encode_length_delimited_to_vec())
    }

    /// Decode length-prefixed protobuf produced by [`Codec::encode_tx`]
    pub fn decode_tx(&self, bytes: &[u8]) -> Result<DecodedTx> {
        let proto = TxProto::decode_length_delimited(bytes)?;
        let body = proto
            .body
            .ok_or_else(|| CodecError::InvalidTx("missing body".to_string()))?;
        let auth_info = proto
            .auth_info
            .ok_or_else(|| CodecError::InvalidTx("missing auth info".to_string()))?;

        let msgs = body
            .messages
            .iter()
            .map(|any| self.decode_msg(&any.type_url, &any.value))
            .collect::<Result<Vec<_>>>()?;

        let fee_proto = auth_info.fee.unwrap_or_default();
        let coins = fee_proto
            .amount
            .into_iter()
            .map(|c| {
                let amount = c
                    .amount
                    .parse::<u128>()
                    .map_err(|_| CodecError::InvalidTx(format!("invalid fee amount {}", c.amount)))?;
                Coin::new(c.denom, amount).map_err(|e| CodecError::InvalidTx(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        let fee = StdFee::new(
            Coins::new(coins).map_err(|e| CodecError::InvalidTx(e.to_string()))?,
            fee_proto.gas_limit,
        );

        if auth_info.signer_infos.len() != proto.signatures.len() {
            return Err(CodecError::InvalidTx(format!(
                "{} signer infos for {} signatures",
                auth_info.signer_infos.len(),
                proto.signatures.len()
            )));
        }
        let sequence = auth_info
            .signer_infos
            .first()
            .map(|info| info.sequence)
            .unwrap_or_default();
        let signatures = auth_info
            .signer_infos
            .into_iter()
            .zip(proto.signatures)
            .map(|(info, signature)| StdSignature {
                pub_key: info.public_key,
                signature,
            })
            .collect();

        Ok(DecodedTx {
            msgs,
            fee,
            memo: body.memo,
            sequence,
            signatures,
        })
    }
}
