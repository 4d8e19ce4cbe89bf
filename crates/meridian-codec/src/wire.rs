//! Protobuf representations of the signed transaction

use prost::Message;

/// Any-style envelope carrying one message
#[derive(Clone, PartialEq, Message)]
pub struct AnyProto {
    /// Registered message name, e.g. "cosmos-sdk/MsgSend"
    #[prost(string, tag = "1")]
    pub type_url: String,
    /// Canonical JSON of the message value
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TxBodyProto {
    #[prost(message, repeated, tag = "1")]
    pub messages: Vec<AnyProto>,
    #[prost(string, tag = "2")]
    pub memo: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct CoinProto {
    #[prost(string, tag = "1")]
    pub denom: String,
    #[prost(string, tag = "2")]
    pub amount: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct FeeProto {
    #[prost(message, repeated, tag = "1")]
    pub amount: Vec<CoinProto>,
    #[prost(uint64, tag = "2")]
    pub gas_limit: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct SignerInfoProto {
    /// Compressed secp256k1 public key
    #[prost(bytes = "vec", tag = "1")]
    pub public_key: Vec<u8>,
    #[prost(uint64, tag = "3")]
    pub sequence: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct AuthInfoProto {
    #[prost(message, repeated, tag = "1")]
    pub signer_infos: Vec<SignerInfoProto>,
    #[prost(message, optional, tag = "2")]
    pub fee: Option<FeeProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct TxProto {
    #[prost(message, optional, tag = "1")]
    pub body: Option<TxBodyProto>,
    #[prost(message, optional, tag = "2")]
    pub auth_info: Option<AuthInfoProto>,
    #[prost(bytes = "vec", repeated, tag = "3")]
    pub signatures: Vec<Vec<u8>>,
}
