//! Hash time locked contract messages

use crate::{address::AccAddress, coin::Coins, error::SdkError, msg::Msg};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;

pub const MODULE_NAME: &str = "htlc";

/// Hex length of the secret
pub const SECRET_LENGTH: usize = 64;
/// Hex length of the hash lock
pub const HASH_LOCK_LENGTH: usize = 64;
/// Maximum length of the receiver address on the counterparty chain
pub const MAX_LENGTH_FOR_ADDRESS_ON_OTHER_CHAIN: usize = 128;
/// Minimum time span of an HTLC, in blocks
pub const MIN_TIME_LOCK: u64 = 50;
/// Maximum time span of an HTLC, in blocks
pub const MAX_TIME_LOCK: u64 = 25480;

fn parse_sender(sender: &str) -> Result<AccAddress, SdkError> {
    sender
        .parse()
        .map_err(|e| SdkError::InvalidAddress(format!("invalid sender address ({e})")))
}

fn validate_hex(field: &str, value: &str, expected_len: usize) -> Result<(), SdkError> {
    if hex::decode(value).is_err() {
        return Err(SdkError::InvalidRequest(format!(
            "{field} must be a hex encoded string"
        )));
    }
    if value.len() != expected_len {
        return Err(SdkError::InvalidRequest(format!(
            "length of the {field} must be {expected_len} in bytes"
        )));
    }
    Ok(())
}

/// Lock coins behind a hash and a time lock
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateHtlc {
    pub sender: String,
    pub to: String,
    pub receiver_on_other_chain: String,
    pub amount: Coins,
    pub hash_lock: String,
    pub time_lock: u64,
}

impl Msg for MsgCreateHtlc {
    fn route(&self) -> &'static str {
        MODULE_NAME
    }

    fn msg_type(&self) -> &'static str {
        "create_htlc"
    }

    fn validate_basic(&self) -> Result<(), SdkError> {
        parse_sender(&self.sender)?;
        if self.to.is_empty() {
            return Err(SdkError::InvalidAddress("recipient missing".to_string()));
        }
        if self.receiver_on_other_chain.len() > MAX_LENGTH_FOR_ADDRESS_ON_OTHER_CHAIN {
            return Err(SdkError::InvalidRequest(format!(
                "length of the receiver on other chain must be between [0,{MAX_LENGTH_FOR_ADDRESS_ON_OTHER_CHAIN}]"
            )));
        }
        if !self.amount.is_valid() || !self.amount.is_all_positive() {
            return Err(SdkError::InvalidCoins(
                "the transferred amount must be valid".to_string(),
            ));
        }
        validate_hex("hash lock", &self.hash_lock, HASH_LOCK_LENGTH)?;
        if !(MIN_TIME_LOCK..=MAX_TIME_LOCK).contains(&self.time_lock) {
            return Err(SdkError::InvalidRequest(format!(
                "the time lock must be between [{MIN_TIME_LOCK},{MAX_TIME_LOCK}]"
            )));
        }
        Ok(())
    }

    fn value(&self) -> Result<Value, SdkError> {
        Ok(serde_json::to_value(self)?)
    }

    fn signers(&self) -> Vec<AccAddress> {
        parse_sender(&self.sender).into_iter().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Claim locked coins by revealing the secret
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgClaimHtlc {
    pub sender: String,
    pub hash_lock: String,
    pub secret: String,
}

impl Msg for MsgClaimHtlc {
    fn route(&self) -> &'static str {
        MODULE_NAME
    }

    fn msg_type(&self) -> &'static str {
        "claim_htlc"
    }

    fn validate_basic(&self) -> Result<(), SdkError> {
        parse_sender(&self.sender)?;
        validate_hex("hash lock", &self.hash_lock, HASH_LOCK_LENGTH)?;
        validate_hex("secret", &self.secret, SECRET_LENGTH)
    }

    fn value(&self) -> Result<Value, SdkError> {
        Ok(serde_json::to_value(self)?)
    }

    fn signers(&self) -> Vec<AccAddress> {
        parse_sender(&self.sender).into_iter().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Refund an expired HTLC to its creator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgRefundHtlc {
    pub sender: String,
    pub hash_lock: String,
}

impl Msg for MsgRefundHtlc {
    fn route(&self) -> &'static str {
        MODULE_NAME
    }

    fn msg_type(&self) -> &'static str {
        "refund_htlc"
    }

    fn validate_basic(&self) -> Result<(), SdkError> {
        parse_sender(&self.sender)?;
        validate_hex("hash lock", &self.hash_lock, HASH_LOCK_LENGTH)
    }

    fn value(&self) -> Result<Value, SdkError> {
        Ok(serde_json::to_value(self)?)
    }

    fn signers(&self) -> Vec<AccAddress> {
        parse_sender(&self.sender).into_iter().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
