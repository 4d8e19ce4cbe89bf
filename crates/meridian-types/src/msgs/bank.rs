//! Bank module message types

use crate::{address::AccAddress, coin::Coins, error::SdkError, msg::Msg};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;

pub const MODULE_NAME: &str = "bank";

/// MsgSend moves coins from one account to another
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    /// The sender's address
    pub from_address: AccAddress,
    /// The recipient's address
    pub to_address: AccAddress,
    /// The amount to send
    pub amount: Coins,
}

impl MsgSend {
    pub fn new(from_address: AccAddress, to_address: AccAddress, amount: Coins) -> Self {
        Self {
            from_address,
            to_address,
            amount,
        }
    }
}

impl Msg for MsgSend {
    fn route(&self) -> &'static str {
        MODULE_NAME
    }

    fn msg_type(&self) -> &'static str {
        "send"
    }

    fn validate_basic(&self) -> Result<(), SdkError> {
        if self.from_address.is_empty() {
            return Err(SdkError::InvalidAddress("missing sender address".to_string()));
        }
        if self.to_address.is_empty() {
            return Err(SdkError::InvalidAddress(
                "missing recipient address".to_string(),
            ));
        }
        if !self.amount.is_valid() || !self.amount.is_all_positive() {
            return Err(SdkError::InvalidCoins(self.amount.to_string()));
        }
        Ok(())
    }

    fn value(&self) -> Result<Value, SdkError> {
        Ok(serde_json::to_value(self)?)
    }

    fn signers(&self) -> Vec<AccAddress> {
        vec![self.from_address]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One side of a multi-send
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub address: AccAddress,
    pub coins: Coins,
}

/// Receiving side of a multi-send
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub address: AccAddress,
    pub coins: Coins,
}

fn validate_side(address: &AccAddress, coins: &Coins) -> Result<(), SdkError> {
    if address.is_empty() {
        return Err(SdkError::InvalidAddress(format!("account {address} is invalid")));
    }
    if coins.is_empty() {
        return Err(SdkError::InvalidCoins("empty coins".to_string()));
    }
    if !coins.is_valid() {
        return Err(SdkError::InvalidCoins(format!("invalid coins [{coins}]")));
    }
    Ok(())
}

/// MsgMultiSend moves coins between several inputs and outputs whose totals match
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgMultiSend {
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
}

impl MsgMultiSend {
    pub fn new(inputs: Vec<Input>, outputs: Vec<Output>) -> Self {
        Self { inputs, outputs }
    }
}

impl Msg for MsgMultiSend {
    fn route(&self) -> &'static str {
        MODULE_NAME
    }

    fn msg_type(&self) -> &'static str {
        "multisend"
    }

    fn validate_basic(&self) -> Result<(), SdkError> {
        if self.inputs.is_empty() {
            return Err(SdkError::InvalidCoins("no inputs".to_string()));
        }
        if self.outputs.is_empty() {
            return Err(SdkError::InvalidCoins("no outputs".to_string()));
        }

        let mut total_in = Coins::empty();
        for input in &self.inputs {
            validate_side(&input.address, &input.coins)?;
            for coin in input.coins.as_slice() {
                total_in
                    .add(coin.clone())
                    .map_err(|e| SdkError::InvalidCoins(e.to_string()))?;
            }
        }

        let mut total_out = Coins::empty();
        for output in &self.outputs {
            validate_side(&output.address, &output.coins)?;
            for coin in output.coins.as_slice() {
                total_out
                    .add(coin.clone())
                    .map_err(|e| SdkError::InvalidCoins(e.to_string()))?;
            }
        }

        if total_in != total_out {
            return Err(SdkError::InvalidCoins(
                "inputs and outputs don't match".to_string(),
            ));
        }
        Ok(())
    }

    fn value(&self) -> Result<Value, SdkError> {
        Ok(serde_json::to_value(self)?)
    }

    fn signers(&self) -> Vec<AccAddress> {
        self.inputs.iter().map(|input| input.address).collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
