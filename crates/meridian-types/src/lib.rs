//! Core types for meridian
//!
//! This crate provides the data structures shared by the codec, keyring and
//! client crates: account addresses, coins, the message capability trait,
//! transaction documents and the canonical JSON encoding used for signing.

pub mod address;
pub mod coin;
pub mod error;
pub mod json;
pub mod msg;
pub mod msgs;
pub mod tx;

pub use address::AccAddress;
pub use coin::{Coin, Coins};
pub use error::{codes, IsSdkError, SdkError};
pub use msg::Msg;
pub use tx::{BroadcastMode, ResultTx, StdFee, StdSignDoc, StdSignature};
