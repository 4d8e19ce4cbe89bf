//! The message capability contract

use crate::{address::AccAddress, error::SdkError, json};
use serde_json::Value;
use std::any::Any;
use std::fmt::Debug;

/// Trait implemented by every module message the client can submit
pub trait Msg: Debug + Send + Sync + 'static {
    /// Routing domain, i.e. the module name ("bank", "htlc")
    fn route(&self) -> &'static str;

    /// Action identifier within the module ("send", "claim_htlc")
    fn msg_type(&self) -> &'static str;

    /// Stateless structural validation
    fn validate_basic(&self) -> Result<(), SdkError>;

    /// JSON content of the message
    fn value(&self) -> Result<Value, SdkError>;

    /// Canonical bytes to be signed
    fn sign_bytes(&self) -> Result<Vec<u8>, SdkError> {
        Ok(json::sorted_bytes(&self.value()?)?)
    }

    /// Addresses that must authorize this message
    fn signers(&self) -> Vec<AccAddress>;

    /// Get a reference to self as Any for registry lookups
    fn as_any(&self) -> &dyn Any;
}
