//! Error handling for meridian

use thiserror::Error;

/// Node-side error codes in the `sdk` codespace
pub mod codes {
    /// Codespace of errors raised by the SDK ante chain
    pub const SDK_CODESPACE: &str = "sdk";
    /// Success
    pub const OK: u32 = 0;
    /// Internal error
    pub const INTERNAL: u32 = 1;
    /// Invalid request
    pub const INVALID_REQUEST: u32 = 3;
    /// Unauthorized
    pub const UNAUTHORIZED: u32 = 4;
    /// Insufficient funds
    pub const INSUFFICIENT_FUNDS: u32 = 5;
    /// Invalid address
    pub const INVALID_ADDRESS: u32 = 7;
    /// Transaction too large
    pub const TX_TOO_LARGE: u32 = 21;
    /// Account sequence mismatch
    pub const INVALID_SEQUENCE: u32 = 32;
}

/// Errors raised while validating or encoding messages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("encoding failed: {0}")]
    Encoding(String),
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::Encoding(err.to_string())
    }
}

/// Errors that map onto ABCI codespace/code pairs
pub trait IsSdkError {
    /// The module codespace (e.g. "sdk")
    fn codespace(&self) -> &'static str;

    /// The numeric error code within the codespace
    fn code(&self) -> u32;
}

impl IsSdkError for SdkError {
    fn codespace(&self) -> &'static str {
        codes::SDK_CODESPACE
    }

    fn code(&self) -> u32 {
        match self {
            SdkError::InvalidAddress(_) => codes::INVALID_ADDRESS,
            SdkError::InvalidCoins(_) => 10,
            SdkError::InvalidRequest(_) => codes::INVALID_REQUEST,
            SdkError::Unauthorized(_) => codes::UNAUTHORIZED,
            SdkError::Encoding(_) => codes::INTERNAL,
        }
    }
}
