//! Key management for meridian
//!
//! The transaction pipeline only sees the [`KeyManager`] contract: resolve a
//! key name to its address and sign canonical bytes under a passphrase.
//! [`MemoryKeyring`] is the in-process secp256k1 backend.

use async_trait::async_trait;
use meridian_types::{AccAddress, StdSignature};
use thiserror::Error;

pub mod memory;

pub use memory::{verify_signature, MemoryKeyring};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyringError {
    #[error("key not found:: {0}")]
    KeyNotFound(String),

    #[error("key already exists:: {0}")]
    KeyExists(String),

    #[error("wrong passphrase for key:: {0}")]
    WrongPassphrase(String),

    #[error("invalid key:: {0}")]
    InvalidKey(String),

    #[error("signature verification failed")]
    VerificationFailed,
}

/// Information about a stored key
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyInfo {
    pub name: String,
    /// Compressed secp256k1 public key
    pub pubkey: Vec<u8>,
    pub address: AccAddress,
}

/// Signer contract consumed by the transaction builder
#[async_trait]
pub trait KeyManager: Send + Sync {
    /// Sign `data` with the named key, unlocking it with `password`
    async fn sign(
        &self,
        name: &str,
        password: &str,
        data: &[u8],
    ) -> Result<StdSignature, KeyringError>;

    /// Resolve a key name to its account address
    async fn query_address(&self, name: &str) -> Result<AccAddress, KeyringError>;
}
