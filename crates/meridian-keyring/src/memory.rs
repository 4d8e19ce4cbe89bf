//! In-memory keyring backend
//!
//! **WARNING**: keys live unencrypted in process memory. Passphrases are
//! checked against a SHA-256 digest only.

use crate::{KeyInfo, KeyManager, KeyringError};
use async_trait::async_trait;
use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use meridian_types::{AccAddress, StdSignature};
use parking_lot::RwLock;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

struct StoredKey {
    signing_key: SigningKey,
    pubkey: Vec<u8>,
    address: AccAddress,
    passphrase_digest: [u8; 32],
}

impl StoredKey {
    fn new(signing_key: SigningKey, password: &str) -> Self {
        let pubkey = signing_key
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec();
        let address = AccAddress::from_pubkey(&pubkey);
        Self {
            signing_key,
            pubkey,
            address,
            passphrase_digest: Sha256::digest(password.as_bytes()).into(),
        }
    }

    fn info(&self, name: &str) -> KeyInfo {
        KeyInfo {
            name: name.to_string(),
            pubkey: self.pubkey.clone(),
            address: self.address,
        }
    }
}

/// In-memory secp256k1 keyring
#[derive(Default)]
pub struct MemoryKeyring {
    keys: RwLock<HashMap<String, StoredKey>>,
}

impl MemoryKeyring {
    /// Create an empty keyring
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new key protected by `password`
    pub fn create_key(&self, name: &str, password: &str) -> Result<KeyInfo, KeyringError> {
        let mut bytes = [0u8; 32];
        let signing_key = loop {
            rand::thread_rng().fill_bytes(&mut bytes);
            // out-of-range scalars are astronomically rare; draw again
            if let Ok(key) = SigningKey::from_slice(&bytes) {
                break key;
            }
        };
        self.insert(name, StoredKey::new(signing_key, password))
    }

    /// Import a hex encoded 32-byte secp256k1 private key
    pub fn import_private_key(
        &self,
        name: &str,
        password: &str,
        private_key_hex: &str,
    ) -> Result<KeyInfo, KeyringError> {
        let bytes = hex::decode(private_key_hex)
            .map_err(|e| KeyringError::InvalidKey(format!("invalid hex private key: {e}")))?;
        let signing_key = SigningKey::from_slice(&bytes)
            .map_err(|e| KeyringError::InvalidKey(format!("invalid secp256k1 key: {e}")))?;
        self.insert(name, StoredKey::new(signing_key, password))
    }

    /// Get a key by name
    pub fn get_key(&self, name: &str) -> Result<KeyInfo, KeyringError> {
        self.keys
            .read()
            .get(name)
            .map(|key| key.info(name))
            .ok_or_else(|| KeyringError::KeyNotFound(name.to_string()))
    }

    /// List all stored keys, sorted by name
    pub fn list_keys(&self) -> Vec<KeyInfo> {
        let keys = self.keys.read();
        let mut infos: Vec<KeyInfo> = keys.iter().map(|(name, key)| key.info(name)).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Delete a key
    pub fn delete_key(&self, name: &str) -> Result<(), KeyringError> {
        self.keys
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| KeyringError::KeyNotFound(name.to_string()))
    }

    fn insert(&self, name: &str, key: StoredKey) -> Result<KeyInfo, KeyringError> {
        let mut keys = self.keys.write();
        if keys.contains_key(name) {
            return Err(KeyringError::KeyExists(name.to_string()));
        }
        let info = key.info(name);
        keys.insert(name.to_string(), key);
        Ok(info)
    }
}

#[async_trait]
impl KeyManager for MemoryKeyring {
    async fn sign(
        &self,
        name: &str,
        password: &str,
        data: &[u8],
    ) -> Result<StdSignature, KeyringError> {
        let keys = self.keys.read();
        let key = keys
            .get(name)
            .ok_or_else(|| KeyringError::KeyNotFound(name.to_string()))?;

        let digest: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        if digest != key.passphrase_digest {
            return Err(KeyringError::WrongPassphrase(name.to_string()));
        }

        // ECDSA over SHA-256 of the canonical bytes
        let signature: Signature = key.signing_key.sign(data);
        Ok(StdSignature {
            pub_key: key.pubkey.clone(),
            signature: signature.to_bytes().to_vec(),
        })
    }

    async fn query_address(&self, name: &str) -> Result<AccAddress, KeyringError> {
        self.get_key(name).map(|info| info.address)
    }
}

/// Verify a compact secp256k1 signature over `data`
pub fn verify_signature(pub_key: &[u8], data: &[u8], signature: &[u8]) -> Result<(), KeyringError> {
    let key = VerifyingKey::from_sec1_bytes(pub_key)
        .map_err(|e| KeyringError::InvalidKey(e.to_string()))?;
    let sig = Signature::from_slice(signature).map_err(|_| KeyringError::VerificationFailed)?;
    key.verify(data, &sig)
        .map_err(|_| KeyringError::VerificationFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY_HEX: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    #[tokio::test]
    async fn test_sign_and_verify() {
        let keyring = MemoryKeyring::new();
        let info = keyring.create_key("alice", "secret").unwrap();
        assert_eq!(info.pubkey.len(), 33);

        let sig = keyring.sign("alice", "secret", b"payload").await.unwrap();
        assert_eq!(sig.signature.len(), 64);
        assert_eq!(sig.pub_key, info.pubkey);
        verify_signature(&sig.pub_key, b"payload", &sig.signature).unwrap();
        assert_eq!(
            verify_signature(&sig.pub_key, b"other", &sig.signature),
            Err(KeyringError::VerificationFailed)
        );
    }

    #[tokio::test]
    async fn test_wrong_passphrase() {
        let keyring = MemoryKeyring::new();
        keyring.create_key("alice", "secret").unwrap();
        assert_eq!(
            keyring.sign("alice", "guess", b"payload").await,
            Err(KeyringError::WrongPassphrase("alice".to_string()))
        );
    }

    #[tokio::test]
    async fn test_query_address() {
        let keyring = MemoryKeyring::new();
        let info = keyring
            .import_private_key("bob", "pw", TEST_KEY_HEX)
            .unwrap();
        assert_eq!(keyring.query_address("bob").await.unwrap(), info.address);
        assert_eq!(info.address, AccAddress::from_pubkey(&info.pubkey));
        assert!(matches!(
            keyring.query_address("carol").await,
            Err(KeyringError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_import_is_deterministic() {
        let a = MemoryKeyring::new();
        let b = MemoryKeyring::new();
        let ka = a.import_private_key("k", "pw", TEST_KEY_HEX).unwrap();
        let kb = b.import_private_key("k", "other", TEST_KEY_HEX).unwrap();
        assert_eq!(ka.address, kb.address);
        assert!(a.import_private_key("k", "pw", TEST_KEY_HEX).is_err());
        assert!(a.import_private_key("x", "pw", "zz").is_err());
    }

    #[test]
    fn test_list_and_delete() {
        let keyring = MemoryKeyring::new();
        keyring.create_key("b", "pw").unwrap();
        keyring.create_key("a", "pw").unwrap();
        let names: Vec<String> = keyring.list_keys().into_iter().map(|k| k.name).collect();
        assert_eq!(names, vec!["a", "b"]);

        keyring.delete_key("a").unwrap();
        assert!(keyring.get_key("a").is_err());
        assert!(keyring.delete_key("a").is_err());
    }
}
