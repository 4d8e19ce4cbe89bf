//! Account addresses

use crate::error::SdkError;
use bech32::{Bech32, Hrp};
use ripemd::Ripemd160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Human readable part used for account addresses
pub const BECH32_PREFIX: &str = "cosmos";

/// Account address - 20 bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccAddress([u8; 20]);

impl AccAddress {
    /// Derive an address from a compressed public key:
    /// ripemd160(sha256(pubkey_bytes))
    pub fn from_pubkey(pubkey_bytes: &[u8]) -> Self {
        let sha256_hash = Sha256::digest(pubkey_bytes);
        let ripemd160_hash = Ripemd160::digest(sha256_hash);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&ripemd160_hash);
        Self(bytes)
    }

    /// Wrap raw address bytes
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Parse from a bech32 string, returning the prefix it was encoded with
    pub fn from_bech32(s: &str) -> Result<(String, Self), SdkError> {
        let (hrp, data) =
            bech32::decode(s).map_err(|e| SdkError::InvalidAddress(format!("{s}: {e}")))?;
        if data.len() != 20 {
            return Err(SdkError::InvalidAddress(format!(
                "{s}: expected 20 bytes, got {}",
                data.len()
            )));
        }
        let mut addr_bytes = [0u8; 20];
        addr_bytes.copy_from_slice(&data);
        Ok((hrp.to_string(), Self(addr_bytes)))
    }

    /// Encode with an explicit human readable part
    pub fn to_bech32(&self, hrp_str: &str) -> Result<String, SdkError> {
        let hrp = Hrp::parse(hrp_str).map_err(|e| SdkError::InvalidAddress(e.to_string()))?;
        bech32::encode::<Bech32>(hrp, &self.0).map_err(|e| SdkError::InvalidAddress(e.to_string()))
    }

    /// True for the all-zero address
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for AccAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hrp = Hrp::parse_unchecked(BECH32_PREFIX);
        let encoded = bech32::encode::<Bech32>(hrp, &self.0).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl FromStr for AccAddress {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (_, addr) = Self::from_bech32(s)?;
        Ok(addr)
    }
}

impl Serialize for AccAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AccAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bech32_roundtrip() {
        let addr = AccAddress::from_pubkey(&[1u8; 33]);
        let encoded = addr.to_string();
        assert!(encoded.starts_with("cosmos1"));

        let (hrp, decoded) = AccAddress::from_bech32(&encoded).unwrap();
        assert_eq!(hrp, "cosmos");
        assert_eq!(decoded, addr);
    }

    #[test]
    fn test_invalid_address() {
        assert!("cosmos1invalid".parse::<AccAddress>().is_err());
        assert!("".parse::<AccAddress>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let addr = AccAddress::from_pubkey(&[7u8; 33]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{addr}\""));

        let back: AccAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_empty() {
        assert!(AccAddress::default().is_empty());
        assert!(!AccAddress::from_pubkey(&[1u8; 33]).is_empty());
    }
}
