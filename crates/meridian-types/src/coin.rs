//! Coin and Coins types for handling tokens

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinError {
    #[error("invalid denomination:: {0}")]
    InvalidDenom(String),

    #[error("invalid amount:: {0}")]
    InvalidAmount(String),

    #[error("duplicate denomination:: {0}")]
    DuplicateDenom(String),
}

/// A single coin with denomination and amount
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "amount_string")]
    pub amount: u128,
}

impl Coin {
    /// Create a new coin, validating the denomination
    pub fn new(denom: impl Into<String>, amount: u128) -> Result<Self, CoinError> {
        let denom = denom.into();
        if !is_valid_denom(&denom) {
            return Err(CoinError::InvalidDenom(denom));
        }
        Ok(Self { denom, amount })
    }

    /// Check if coin is zero
    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = CoinError;

    /// Parse "100stake"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split_pos = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| CoinError::InvalidDenom(s.to_string()))?;
        let (amount, denom) = s.split_at(split_pos);
        let amount = amount
            .parse::<u128>()
            .map_err(|_| CoinError::InvalidAmount(s.to_string()))?;
        Coin::new(denom, amount)
    }
}

/// A collection of coins, always sorted by denomination
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    /// Create a new Coins collection from a vector of coins.
    /// Zero coins are dropped, the rest are sorted by denomination and
    /// duplicates are rejected.
    pub fn new(mut coins: Vec<Coin>) -> Result<Self, CoinError> {
        coins.retain(|c| !c.is_zero());
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));

        for window in coins.windows(2) {
            if window[0].denom == window[1].denom {
                return Err(CoinError::DuplicateDenom(window[0].denom.clone()));
            }
        }

        Ok(Self(coins))
    }

    /// Create an empty Coins collection
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get coins as slice
    pub fn as_slice(&self) -> &[Coin] {
        &self.0
    }

    /// Sorted, duplicate free and every denom well formed
    pub fn is_valid(&self) -> bool {
        self.0.iter().all(|c| is_valid_denom(&c.denom))
            && self.0.windows(2).all(|w| w[0].denom < w[1].denom)
    }

    /// Every coin carries a positive amount
    pub fn is_all_positive(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(|c| c.amount > 0)
    }

    /// Add a coin to the collection
    pub fn add(&mut self, coin: Coin) -> Result<(), CoinError> {
        if coin.is_zero() {
            return Ok(());
        }

        match self.0.iter_mut().find(|c| c.denom == coin.denom) {
            Some(existing) => {
                existing.amount = existing
                    .amount
                    .checked_add(coin.amount)
                    .ok_or_else(|| CoinError::InvalidAmount(coin.to_string()))?;
            }
            None => {
                self.0.push(coin);
                self.0.sort_by(|a, b| a.denom.cmp(&b.denom));
            }
        }

        Ok(())
    }

    /// Find amount of a specific denomination
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0
            .iter()
            .find(|c| c.denom == denom)
            .map(|c| c.amount)
            .unwrap_or(0)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "{}", s.join(","))
    }
}

impl FromStr for Coins {
    type Err = CoinError;

    /// Parse "10stake,5uatom"; the empty string is the empty set
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Ok(Self::empty());
        }
        let coins = s
            .split(',')
            .map(Coin::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Coins::new(coins)
    }
}

/// Validate denomination format
fn is_valid_denom(denom: &str) -> bool {
    if denom.len() < 2 || denom.len() > 127 {
        return false;
    }

    match denom.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }

    denom
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'))
}

/// Amounts travel as decimal strings
mod amount_string {
    use super::*;

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
