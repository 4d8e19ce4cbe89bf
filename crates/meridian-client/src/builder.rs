//! Transaction builder for constructing and signing transactions

use crate::account::AccountCache;
use crate::config::ClientConfig;
use crate::error::Result;
use meridian_codec::{Codec, StdTx};
use meridian_keyring::KeyManager;
use meridian_types::{json, AccAddress, BroadcastMode, Coins, Msg, StdFee, StdSignDoc};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;

/// Per-call transaction options
///
/// Empty fields fall back to the client configuration.
#[derive(Clone, Default)]
pub struct BaseTx {
    /// Key name of the signer
    pub from: String,
    /// Passphrase unlocking the signer's key
    pub password: String,
    pub fee: Coins,
    /// Gas limit; zero means the configured default
    pub gas: u64,
    pub memo: String,
    pub mode: Option<BroadcastMode>,
    /// Simulate instead of broadcasting
    pub simulate: bool,
}

impl BaseTx {
    pub fn new(from: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    pub fn with_fee(mut self, fee: Coins) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_gas(mut self, gas: u64) -> Self {
        self.gas = gas;
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn with_mode(mut self, mode: BroadcastMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }
}

impl fmt::Debug for BaseTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseTx")
            .field("from", &self.from)
            .field("fee", &self.fee)
            .field("gas", &self.gas)
            .field("memo", &self.memo)
            .field("mode", &self.mode)
            .field("simulate", &self.simulate)
            .finish_non_exhaustive()
    }
}

/// Transaction defaults taken from the client configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxConfig {
    pub chain_id: String,
    pub fee: Coins,
    pub gas: u64,
    pub mode: BroadcastMode,
}

impl TxConfig {
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            chain_id: config.chain_id.clone(),
            fee: config.default_fee()?,
            gas: config.gas,
            mode: config.mode,
        })
    }
}

/// Everything needed to sign one transaction attempt
#[derive(Clone)]
pub struct TxContext {
    pub from: String,
    pub address: AccAddress,
    pub chain_id: String,
    pub account_number: u64,
    pub sequence: u64,
    pub fee: StdFee,
    pub memo: String,
    pub mode: BroadcastMode,
    pub simulate: bool,
    pub password: String,
}

impl fmt::Debug for TxContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TxContext")
            .field("from", &self.from)
            .field("address", &self.address.to_string())
            .field("chain_id", &self.chain_id)
            .field("account_number", &self.account_number)
            .field("sequence", &self.sequence)
            .field("fee", &self.fee)
            .field("memo", &self.memo)
            .field("mode", &self.mode)
            .field("simulate", &self.simulate)
            .finish_non_exhaustive()
    }
}

/// The document a signer commits to
pub fn sign_doc(codec: &Codec, ctx: &TxContext, msgs: &[Box<dyn Msg>]) -> Result<StdSignDoc> {
    let msgs = msgs
        .iter()
        .map(|msg| codec.msg_envelope(msg.as_ref()))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(StdSignDoc {
        account_number: ctx.account_number,
        chain_id: ctx.chain_id.clone(),
        fee: ctx.fee.clone(),
        memo: ctx.memo.clone(),
        msgs,
        sequence: ctx.sequence,
    })
}

/// Sorted-key JSON of the sign document
///
/// Equal contexts and messages always produce identical bytes.
pub fn canonical_sign_bytes(codec: &Codec, ctx: &TxContext, msgs: &[Box<dyn Msg>]) -> Result<Vec<u8>> {
    Ok(json::to_sorted_vec(&sign_doc(codec, ctx, msgs)?)?)
}

/// Uppercase hex SHA-256 of the transaction bytes
pub fn tx_hash(tx_bytes: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(tx_bytes))
}

/// Builds signed transaction bytes from messages and call options
#[derive(Clone)]
pub struct TxBuilder {
    config: TxConfig,
    keys: Arc<dyn KeyManager>,
    codec: Arc<Codec>,
    accounts: AccountCache,
}

impl TxBuilder {
    pub fn new(
        config: TxConfig,
        keys: Arc<dyn KeyManager>,
        codec: Arc<Codec>,
        accounts: AccountCache,
    ) -> Self {
        Self {
            config,
            keys,
            codec,
            accounts,
        }
    }

    pub fn config(&self) -> &TxConfig {
        &self.config
    }

    /// Address of the key stored under `name`
    pub async fn signer_address(&self, name: &str) -> Result<AccAddress> {
        Ok(self.keys.query_address(name).await?)
    }

    /// Resolve the signer and its account state, then apply overrides
    pub async fn prepare(&self, base_tx: &BaseTx) -> Result<TxContext> {
        let address = self.signer_address(&base_tx.from).await?;
        let account = self
            .accounts
            .query_and_refresh_account(&address.to_string())
            .await?;

        let fee = if !base_tx.fee.is_empty() && base_tx.fee.is_valid() {
            base_tx.fee.clone()
        } else {
            self.config.fee.clone()
        };
        let gas = if base_tx.gas > 0 {
            base_tx.gas
        } else {
            self.config.gas
        };

        Ok(TxContext {
            from: base_tx.from.clone(),
            address,
            chain_id: self.config.chain_id.clone(),
            account_number: account.account_number,
            sequence: account.sequence,
            fee: StdFee::new(fee, gas),
            memo: base_tx.memo.clone(),
            mode: base_tx.mode.unwrap_or(self.config.mode),
            simulate: base_tx.simulate,
            password: base_tx.password.clone(),
        })
    }

    /// Sign `msgs` and encode them as one transaction
    pub async fn build(&self, msgs: &[Box<dyn Msg>], base_tx: &BaseTx) -> Result<(Vec<u8>, TxContext)> {
        let ctx = self.prepare(base_tx).await?;
        let sign_bytes = canonical_sign_bytes(&self.codec, &ctx, msgs)?;
        let signature = self.keys.sign(&ctx.from, &ctx.password, &sign_bytes).await?;

        let tx_bytes = self.codec.encode_tx(&StdTx {
            msgs,
            fee: &ctx.fee,
            memo: &ctx.memo,
            sequence: ctx.sequence,
            signatures: std::slice::from_ref(&signature),
        })?;
        Ok((tx_bytes, ctx))
    }
}
