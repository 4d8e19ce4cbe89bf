//! Batched, sequenced transaction submission
//!
//! A send validates every message, locks the signer, then submits the
//! messages in consecutive sub-batches. Each accepted sub-batch advances the
//! cached sequence, so the next one does not depend on the node's committed
//! state catching up with its mempool. A sub-batch that exceeds the node's
//! size limit makes the remaining messages go out in halves. A stale sequence
//! rejection refreshes the account and rebuilds the same sub-batch, up to the
//! configured number of attempts.

use crate::account::{AccountCache, AccountState};
use crate::builder::{BaseTx, TxBuilder, TxConfig};
use crate::cache::SharedCache;
use crate::config::ClientConfig;
use crate::error::{Error, Result, SendError};
use crate::locker::AddressLocker;
use crate::params::ParamCache;
use crate::transport::{bounded, NodeTransport};
use futures::FutureExt;
use meridian_codec::Codec;
use meridian_keyring::KeyManager;
use meridian_log::{debug, error, info, warn};
use meridian_types::{Msg, ResultTx, SdkError};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

enum Submission {
    Accepted(ResultTx),
    TooLarge { size: usize, limit: u64 },
}

/// Entry point for sending messages
pub struct BatchDispatcher {
    config: ClientConfig,
    transport: Arc<dyn NodeTransport>,
    locker: AddressLocker,
    accounts: AccountCache,
    params: ParamCache,
    builder: TxBuilder,
}

impl BatchDispatcher {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn NodeTransport>,
        keys: Arc<dyn KeyManager>,
        codec: Arc<Codec>,
    ) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(SharedCache::new(
            config.cache_capacity,
            config.cache_expiry(),
        ));
        let accounts = AccountCache::new(store.clone(), transport.clone(), config.timeout());
        let params = ParamCache::new(
            store,
            transport.clone(),
            config.timeout(),
            config.size_limited_modules.clone(),
        );
        let builder = TxBuilder::new(
            TxConfig::from_config(&config)?,
            keys,
            codec,
            accounts.clone(),
        );

        Ok(Self {
            locker: AddressLocker::new(config.lock_shards),
            config,
            transport,
            accounts,
            params,
            builder,
        })
    }

    pub fn account_cache(&self) -> &AccountCache {
        &self.accounts
    }

    pub fn param_cache(&self) -> &ParamCache {
        &self.params
    }

    pub fn locker(&self) -> &AddressLocker {
        &self.locker
    }

    pub fn builder(&self) -> &TxBuilder {
        &self.builder
    }

    /// Send `msgs` signed by `base_tx.from`, one result per submitted transaction
    ///
    /// On failure the error carries the results of the transactions that
    /// were accepted before it, in order.
    pub async fn send(
        &self,
        msgs: &[Box<dyn Msg>],
        base_tx: &BaseTx,
    ) -> std::result::Result<Vec<ResultTx>, SendError> {
        let mut results = Vec::new();
        let outcome = AssertUnwindSafe(self.run(msgs, base_tx, &mut results))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(())) => Ok(results),
            Ok(Err(error)) => Err(SendError::new(results, error)),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!(signer = %base_tx.from, reason = %reason, "broadcast msg failed");
                Err(SendError::new(
                    results,
                    Error::Fatal(format!("panic during send: {reason}")),
                ))
            }
        }
    }

    /// Send `msgs` and return the first transaction result
    pub async fn send_single(
        &self,
        msgs: &[Box<dyn Msg>],
        base_tx: &BaseTx,
    ) -> std::result::Result<ResultTx, SendError> {
        let results = self.send(msgs, base_tx).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| SendError::from(Error::Fatal("no transaction was sent".to_string())))
    }

    async fn run(
        &self,
        msgs: &[Box<dyn Msg>],
        base_tx: &BaseTx,
        results: &mut Vec<ResultTx>,
    ) -> Result<()> {
        validate(msgs)?;
        debug!(signer = %base_tx.from, msgs = msgs.len(), "validate msg success");

        // keyed by address so every key name for one account shares a lock
        let signer = self.builder.signer_address(&base_tx.from).await?.to_string();
        let _guard = self.locker.lock(&signer).await;
        self.dispatch(msgs, base_tx, results).await
    }

    async fn dispatch(
        &self,
        msgs: &[Box<dyn Msg>],
        base_tx: &BaseTx,
        results: &mut Vec<ResultTx>,
    ) -> Result<()> {
        let mut batch_size = self.config.max_msgs_per_tx.max(1);
        let mut start = 0;

        while start < msgs.len() {
            let end = msgs.len().min(start + batch_size);
            let chunk = &msgs[start..end];

            match self.submit(chunk, base_tx, results.len()).await? {
                Submission::Accepted(result) => {
                    results.push(result);
                    start = end;
                }
                Submission::TooLarge { size, limit } => {
                    if chunk.len() == 1 {
                        return Err(Error::Fatal(
                            Error::SizeLimitExceeded { size, limit }.to_string(),
                        ));
                    }
                    batch_size = chunk.len() / 2;
                    warn!(
                        signer = %base_tx.from,
                        size,
                        limit,
                        msgs = chunk.len(),
                        next = batch_size,
                        "tx size too large, splitting batch"
                    );
                }
            }
        }
        Ok(())
    }

    /// Build and submit one sub-batch, retrying stale sequences
    async fn submit(
        &self,
        chunk: &[Box<dyn Msg>],
        base_tx: &BaseTx,
        batch: usize,
    ) -> Result<Submission> {
        let retry_limit = self.config.sequence_retry_limit.max(1);
        let timeout = self.config.timeout();
        let mut attempts = 0;

        loop {
            attempts += 1;
            let (tx_bytes, ctx) = self.builder.build(chunk, base_tx).await?;
            let address = ctx.address.to_string();

            if let Some(limit) = self.params.tx_size_limit(chunk).await? {
                if tx_bytes.len() as u64 > limit {
                    self.accounts.invalidate(&address);
                    return Ok(Submission::TooLarge {
                        size: tx_bytes.len(),
                        limit,
                    });
                }
            }

            let outcome = if ctx.simulate {
                bounded("simulate", timeout, self.transport.simulate(&tx_bytes)).await
            } else {
                bounded("broadcast", timeout, self.transport.broadcast(&tx_bytes, ctx.mode)).await
            };
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.accounts.invalidate(&address);
                    return Err(err);
                }
            };

            match outcome {
                Ok(result) => {
                    if !ctx.simulate {
                        self.accounts.record_accepted(
                            &address,
                            AccountState {
                                account_number: ctx.account_number,
                                sequence: ctx.sequence,
                            },
                        );
                    }
                    info!(
                        hash = %result.hash,
                        height = result.height,
                        batch,
                        sequence = ctx.sequence,
                        "broadcast transaction success"
                    );
                    return Ok(Submission::Accepted(result));
                }
                Err(err) if err.is_invalid_sequence() => {
                    self.accounts.invalidate(&address);
                    warn!(
                        address = %address,
                        attempt = attempts,
                        sequence = ctx.sequence,
                        "cached account information outdated, retrying"
                    );
                    if attempts >= retry_limit {
                        return Err(Error::SequenceMismatch {
                            signer: address,
                            batch,
                            attempts,
                            log: err.log(),
                        });
                    }
                }
                Err(source) => {
                    // a failed delivery may still have consumed the sequence
                    self.accounts.invalidate(&address);
                    error!(address = %address, batch, error = %source, "broadcast transaction failed");
                    return Err(Error::Broadcast {
                        signer: address,
                        batch,
                        source,
                    });
                }
            }
        }
    }
}

fn validate(msgs: &[Box<dyn Msg>]) -> Result<()> {
    if msgs.is_empty() {
        return Err(Error::Validation {
            index: 0,
            source: SdkError::InvalidRequest("must have at least one message in list".to_string()),
        });
    }
    for (index, msg) in msgs.iter().enumerate() {
        msg.validate_basic()
            .map_err(|source| Error::Validation { index, source })?;
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
