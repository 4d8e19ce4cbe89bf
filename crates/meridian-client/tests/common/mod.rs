//! In-process node used by the dispatcher tests
#![allow(dead_code)]

use async_trait::async_trait;
use meridian_client::{
    tx_hash, BaseTx, BatchDispatcher, ClientConfig, NodeTransport, TransportError,
    ACCOUNT_QUERY_PATH,
};
use meridian_codec::Codec;
use meridian_keyring::MemoryKeyring;
use meridian_types::msgs::MsgSend;
use meridian_types::{codes, AccAddress, BroadcastMode, Msg, ResultTx, SdkError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const PASSWORD: &str = "password";

/// A message routed to the size-limited `service` module
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCallService {
    pub consumer: AccAddress,
    pub input: String,
}

impl Msg for MsgCallService {
    fn route(&self) -> &'static str {
        "service"
    }

    fn msg_type(&self) -> &'static str {
        "call_service"
    }

    fn validate_basic(&self) -> Result<(), SdkError> {
        if self.consumer.is_empty() {
            return Err(SdkError::InvalidAddress("missing consumer".to_string()));
        }
        if self.input.is_empty() {
            return Err(SdkError::InvalidRequest("empty input".to_string()));
        }
        Ok(())
    }

    fn value(&self) -> Result<Value, SdkError> {
        Ok(serde_json::to_value(self)?)
    }

    fn signers(&self) -> Vec<AccAddress> {
        vec![self.consumer]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub fn codec() -> Codec {
    let mut codec = Codec::with_defaults();
    codec.register::<MsgCallService>("service/MsgCallService");
    codec
}

/// One accepted or rejected broadcast as seen by the node
#[derive(Clone, Debug)]
pub struct Submitted {
    pub address: String,
    pub sequence: u64,
    pub msgs: usize,
    pub memo: String,
    pub size: usize,
    pub mode: BroadcastMode,
    pub accepted: bool,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, (u64, u64)>,
    size_limits: HashMap<String, u64>,
    stale_sequence_failures: u32,
    fail_broadcast_at: Option<(usize, TransportError)>,
    fail_delivery_at: Option<(usize, TransportError)>,
    hang_broadcast_at: Option<usize>,
    hang_queries: bool,
    lagging_queries: bool,
    committed: HashMap<String, u64>,
    broadcast_calls: usize,
    panic_on_next_query: bool,
    submitted: Vec<Submitted>,
    simulations: usize,
    account_queries: usize,
    param_queries: usize,
    in_flight: HashMap<String, usize>,
    max_in_flight_per_signer: usize,
    in_flight_total: usize,
    max_in_flight_total: usize,
    height: i64,
}

/// Mock node tracking account sequences
pub struct MockNode {
    codec: Codec,
    delay: Duration,
    state: Mutex<State>,
}

impl MockNode {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Every broadcast takes `delay` to complete
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            codec: codec(),
            delay,
            state: Mutex::new(State::default()),
        }
    }

    pub fn set_size_limit(&self, module: &str, limit: u64) {
        self.state.lock().size_limits.insert(module.to_string(), limit);
    }

    /// Reject the next `n` broadcasts as stale sequences
    pub fn fail_sequence(&self, n: u32) {
        self.state.lock().stale_sequence_failures = n;
    }

    /// Reject the `nth` broadcast (1-based) with `error`
    pub fn fail_broadcast_at(&self, nth: usize, error: TransportError) {
        self.state.lock().fail_broadcast_at = Some((nth, error));
    }

    /// Accept the `nth` broadcast (1-based), consuming its sequence, but report `error`
    ///
    /// This is how a commit-mode `deliver_tx` failure looks to the client.
    pub fn fail_delivery_at(&self, nth: usize, error: TransportError) {
        self.state.lock().fail_delivery_at = Some((nth, error));
    }

    /// The `nth` broadcast call (1-based) never returns
    pub fn hang_broadcast_at(&self, nth: usize) {
        self.state.lock().hang_broadcast_at = Some(nth);
    }

    /// Queries never return
    pub fn hang_queries(&self) {
        self.state.lock().hang_queries = true;
    }

    /// Account queries report the last committed sequence instead of the
    /// mempool's, until [`MockNode::commit`] is called
    pub fn lag_account_queries(&self) {
        let mut state = self.state.lock();
        state.lagging_queries = true;
        state.committed = state
            .accounts
            .iter()
            .map(|(address, (_, sequence))| (address.clone(), *sequence))
            .collect();
    }

    /// Commit everything in the mempool
    pub fn commit(&self) {
        let mut state = self.state.lock();
        state.committed = state
            .accounts
            .iter()
            .map(|(address, (_, sequence))| (address.clone(), *sequence))
            .collect();
    }

    pub fn panic_on_next_query(&self) {
        self.state.lock().panic_on_next_query = true;
    }

    /// Another client spent `n` sequences of `address`
    pub fn bump_sequence(&self, address: &str, n: u64) {
        let mut state = self.state.lock();
        let next_number = state.accounts.len() as u64;
        let account = state
            .accounts
            .entry(address.to_string())
            .or_insert((next_number, 0));
        account.1 += n;
    }

    pub fn sequence(&self, address: &str) -> u64 {
        self.state
            .lock()
            .accounts
            .get(address)
            .map(|(_, sequence)| *sequence)
            .unwrap_or_default()
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.state.lock().submitted.clone()
    }

    pub fn accepted(&self) -> Vec<Submitted> {
        self.submitted().into_iter().filter(|s| s.accepted).collect()
    }

    pub fn simulations(&self) -> usize {
        self.state.lock().simulations
    }

    pub fn account_queries(&self) -> usize {
        self.state.lock().account_queries
    }

    pub fn param_queries(&self) -> usize {
        self.state.lock().param_queries
    }

    pub fn max_in_flight_per_signer(&self) -> usize {
        self.state.lock().max_in_flight_per_signer
    }

    pub fn max_in_flight_total(&self) -> usize {
        self.state.lock().max_in_flight_total
    }

    fn query_account(&self, data: &[u8]) -> Result<Vec<u8>, TransportError> {
        let request: Value = serde_json::from_slice(data)
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;
        let address = request["address"]
            .as_str()
            .ok_or_else(|| TransportError::rejected("sdk", codes::INVALID_REQUEST, "missing address"))?
            .to_string();

        let mut state = self.state.lock();
        state.account_queries += 1;
        let next_number = state.accounts.len() as u64;
        let (account_number, mut sequence) = *state.accounts.entry(address.clone()).or_insert((next_number, 0));
        if state.lagging_queries {
            sequence = state.committed.get(&address).copied().unwrap_or_default();
        }
        Ok(json!({
            "address": address,
            "account_number": account_number.to_string(),
            "sequence": sequence.to_string(),
        })
        .to_string()
        .into_bytes())
    }

    fn query_params(&self, module: &str) -> Vec<u8> {
        let mut state = self.state.lock();
        state.param_queries += 1;
        match state.size_limits.get(module) {
            Some(limit) => json!({ "tx_size_limit": limit.to_string() }),
            None => json!({}),
        }
        .to_string()
        .into_bytes()
    }

    fn enter(&self, address: &str) {
        let mut state = self.state.lock();
        let count = state.in_flight.entry(address.to_string()).or_default();
        *count += 1;
        let count = *count;
        state.max_in_flight_per_signer = state.max_in_flight_per_signer.max(count);
        state.in_flight_total += 1;
        state.max_in_flight_total = state.max_in_flight_total.max(state.in_flight_total);
    }

    fn leave(&self, address: &str) {
        let mut state = self.state.lock();
        if let Some(count) = state.in_flight.get_mut(address) {
            *count -= 1;
        }
        state.in_flight_total -= 1;
    }

    fn apply(&self, tx: &[u8], mode: BroadcastMode) -> Result<ResultTx, TransportError> {
        let decoded = self
            .codec
            .decode_tx(tx)
            .map_err(|e| TransportError::rejected("sdk", 2, e.to_string()))?;
        let signature = decoded
            .signatures
            .first()
            .ok_or_else(|| TransportError::rejected("sdk", codes::UNAUTHORIZED, "no signatures"))?;
        let address = AccAddress::from_pubkey(&signature.pub_key).to_string();

        let mut state = self.state.lock();
        let broadcast_number = state.submitted.len() + 1;
        let next_number = state.accounts.len() as u64;
        let expected = state
            .accounts
            .entry(address.clone())
            .or_insert((next_number, 0))
            .1;

        let mut record = Submitted {
            address: address.clone(),
            sequence: decoded.sequence,
            msgs: decoded.msgs.len(),
            memo: decoded.memo.clone(),
            size: tx.len(),
            mode,
            accepted: false,
        };

        let delivery_failure = match &state.fail_delivery_at {
            Some((nth, error)) if *nth == broadcast_number => Some(error.clone()),
            _ => None,
        };

        let rejection = if state.stale_sequence_failures > 0 {
            state.stale_sequence_failures -= 1;
            Some(TransportError::rejected(
                codes::SDK_CODESPACE,
                codes::INVALID_SEQUENCE,
                "account sequence mismatch",
            ))
        } else if decoded.sequence != expected {
            Some(TransportError::rejected(
                codes::SDK_CODESPACE,
                codes::INVALID_SEQUENCE,
                format!(
                    "account sequence mismatch, expected {expected}, got {}",
                    decoded.sequence
                ),
            ))
        } else {
            match &state.fail_broadcast_at {
                Some((nth, error)) if *nth == broadcast_number => Some(error.clone()),
                _ => None,
            }
        };

        if let Some(error) = rejection {
            state.submitted.push(record);
            return Err(error);
        }

        record.accepted = delivery_failure.is_none();
        state.submitted.push(record);
        if let Some(account) = state.accounts.get_mut(&address) {
            account.1 += 1;
        }
        state.height += 1;
        if let Some(error) = delivery_failure {
            return Err(error);
        }
        Ok(ResultTx {
            hash: tx_hash(tx),
            height: state.height,
            code: codes::OK,
            log: "[]".to_string(),
        })
    }
}

#[async_trait]
impl NodeTransport for MockNode {
    async fn query(&self, path: &str, data: &[u8]) -> Result<Vec<u8>, TransportError> {
        let (explode, hang) = {
            let mut state = self.state.lock();
            (std::mem::take(&mut state.panic_on_next_query), state.hang_queries)
        };
        if explode {
            panic!("node exploded");
        }
        if hang {
            return std::future::pending().await;
        }

        if path == ACCOUNT_QUERY_PATH {
            return self.query_account(data);
        }
        match path
            .strip_prefix("custom/")
            .and_then(|rest| rest.strip_suffix("/parameters"))
        {
            Some(module) => Ok(self.query_params(module)),
            None => Err(TransportError::rejected("sdk", 6, format!("unknown query path {path}"))),
        }
    }

    async fn broadcast(&self, tx: &[u8], mode: BroadcastMode) -> Result<ResultTx, TransportError> {
        let address = self
            .codec
            .decode_tx(tx)
            .ok()
            .and_then(|d| d.signatures.first().map(|s| AccAddress::from_pubkey(&s.pub_key).to_string()))
            .unwrap_or_default();

        let hang = {
            let mut state = self.state.lock();
            state.broadcast_calls += 1;
            state.hang_broadcast_at == Some(state.broadcast_calls)
        };
        if hang {
            return std::future::pending().await;
        }

        self.enter(&address);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = self.apply(tx, mode);
        self.leave(&address);
        result
    }

    async fn simulate(&self, tx: &[u8]) -> Result<ResultTx, TransportError> {
        self.codec
            .decode_tx(tx)
            .map_err(|e| TransportError::rejected("sdk", 2, e.to_string()))?;
        self.state.lock().simulations += 1;
        Ok(ResultTx {
            hash: tx_hash(tx),
            height: 0,
            code: codes::OK,
            log: "simulated".to_string(),
        })
    }
}

pub fn key_hex(n: u8) -> String {
    format!("{n:02x}").repeat(32)
}

/// Keyring holding one deterministic key per name, all under [`PASSWORD`]
pub fn keyring(names: &[&str]) -> MemoryKeyring {
    let keyring = MemoryKeyring::new();
    for (i, name) in names.iter().enumerate() {
        keyring
            .import_private_key(name, PASSWORD, &key_hex(i as u8 + 1))
            .unwrap();
    }
    keyring
}

pub fn config() -> ClientConfig {
    ClientConfig {
        chain_id: "mock-chain".to_string(),
        fee: "1stake".to_string(),
        ..ClientConfig::default()
    }
}

pub struct Harness {
    pub node: Arc<MockNode>,
    pub keys: Arc<MemoryKeyring>,
    pub dispatcher: Arc<BatchDispatcher>,
}

impl Harness {
    pub fn new(names: &[&str]) -> Self {
        Self::with_node(MockNode::new(), names)
    }

    pub fn with_node(node: MockNode, names: &[&str]) -> Self {
        let node = Arc::new(node);
        let keys = Arc::new(keyring(names));
        let dispatcher = BatchDispatcher::new(config(), node.clone(), keys.clone(), Arc::new(codec()))
            .unwrap();
        Self {
            node,
            keys,
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn address(&self, name: &str) -> AccAddress {
        self.keys.get_key(name).unwrap().address
    }
}

pub fn base_tx(name: &str) -> BaseTx {
    BaseTx::new(name, PASSWORD)
}

/// `n` bank transfers from `from`
pub fn transfers(from: AccAddress, n: usize) -> Vec<Box<dyn Msg>> {
    (0..n)
        .map(|i| {
            Box::new(MsgSend::new(
                from,
                AccAddress::from_pubkey(&[0xAA; 33]),
                format!("{}stake", i + 1).parse().unwrap(),
            )) as Box<dyn Msg>
        })
        .collect()
}

/// `n` service calls from `from`, each carrying `input_len` bytes of input
pub fn service_calls(from: AccAddress, n: usize, input_len: usize) -> Vec<Box<dyn Msg>> {
    (0..n)
        .map(|_| {
            Box::new(MsgCallService {
                consumer: from,
                input: "x".repeat(input_len),
            }) as Box<dyn Msg>
        })
        .collect()
}
