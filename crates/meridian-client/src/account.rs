//! Cached account state

use crate::cache::{CachedValue, SharedCache};
use crate::error::{Error, Result};
use crate::transport::{query_bounded, NodeTransport, TransportError};
use meridian_log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Query path for account state
pub const ACCOUNT_QUERY_PATH: &str = "custom/acc/account";

/// Account number and next sequence of an address, as reported by the node
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    #[serde(with = "crate::amino")]
    pub account_number: u64,
    #[serde(with = "crate::amino")]
    pub sequence: u64,
}

impl AccountState {
    /// Parse a node response, unwrapping a `{type, value}` envelope if present
    pub fn from_response(bytes: &[u8]) -> Result<Self> {
        let mut value: Value = serde_json::from_slice(bytes)?;
        if let Some(inner) = value.get_mut("value").filter(|v| v.is_object()) {
            value = inner.take();
        }
        Ok(serde_json::from_value(value)?)
    }
}

fn cache_key(address: &str) -> String {
    format!("account:{address}")
}

/// Account state cache
///
/// A node query may still report committed state while the mempool has
/// already consumed sequences. After the node accepts a transaction the
/// caller records the next sequence with [`AccountCache::record_accepted`];
/// on a rejection it invalidates the entry so the next read refetches it.
#[derive(Clone)]
pub struct AccountCache {
    store: Arc<SharedCache>,
    transport: Arc<dyn NodeTransport>,
    timeout: Duration,
}

impl AccountCache {
    pub fn new(store: Arc<SharedCache>, transport: Arc<dyn NodeTransport>, timeout: Duration) -> Self {
        Self {
            store,
            transport,
            timeout,
        }
    }

    /// Cached state of `address`, refreshed from the node when absent or expired
    pub async fn query_and_refresh_account(&self, address: &str) -> Result<AccountState> {
        let key = cache_key(address);
        if let Some(CachedValue::Account(state)) = self.store.get_fresh(&key) {
            return Ok(state);
        }

        let request = serde_json::to_vec(&serde_json::json!({ "address": address }))?;
        let bytes = query_bounded(
            self.transport.as_ref(),
            ACCOUNT_QUERY_PATH,
            &request,
            self.timeout,
        )
        .await?;
        let state = AccountState::from_response(&bytes).map_err(|e| Error::Query {
            path: ACCOUNT_QUERY_PATH.to_string(),
            source: TransportError::InvalidResponse(e.to_string()),
        })?;

        debug!(
            address,
            account_number = state.account_number,
            sequence = state.sequence,
            "refreshed account"
        );
        self.store.insert(key, CachedValue::Account(state));
        Ok(state)
    }

    /// Cache the state following a transaction the node accepted at `accepted.sequence`
    pub fn record_accepted(&self, address: &str, accepted: AccountState) -> AccountState {
        let next = AccountState {
            account_number: accepted.account_number,
            sequence: accepted.sequence + 1,
        };
        debug!(address, sequence = next.sequence, "advanced cached sequence");
        self.store.insert(cache_key(address), CachedValue::Account(next));
        next
    }

    /// Drop the cached entry for `address`
    pub fn invalidate(&self, address: &str) -> bool {
        self.store.remove(&cache_key(address))
    }

    /// Cached state without refreshing
    pub fn peek(&self, address: &str) -> Option<AccountState> {
        match self.store.get_fresh(&cache_key(address)) {
            Some(CachedValue::Account(state)) => Some(state),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use meridian_types::{BroadcastMode, ResultTx};
    use std::sync::atomic::{AtomicU64, Ordering};

    struct CountingNode {
        queries: AtomicU64,
    }

    #[async_trait]
    impl NodeTransport for CountingNode {
        async fn query(&self, path: &str, data: &[u8]) -> std::result::Result<Vec<u8>, TransportError> {
            assert_eq!(path, ACCOUNT_QUERY_PATH);
            let request: Value = serde_json::from_slice(data).unwrap();
            if request["address"] == "missing" {
                return Err(TransportError::rejected("sdk", 9, "unknown address"));
            }
            let n = self.queries.fetch_add(1, Ordering::SeqCst);
            Ok(format!(r#"{{"account_number":"7","sequence":"{n}"}}"#).into_bytes())
        }

        async fn broadcast(&self, _: &[u8], _: BroadcastMode) -> std::result::Result<ResultTx, TransportError> {
            unreachable!()
        }

        async fn simulate(&self, _: &[u8]) -> std::result::Result<ResultTx, TransportError> {
            unreachable!()
        }
    }

    fn cache(expiry: Duration) -> (AccountCache, Arc<CountingNode>) {
        let node = Arc::new(CountingNode {
            queries: AtomicU64::new(0),
        });
        let store = Arc::new(SharedCache::new(10, expiry));
        (
            AccountCache::new(store, node.clone(), Duration::from_secs(1)),
            node,
        )
    }

    #[tokio::test]
    async fn test_hit_does_not_query() {
        let (cache, node) = cache(Duration::from_secs(60));
        let first = cache.query_and_refresh_account("addr").await.unwrap();
        let second = cache.query_and_refresh_account("addr").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(node.queries.load(Ordering::SeqCst), 1);
        assert_eq!(cache.peek("addr"), Some(first));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let (cache, node) = cache(Duration::from_secs(60));
        assert_eq!(cache.query_and_refresh_account("addr").await.unwrap().sequence, 0);
        assert!(cache.invalidate("addr"));
        assert_eq!(cache.query_and_refresh_account("addr").await.unwrap().sequence, 1);
        assert_eq!(node.queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_record_accepted_serves_next_sequence() {
        let (cache, node) = cache(Duration::from_secs(60));
        let fetched = cache.query_and_refresh_account("addr").await.unwrap();
        let next = cache.record_accepted("addr", fetched);
        assert_eq!(next.account_number, 7);
        assert_eq!(next.sequence, fetched.sequence + 1);

        assert_eq!(cache.query_and_refresh_account("addr").await.unwrap(), next);
        assert_eq!(node.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refreshes() {
        let (cache, node) = cache(Duration::ZERO);
        cache.query_and_refresh_account("addr").await.unwrap();
        cache.query_and_refresh_account("addr").await.unwrap();
        assert_eq!(node.queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_query_failure_propagates() {
        let (cache, _) = cache(Duration::from_secs(60));
        let err = cache.query_and_refresh_account("missing").await.unwrap_err();
        assert!(matches!(err, Error::Query { ref path, .. } if path == ACCOUNT_QUERY_PATH));
        assert!(cache.peek("missing").is_none());
    }

    #[test]
    fn test_parse_response_shapes() {
        let plain = AccountState::from_response(br#"{"account_number":3,"sequence":"9"}"#).unwrap();
        assert_eq!(
            plain,
            AccountState {
                account_number: 3,
                sequence: 9
            }
        );

        let wrapped = AccountState::from_response(
            br#"{"type":"cosmos-sdk/Account","value":{"address":"x","account_number":"3","sequence":"9"}}"#,
        )
        .unwrap();
        assert_eq!(wrapped, plain);
    }
}
