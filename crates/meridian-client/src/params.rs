//! Cached module parameters

use crate::cache::{CachedValue, SharedCache};
use crate::error::{Error, Result};
use crate::transport::{query_bounded, NodeTransport, TransportError};
use meridian_log::debug;
use meridian_types::Msg;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Parameters of one module
///
/// Only `tx_size_limit` is interpreted; other fields are kept as returned.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleParams {
    #[serde(
        default,
        with = "crate::amino::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub tx_size_limit: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// ABCI path of a module's parameters
pub fn params_path(module: &str) -> String {
    format!("custom/{module}/parameters")
}

fn cache_key(module: &str) -> String {
    format!("params:{module}")
}

/// Module parameter cache
#[derive(Clone)]
pub struct ParamCache {
    store: Arc<SharedCache>,
    transport: Arc<dyn NodeTransport>,
    timeout: Duration,
    size_limited_modules: Vec<String>,
}

impl ParamCache {
    pub fn new(
        store: Arc<SharedCache>,
        transport: Arc<dyn NodeTransport>,
        timeout: Duration,
        size_limited_modules: Vec<String>,
    ) -> Self {
        Self {
            store,
            transport,
            timeout,
            size_limited_modules,
        }
    }

    /// Cached parameters of `module`, refreshed when absent or expired
    pub async fn query_params(&self, module: &str) -> Result<ModuleParams> {
        let key = cache_key(module);
        if let Some(CachedValue::Params(params)) = self.store.get_fresh(&key) {
            return Ok(params);
        }

        let path = params_path(module);
        let bytes = query_bounded(self.transport.as_ref(), &path, &[], self.timeout).await?;
        let params: ModuleParams = serde_json::from_slice(&bytes).map_err(|e| Error::Query {
            path: path.clone(),
            source: TransportError::InvalidResponse(e.to_string()),
        })?;

        debug!(module, tx_size_limit = ?params.tx_size_limit, "refreshed module params");
        self.store.insert(key, CachedValue::Params(params.clone()));
        Ok(params)
    }

    /// Drop the cached entry for `module`
    pub fn invalidate(&self, module: &str) -> bool {
        self.store.remove(&cache_key(module))
    }

    /// Smallest size limit declared by a size-limited module that `msgs` route to
    ///
    /// `None` when no message routes to such a module or none declares a limit.
    pub async fn tx_size_limit(&self, msgs: &[Box<dyn Msg>]) -> Result<Option<u64>> {
        let mut limit: Option<u64> = None;
        for module in &self.size_limited_modules {
            if !msgs.iter().any(|msg| msg.route() == module) {
                continue;
            }
            if let Some(declared) = self.query_params(module).await?.tx_size_limit {
                limit = Some(limit.map_or(declared, |current| current.min(declared)));
            }
        }
        Ok(limit)
    }
}
