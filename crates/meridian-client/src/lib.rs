//! Transaction construction and broadcast for meridian.
//!
//! [`BatchDispatcher`] is the caller surface. It validates messages, locks the
//! signer with [`AddressLocker`], builds signed transactions with
//! [`TxBuilder`] from state held in [`AccountCache`] and [`ParamCache`], and
//! submits them through a [`NodeTransport`].

pub mod account;
mod amino;
pub mod builder;
pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod locker;
pub mod params;
pub mod rpc;
pub mod transport;

pub use account::{AccountCache, AccountState, ACCOUNT_QUERY_PATH};
pub use builder::{canonical_sign_bytes, sign_doc, tx_hash, BaseTx, TxBuilder, TxConfig, TxContext};
pub use cache::{CachedValue, SharedCache};
pub use config::{ClientConfig, ConfigError};
pub use dispatcher::BatchDispatcher;
pub use error::{Error, Result, SendError};
pub use locker::{fnv1a_32, AddressGuard, AddressLocker};
pub use params::{params_path, ModuleParams, ParamCache};
pub use rpc::RpcTransport;
pub use transport::{NodeTransport, TransportError};
