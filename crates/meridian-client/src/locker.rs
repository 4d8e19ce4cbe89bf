//! Per-signer mutual exclusion
//!
//! Signers hash onto a fixed set of shards. Two signers that land in the same
//! shard serialize against each other even though they are unrelated.

use tokio::sync::{Mutex, MutexGuard};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(FNV_PRIME)
    })
}

/// Sharded signer lock
///
/// Not reentrant: locking the same signer twice from one task deadlocks.
#[derive(Debug)]
pub struct AddressLocker {
    shards: Vec<Mutex<()>>,
}

/// Held while a signer is locked; dropping it unlocks
#[derive(Debug)]
pub struct AddressGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl AddressLocker {
    /// Create a locker with `shards` shards (at least one)
    pub fn new(shards: usize) -> Self {
        Self {
            shards: (0..shards.max(1)).map(|_| Mutex::new(())).collect(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Shard that serializes `signer`
    pub fn shard_index(&self, signer: &str) -> usize {
        fnv1a_32(signer.as_bytes()) as usize % self.shards.len()
    }

    /// Wait until `signer` is free and lock it
    pub async fn lock(&self, signer: &str) -> AddressGuard<'_> {
        AddressGuard {
            _guard: self.shards[self.shard_index(signer)].lock().await,
        }
    }

    /// Lock `signer` only if nobody holds its shard
    pub fn try_lock(&self, signer: &str) -> Option<AddressGuard<'_>> {
        self.shards[self.shard_index(signer)]
            .try_lock()
            .ok()
            .map(|guard| AddressGuard { _guard: guard })
    }
}
