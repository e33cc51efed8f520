//! Hold state store: the single source of truth for in-flight holds.
//!
//! All mutation goes through `put` / `update` / `remove`. Implementations must
//! make each operation atomic per session id; `update` is the read-modify-write
//! primitive the supervisor uses to claim a completion exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StorageError;
use crate::record::HoldRecord;

pub trait HoldStore: Send + Sync {
    /// Insert or replace the record for `record.session_id` (last writer wins).
    fn put(&self, record: &HoldRecord) -> Result<(), StorageError>;

    fn get(&self, session_id: &str) -> Result<Option<HoldRecord>, StorageError>;

    /// Remove the record. Removing an absent record is not an error.
    fn remove(&self, session_id: &str) -> Result<(), StorageError>;

    /// Apply `f` to the stored record under the per-key lock.
    ///
    /// `f` returns true to write the modified record back. Returns true only if
    /// a record existed and was written.
    fn update(
        &self,
        session_id: &str,
        f: &mut dyn FnMut(&mut HoldRecord) -> bool,
    ) -> Result<bool, StorageError>;

    /// All stored session ids, sorted.
    fn session_ids(&self) -> Result<Vec<String>, StorageError>;
}

impl<T: HoldStore + ?Sized> HoldStore for Arc<T> {
    fn put(&self, record: &HoldRecord) -> Result<(), StorageError> {
        (**self).put(record)
    }
    fn get(&self, session_id: &str) -> Result<Option<HoldRecord>, StorageError> {
        (**self).get(session_id)
    }
    fn remove(&self, session_id: &str) -> Result<(), StorageError> {
        (**self).remove(session_id)
    }
    fn update(
        &self,
        session_id: &str,
        f: &mut dyn FnMut(&mut HoldRecord) -> bool,
    ) -> Result<bool, StorageError> {
        (**self).update(session_id, f)
    }
    fn session_ids(&self) -> Result<Vec<String>, StorageError> {
        (**self).session_ids()
    }
}

/// Deterministic FNV-1a hash (stable across runs).
fn fnv1a_u64(s: &str) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for b in s.as_bytes() {
        h ^= *b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

fn shard_index(session_id: &str, shard_count: usize) -> usize {
    if shard_count <= 1 {
        return 0;
    }
    (fnv1a_u64(session_id) as usize) % shard_count
}

/// In-process store sharded by session id. Not durable across restarts;
/// use `KvHoldStore` over a persistent backend for that.
#[derive(Debug)]
pub struct MemoryHoldStore {
    shards: Vec<Mutex<HashMap<String, HoldRecord>>>,
}

impl MemoryHoldStore {
    /// `shards == 1` behaves like a single map behind one lock.
    pub fn new(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, session_id: &str) -> Result<MutexGuard<'_, HashMap<String, HoldRecord>>, StorageError> {
        self.shards[shard_index(session_id, self.shards.len())]
            .lock()
            .map_err(|_| StorageError::poisoned())
    }
}

impl Default for MemoryHoldStore {
    fn default() -> Self {
        Self::new(1)
    }
}

impl HoldStore for MemoryHoldStore {
    fn put(&self, record: &HoldRecord) -> Result<(), StorageError> {
        self.shard(&record.session_id)?
            .insert(record.session_id.clone(), record.clone());
        Ok(())
    }

    fn get(&self, session_id: &str) -> Result<Option<HoldRecord>, StorageError> {
        Ok(self.shard(session_id)?.get(session_id).cloned())
    }

    fn remove(&self, session_id: &str) -> Result<(), StorageError> {
        self.shard(session_id)?.remove(session_id);
        Ok(())
    }

    fn update(
        &self,
        session_id: &str,
        f: &mut dyn FnMut(&mut HoldRecord) -> bool,
    ) -> Result<bool, StorageError> {
        let mut guard = self.shard(session_id)?;
        let Some(stored) = guard.get_mut(session_id) else {
            return Ok(false);
        };
        let mut draft = stored.clone();
        if f(&mut draft) {
            *stored = draft;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn session_ids(&self) -> Result<Vec<String>, StorageError> {
        let mut out = Vec::new();
        // Lock shards in a stable order.
        for shard in &self.shards {
            let guard = shard.lock().map_err(|_| StorageError::poisoned())?;
            out.extend(guard.keys().cloned());
        }
        out.sort();
        Ok(out)
    }
}
