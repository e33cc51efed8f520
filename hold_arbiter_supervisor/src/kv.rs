//! Key-value persistence for holds.
//!
//! The host platform's storage is modelled as a flat string key-value store.
//! `KvHoldStore` lays a hold out as three logical keys per session:
//! a status flag, the JSON-serialized `HoldRecord`, and an opaque session blob.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::record::HoldRecord;
use crate::store::HoldStore;

const STATUS_PREFIX: &str = "hold.status.";
const DATA_PREFIX: &str = "hold.data.";
const SESSION_PREFIX: &str = "session.";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    /// Set several keys as one unit: on error, keys already written are
    /// restored to their previous values (best effort for plain backends).
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut written: Vec<(&str, Option<String>)> = Vec::with_capacity(entries.len());
        for &(key, value) in entries {
            let result = self.get(key).and_then(|prev| {
                self.set(key, value)?;
                Ok(prev)
            });
            match result {
                Ok(prev) => written.push((key, prev)),
                Err(e) => {
                    for (key, prev) in written.into_iter().rev() {
                        let undo = match prev {
                            Some(v) => self.set(key, &v),
                            None => self.remove(key),
                        };
                        if let Err(undo_err) = undo {
                            tracing::warn!(key, error = %undo_err, "failed to roll back key");
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    map: Mutex<BTreeMap<String, String>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let g = self.map.lock().map_err(|_| StorageError::poisoned())?;
        Ok(g.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut g = self.map.lock().map_err(|_| StorageError::poisoned())?;
        g.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut g = self.map.lock().map_err(|_| StorageError::poisoned())?;
        g.remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let g = self.map.lock().map_err(|_| StorageError::poisoned())?;
        Ok(g.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }
}

/// Key-value store persisted as one JSON object on disk.
///
/// Every write rewrites the file through a temp file + rename, so a crash
/// leaves either the old or the new contents.
#[derive(Debug)]
pub struct FileKvStore {
    path: PathBuf,
    map: Mutex<BTreeMap<String, String>>,
}

fn io_err(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Io {
        reason: format!("{}: {e}", path.display()),
    }
}

impl FileKvStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let map = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|e| StorageError::Corrupt {
                key: path.display().to_string(),
                reason: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(io_err(&path, e)),
        };
        Ok(Self {
            path,
            map: Mutex::new(map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let body = serde_json::to_vec(map).map_err(|e| StorageError::Serialize {
            key: self.path.display().to_string(),
            reason: e.to_string(),
        })?;
        let tmp = self.path.with_extension("tmp");
        let mut f = fs::File::create(&tmp).map_err(|e| io_err(&tmp, e))?;
        f.write_all(&body).map_err(|e| io_err(&tmp, e))?;
        f.sync_all().map_err(|e| io_err(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| io_err(&self.path, e))
    }
}

impl KeyValueStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let g = self.map.lock().map_err(|_| StorageError::poisoned())?;
        Ok(g.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut g = self.map.lock().map_err(|_| StorageError::poisoned())?;
        let prev = g.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&g) {
            // Keep memory in step with disk.
            match prev {
                Some(v) => g.insert(key.to_string(), v),
                None => g.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut g = self.map.lock().map_err(|_| StorageError::poisoned())?;
        let prev: Vec<(&str, Option<String>)> = entries
            .iter()
            .map(|&(key, value)| (key, g.insert(key.to_string(), value.to_string())))
            .collect();
        if let Err(e) = self.persist(&g) {
            for (key, old) in prev.into_iter().rev() {
                match old {
                    Some(v) => g.insert(key.to_string(), v),
                    None => g.remove(key),
                };
            }
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut g = self.map.lock().map_err(|_| StorageError::poisoned())?;
        let Some(prev) = g.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.persist(&g) {
            g.insert(key.to_string(), prev);
            return Err(e);
        }
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let g = self.map.lock().map_err(|_| StorageError::poisoned())?;
        Ok(g.keys().filter(|k| k.starts_with(prefix)).cloned().collect())
    }
}

/// `HoldStore` over any `KeyValueStore`.
///
/// One lock serializes every hold operation, which makes `update` atomic per
/// key even when the backend only offers plain get/set.
#[derive(Debug)]
pub struct KvHoldStore<K> {
    kv: K,
    lock: Mutex<()>,
}

impl<K: KeyValueStore> KvHoldStore<K> {
    pub fn new(kv: K) -> Self {
        Self {
            kv,
            lock: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &K {
        &self.kv
    }

    /// Store the opaque session blob handed out by the upstream handshake.
    pub fn save_session(&self, session_id: &str, blob: &str) -> Result<(), StorageError> {
        let _g = self.lock.lock().map_err(|_| StorageError::poisoned())?;
        self.kv.set(&format!("{SESSION_PREFIX}{session_id}"), blob)
    }

    pub fn load_session(&self, session_id: &str) -> Result<Option<String>, StorageError> {
        let _g = self.lock.lock().map_err(|_| StorageError::poisoned())?;
        self.kv.get(&format!("{SESSION_PREFIX}{session_id}"))
    }

    /// Raw status flag, as last written alongside the record.
    pub fn status_flag(&self, session_id: &str) -> Result<Option<String>, StorageError> {
        let _g = self.lock.lock().map_err(|_| StorageError::poisoned())?;
        self.kv.get(&format!("{STATUS_PREFIX}{session_id}"))
    }

    fn read(&self, session_id: &str) -> Result<Option<HoldRecord>, StorageError> {
        let key = format!("{DATA_PREFIX}{session_id}");
        match self.kv.get(&key)? {
            None => Ok(None),
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key,
                    reason: e.to_string(),
                }),
        }
    }

    fn write(&self, record: &HoldRecord) -> Result<(), StorageError> {
        let key = format!("{DATA_PREFIX}{}", record.session_id);
        let body = serde_json::to_string(record).map_err(|e| StorageError::Serialize {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        let flag_key = format!("{STATUS_PREFIX}{}", record.session_id);
        self.kv
            .set_many(&[(&key, &body), (&flag_key, record.status.as_str())])
    }
}

impl<K: KeyValueStore> HoldStore for KvHoldStore<K> {
    fn put(&self, record: &HoldRecord) -> Result<(), StorageError> {
        let _g = self.lock.lock().map_err(|_| StorageError::poisoned())?;
        self.write(record)
    }

    fn get(&self, session_id: &str) -> Result<Option<HoldRecord>, StorageError> {
        let _g = self.lock.lock().map_err(|_| StorageError::poisoned())?;
        self.read(session_id)
    }

    fn remove(&self, session_id: &str) -> Result<(), StorageError> {
        let _g = self.lock.lock().map_err(|_| StorageError::poisoned())?;
        self.kv.remove(&format!("{DATA_PREFIX}{session_id}"))?;
        self.kv.remove(&format!("{STATUS_PREFIX}{session_id}"))?;
        self.kv.remove(&format!("{SESSION_PREFIX}{session_id}"))
    }

    fn update(
        &self,
        session_id: &str,
        f: &mut dyn FnMut(&mut HoldRecord) -> bool,
    ) -> Result<bool, StorageError> {
        let _g = self.lock.lock().map_err(|_| StorageError::poisoned())?;
        let Some(mut rec) = self.read(session_id)? else {
            return Ok(false);
        };
        if !f(&mut rec) {
            return Ok(false);
        }
        self.write(&rec)?;
        Ok(true)
    }

    fn session_ids(&self) -> Result<Vec<String>, StorageError> {
        let _g = self.lock.lock().map_err(|_| StorageError::poisoned())?;
        let mut ids: Vec<String> = self
            .kv
            .keys_with_prefix(DATA_PREFIX)?
            .into_iter()
            .map(|k| k[DATA_PREFIX.len()..].to_string())
            .collect();
        ids.sort();
        Ok(ids)
    }
}
