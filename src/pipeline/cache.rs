// src/pipeline/cache.rs

use sha2::{Digest, Sha256};
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, RwLock},
};
use tracing::debug;

use crate::normalize::CleanedTable;

/// Identity of an input: SHA-256 of its bytes. An edited file gets a new key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey(String);

impl SourceKey {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(format!("{:x}", hasher.finalize()))
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0[..12])
    }
}

type Slot = Arc<RwLock<Option<Arc<CleanedTable>>>>;

/// Memoized cleaned tables, each key locked independently so concurrent
/// requests for the same source compute it once.
///
/// Nothing is evicted: the cache holds one table per distinct successfully
/// parsed content for as long as it lives. Failed keys leave no entry behind.
#[derive(Default)]
pub struct TableCache {
    map: RwLock<HashMap<SourceKey, Slot>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map
            .read()
            .map(|m| m.values().filter(|s| s.read().map_or(false, |v| v.is_some())).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &SourceKey) -> Option<Arc<CleanedTable>> {
        let slot = self.map.read().ok()?.get(key).cloned()?;
        let cached = slot.read().ok()?.clone();
        cached
    }

    /// Return the cached table for `key`, or run `compute` and remember a
    /// successful result. Errors are handed back and never cached.
    pub fn get_or_try_insert<E, F>(&self, key: &SourceKey, compute: F) -> Result<Arc<CleanedTable>, E>
    where
        F: FnOnce() -> Result<CleanedTable, E>,
    {
        // 1) Acquire or insert the per-key slot
        let slot = {
            let existing = self
                .map
                .read()
                .unwrap_or_else(|p| p.into_inner())
                .get(key)
                .cloned();
            match existing {
                Some(slot) => slot,
                None => {
                    let mut map_w = self.map.write().unwrap_or_else(|p| p.into_inner());
                    Arc::clone(map_w.entry(key.clone()).or_default())
                }
            }
        };

        // 2) Fast path
        if let Some(table) = slot.read().unwrap_or_else(|p| p.into_inner()).as_ref() {
            debug!(%key, "table cache hit");
            return Ok(Arc::clone(table));
        }

        // 3) Compute under the slot's write lock, double-checking first
        let mut slot_w = slot.write().unwrap_or_else(|p| p.into_inner());
        if let Some(table) = slot_w.as_ref() {
            return Ok(Arc::clone(table));
        }
        debug!(%key, "table cache miss");
        match compute() {
            Ok(table) => {
                let table = Arc::new(table);
                *slot_w = Some(Arc::clone(&table));
                Ok(table)
            }
            Err(e) => {
                drop(slot_w);
                self.discard_empty(key, &slot);
                Err(e)
            }
        }
    }

    /// Drop `slot` from the map if it is still the entry for `key` and no
    /// other caller has filled it meanwhile. Locks map before slot, as
    /// every other path does.
    fn discard_empty(&self, key: &SourceKey, slot: &Slot) {
        let mut map_w = self.map.write().unwrap_or_else(|p| p.into_inner());
        let unused = map_w.get(key).is_some_and(|current| {
            Arc::ptr_eq(current, slot)
                && current.read().map_or(true, |v| v.is_none())
        });
        if unused {
            map_w.remove(key);
        }
    }
}
