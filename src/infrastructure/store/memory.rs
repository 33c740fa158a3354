//! In-process [`OrderStore`] for development and tests.
//!
//! Strings live in a [`HashMap`] and the index set in a [`BTreeSet`], both
//! behind one [`parking_lot::Mutex`] so a transaction's guards and writes are
//! applied under a single lock. Scan cursors are positions in the sorted
//! member list, so concurrent inserts and removals shift later pages exactly
//! as the weak listing guarantees allow.
//!
//! Data is not persisted and clones share the same state.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use super::index::{glob_match, IndexSet, ScanPage, SCAN_START};
use super::{OrderStore, StoreError, StoreResult, TxOp, TxOutcome};

#[derive(Debug, Default)]
struct State {
    strings: HashMap<String, String>,
    members: BTreeSet<String>,
}

impl State {
    /// Index of the first op whose guard fails against the current state.
    fn failed_guard(&self, ops: &[TxOp]) -> Option<usize> {
        ops.iter().position(|op| match op {
            TxOp::SetIfAbsent { key, .. } => self.strings.contains_key(key),
            TxOp::SetIfPresent { key, .. } | TxOp::DeleteExisting { key } => {
                !self.strings.contains_key(key)
            }
            TxOp::IndexAdd { .. } | TxOp::IndexRemove { .. } => false,
        })
    }

    fn apply(&mut self, op: TxOp) {
        match op {
            TxOp::SetIfAbsent { key, value } | TxOp::SetIfPresent { key, value } => {
                self.strings.insert(key, value);
            }
            TxOp::DeleteExisting { key } => {
                self.strings.remove(&key);
            }
            TxOp::IndexAdd { key } => {
                self.members.insert(key);
            }
            TxOp::IndexRemove { key } => {
                self.members.remove(&key);
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    index: IndexSet,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_index(index: IndexSet) -> Self {
        Self {
            state: Arc::default(),
            index,
        }
    }

    /// Snapshot of the index set in sorted order.
    pub fn index_members(&self) -> Vec<String> {
        self.state.lock().members.iter().cloned().collect()
    }

    /// Writes a raw value, bypassing the index. Intended for seeding tests.
    pub fn put_raw(&self, key: &str, value: &str) {
        self.state
            .lock()
            .strings
            .insert(key.to_string(), value.to_string());
    }
}

impl OrderStore for MemoryStore {
    fn get_string(&self, key: &str) -> StoreResult<String> {
        self.state
            .lock()
            .strings
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key))
    }

    fn set_if_absent(&self, key: &str, value: &str) -> StoreResult<bool> {
        let mut state = self.state.lock();
        if state.strings.contains_key(key) {
            return Ok(false);
        }
        state.strings.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    fn set_if_present(&self, key: &str, value: &str) -> StoreResult<()> {
        match self.state.lock().strings.get_mut(key) {
            Some(slot) => {
                *slot = value.to_string();
                Ok(())
            }
            None => Err(StoreError::not_found(key)),
        }
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.state.lock().strings.remove(key).is_some())
    }

    fn multi_get(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        let state = self.state.lock();
        Ok(keys.iter().map(|key| state.strings.get(key).cloned()).collect())
    }

    fn index(&self) -> &IndexSet {
        &self.index
    }

    fn index_add(&self, key: &str) -> StoreResult<()> {
        self.state.lock().members.insert(key.to_string());
        Ok(())
    }

    fn index_remove(&self, key: &str) -> StoreResult<()> {
        self.state.lock().members.remove(key);
        Ok(())
    }

    fn index_scan(&self, cursor: u64, pattern: &str, count: u64) -> StoreResult<ScanPage> {
        let state = self.state.lock();
        let start = usize::try_from(cursor).unwrap_or(usize::MAX);
        let count = usize::try_from(count.max(1)).unwrap_or(usize::MAX);

        // Like SSCAN, COUNT bounds the members examined; MATCH filters afterwards.
        let keys = state
            .members
            .iter()
            .skip(start)
            .take(count)
            .filter(|member| glob_match(pattern, member))
            .cloned()
            .collect();

        let next = start.saturating_add(count);
        let cursor = if next >= state.members.len() {
            SCAN_START
        } else {
            next as u64
        };

        Ok(ScanPage { keys, cursor })
    }

    fn execute(&self, ops: Vec<TxOp>) -> StoreResult<TxOutcome> {
        let mut state = self.state.lock();
        if let Some(op) = state.failed_guard(&ops) {
            return Ok(TxOutcome::Rejected { op });
        }
        for op in ops {
            state.apply(op);
        }
        Ok(TxOutcome::Committed)
    }

    fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
