//! Key-value store access for order records.
//!
//! [`OrderStore`] is the seam between the repository and the concrete store.
//! It exposes string reads and writes, the order index set, and atomic
//! multi-key [`Transaction`]s. Two implementations exist:
//!
//! - [`RedisStore`]: production backend over a pooled Redis connection
//! - [`MemoryStore`]: in-process backend for development and tests

mod index;
mod memory;
mod redis_store;

use thiserror::Error;

pub use index::{glob_match, IndexSet, ScanPage, SCAN_START};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Key not found: {key}")]
    NotFound { key: String },

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Redis error: {0}")]
    Redis(#[source] redis::RedisError),

    #[error("Store operation timed out")]
    Timeout,

    #[error("Unexpected store reply: {0}")]
    UnexpectedReply(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_timeout() {
            StoreError::Timeout
        } else {
            StoreError::Redis(e)
        }
    }
}

impl StoreError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }
}

/// A single queued operation in a [`Transaction`].
///
/// Guarded operations carry a precondition checked at commit time: if any
/// precondition fails, none of the queued operations are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxOp {
    /// Write `value` under `key`; guarded on the key being absent.
    SetIfAbsent { key: String, value: String },
    /// Overwrite `key` with `value`; guarded on the key being present.
    SetIfPresent { key: String, value: String },
    /// Remove `key`; guarded on the key being present.
    DeleteExisting { key: String },
    /// Add `key` to the index set.
    IndexAdd { key: String },
    /// Remove `key` from the index set.
    IndexRemove { key: String },
}

impl TxOp {
    pub fn key(&self) -> &str {
        match self {
            TxOp::SetIfAbsent { key, .. }
            | TxOp::SetIfPresent { key, .. }
            | TxOp::DeleteExisting { key }
            | TxOp::IndexAdd { key }
            | TxOp::IndexRemove { key } => key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    Committed,
    /// The guard of the operation at `op` (0-based, in queue order) failed
    /// and nothing was applied.
    Rejected { op: usize },
}

/// Access to the key-value store holding order records and the order index.
///
/// Implementations are shared across request threads and must not hold
/// client-side locks across calls.
pub trait OrderStore: Send + Sync + 'static {
    /// Reads a string value, failing with [`StoreError::NotFound`] if absent.
    fn get_string(&self, key: &str) -> StoreResult<String>;

    /// Writes `value` only if `key` does not exist. Returns whether it wrote.
    fn set_if_absent(&self, key: &str, value: &str) -> StoreResult<bool>;

    /// Overwrites `key`, failing with [`StoreError::NotFound`] if absent.
    fn set_if_present(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removes `key`. Returns whether it existed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Reads several keys at once; slot `i` holds the value of `keys[i]`.
    fn multi_get(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>>;

    /// The set of live order keys owned by this store.
    fn index(&self) -> &IndexSet;

    fn index_add(&self, key: &str) -> StoreResult<()>;

    fn index_remove(&self, key: &str) -> StoreResult<()>;

    /// One step of a cursor-driven scan over the index set.
    ///
    /// Start with [`SCAN_START`] and feed back the returned cursor; a
    /// returned cursor of [`SCAN_START`] means the scan has completed.
    fn index_scan(&self, cursor: u64, pattern: &str, count: u64) -> StoreResult<ScanPage>;

    /// Applies `ops` atomically. Called by [`Transaction::commit`].
    fn execute(&self, ops: Vec<TxOp>) -> StoreResult<TxOutcome>;

    fn ping(&self) -> StoreResult<()>;

    fn transaction(&self) -> Transaction<'_, Self>
    where
        Self: Sized,
    {
        Transaction::new(self)
    }
}

/// Queue of store operations committed all-or-nothing.
///
/// Nothing reaches the store until [`commit`](Transaction::commit). Dropping
/// the transaction, including on an early `?` return, discards the queue.
#[must_use = "a transaction does nothing unless committed"]
pub struct Transaction<'a, S: OrderStore> {
    store: &'a S,
    ops: Vec<TxOp>,
}

impl<'a, S: OrderStore> Transaction<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            ops: Vec::new(),
        }
    }

    pub fn set_if_absent(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.push(TxOp::SetIfAbsent {
            key: key.to_string(),
            value: value.into(),
        })
    }

    pub fn set_if_present(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.push(TxOp::SetIfPresent {
            key: key.to_string(),
            value: value.into(),
        })
    }

    pub fn delete_existing(&mut self, key: &str) -> &mut Self {
        self.push(TxOp::DeleteExisting {
            key: key.to_string(),
        })
    }

    pub fn index_add(&mut self, key: &str) -> &mut Self {
        self.push(TxOp::IndexAdd {
            key: key.to_string(),
        })
    }

    pub fn index_remove(&mut self, key: &str) -> &mut Self {
        self.push(TxOp::IndexRemove {
            key: key.to_string(),
        })
    }

    pub fn commit(mut self) -> StoreResult<TxOutcome> {
        let ops = std::mem::take(&mut self.ops);
        if ops.is_empty() {
            return Ok(TxOutcome::Committed);
        }
        self.store.execute(ops)
    }

    /// Drops every queued operation without touching the store.
    pub fn discard(mut self) {
        self.ops.clear();
    }

    fn push(&mut self, op: TxOp) -> &mut Self {
        self.ops.push(op);
        self
    }
}

impl<S: OrderStore> Drop for Transaction<'_, S> {
    fn drop(&mut self) {
        if !self.ops.is_empty() {
            log::debug!(
                "discarding uncommitted transaction with {} queued operations",
                self.ops.len()
            );
        }
    }
}
