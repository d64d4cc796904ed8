//! In-memory key-value backend.

use crate::backend::{KvBackend, KvListOpts, KvListResult, KvPair, KvTx};
use crate::error::{KvError, KvResult};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::collections::BTreeMap;

/// An in-memory key-value backend.
///
/// Suitable for:
/// - Unit and integration tests
/// - Ephemeral control planes that don't need persistence
///
/// # Transactions
///
/// Write transactions are single-writer: [`KvBackend::begin`] acquires an
/// exclusive writer lock that is held until the transaction commits, rolls
/// back, or is dropped. Non-transactional `put`/`delete` take the same lock,
/// so a transaction's check-then-write sequence can never interleave with
/// another writer. Readers are never blocked by an open transaction; they see
/// the last committed state.
///
/// # Example
///
/// ```rust
/// use gwstore_kv::{InMemoryKv, KvBackend, KvTx};
///
/// let kv = InMemoryKv::new();
/// let mut tx = kv.begin().unwrap();
/// tx.put("a", b"1").unwrap();
/// assert!(kv.get("a").is_err()); // not yet committed
/// tx.commit().unwrap();
/// assert_eq!(kv.get("a").unwrap(), b"1");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryKv {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
    write_lock: Mutex<()>,
}

impl InMemoryKv {
    /// Creates a new empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every committed key, in order.
    ///
    /// Useful for asserting on index state in tests.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Returns the number of committed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn committed_under(&self, prefix: &str) -> BTreeMap<String, Vec<u8>> {
        self.data
            .read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

fn into_result(entries: BTreeMap<String, Vec<u8>>, opts: &KvListOpts) -> KvResult<KvListResult> {
    let pairs: Vec<KvPair> = entries
        .into_iter()
        .map(|(key, value)| KvPair { key, value })
        .collect();
    KvListResult::paginate(pairs.into_iter(), opts)
}

impl KvBackend for InMemoryKv {
    fn get(&self, key: &str) -> KvResult<Vec<u8>> {
        self.data
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| KvError::not_found(key))
    }

    fn put(&self, key: &str, value: &[u8]) -> KvResult<()> {
        let _writer = self.write_lock.lock();
        self.data.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> KvResult<()> {
        let _writer = self.write_lock.lock();
        match self.data.write().remove(key) {
            Some(_) => Ok(()),
            None => Err(KvError::not_found(key)),
        }
    }

    fn list(&self, prefix: &str, opts: &KvListOpts) -> KvResult<KvListResult> {
        into_result(self.committed_under(prefix), opts)
    }

    fn begin(&self) -> KvResult<Box<dyn KvTx + '_>> {
        let guard = self.write_lock.lock();
        Ok(Box::new(InMemoryTx {
            kv: self,
            _writer: guard,
            pending: BTreeMap::new(),
        }))
    }
}

/// A pending write in an in-memory transaction.
#[derive(Debug, Clone)]
enum PendingWrite {
    /// Insert or replace the value.
    Put(Vec<u8>),
    /// Remove the key.
    Delete,
}

/// A write transaction on [`InMemoryKv`].
///
/// Holds the backend's writer lock for its whole lifetime.
struct InMemoryTx<'a> {
    kv: &'a InMemoryKv,
    _writer: MutexGuard<'a, ()>,
    pending: BTreeMap<String, PendingWrite>,
}

impl KvTx for InMemoryTx<'_> {
    fn get(&self, key: &str) -> KvResult<Vec<u8>> {
        match self.pending.get(key) {
            Some(PendingWrite::Put(value)) => Ok(value.clone()),
            Some(PendingWrite::Delete) => Err(KvError::not_found(key)),
            None => self.kv.get(key),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> KvResult<()> {
        self.pending
            .insert(key.to_string(), PendingWrite::Put(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &str) -> KvResult<()> {
        self.get(key)?;
        self.pending.insert(key.to_string(), PendingWrite::Delete);
        Ok(())
    }

    fn list(&self, prefix: &str, opts: &KvListOpts) -> KvResult<KvListResult> {
        let mut merged = self.kv.committed_under(prefix);
        for (key, write) in self.pending.range(prefix.to_string()..) {
            if !key.starts_with(prefix) {
                break;
            }
            match write {
                PendingWrite::Put(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                PendingWrite::Delete => {
                    merged.remove(key);
                }
            }
        }
        into_result(merged, opts)
    }

    fn commit(self: Box<Self>) -> KvResult<()> {
        let mut data = self.kv.data.write();
        let writes = self.pending.len();
        for (key, write) in self.pending {
            match write {
                PendingWrite::Put(value) => {
                    data.insert(key, value);
                }
                PendingWrite::Delete => {
                    data.remove(&key);
                }
            }
        }
        tracing::trace!(writes, "committed in-memory transaction");
        Ok(())
    }

    fn rollback(self: Box<Self>) -> KvResult<()> {
        tracing::trace!(discarded = self.pending.len(), "rolled back in-memory transaction");
        Ok(())
    }
}
