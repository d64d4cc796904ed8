//! Fault-injecting key-value backend.
//!
//! [`FaultyKv`] wraps an [`InMemoryKv`] and fails chosen operations on keys
//! under chosen prefixes, inside and outside transactions. Used to exercise
//! best-effort cleanup and internal error handling.

use gwstore_kv::{InMemoryKv, KvBackend, KvError, KvListOpts, KvListResult, KvResult, KvTx};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A backend operation that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultOp {
    /// `get`
    Get,
    /// `put`
    Put,
    /// `delete`
    Delete,
    /// `list`; matched against the listed prefix.
    List,
    /// Transaction commit; matched against the empty key.
    Commit,
}

#[derive(Debug, Clone)]
struct Fault {
    op: FaultOp,
    prefix: String,
}

/// An [`InMemoryKv`] that fails configured operations.
pub struct FaultyKv {
    inner: InMemoryKv,
    faults: RwLock<Vec<Fault>>,
    injected: AtomicUsize,
}

impl Default for FaultyKv {
    fn default() -> Self {
        Self::new()
    }
}

impl FaultyKv {
    /// Creates an empty backend with no faults.
    pub fn new() -> Self {
        Self {
            inner: InMemoryKv::new(),
            faults: RwLock::new(Vec::new()),
            injected: AtomicUsize::new(0),
        }
    }

    /// The wrapped backend, for inspecting stored keys.
    pub fn inner(&self) -> &InMemoryKv {
        &self.inner
    }

    /// Fails every `op` on keys starting with `prefix`.
    pub fn fail(&self, op: FaultOp, prefix: impl Into<String>) {
        self.faults.write().push(Fault {
            op,
            prefix: prefix.into(),
        });
    }

    /// Removes every configured fault.
    pub fn clear(&self) {
        self.faults.write().clear();
    }

    /// Number of failures injected so far.
    pub fn injected_count(&self) -> usize {
        self.injected.load(Ordering::SeqCst)
    }

    fn check(&self, op: FaultOp, key: &str) -> KvResult<()> {
        let hit = self
            .faults
            .read()
            .iter()
            .any(|f| f.op == op && key.starts_with(&f.prefix));
        if hit {
            self.injected.fetch_add(1, Ordering::SeqCst);
            return Err(KvError::backend(format!(
                "injected {op:?} failure on '{key}'"
            )));
        }
        Ok(())
    }
}

impl KvBackend for FaultyKv {
    fn get(&self, key: &str) -> KvResult<Vec<u8>> {
        self.check(FaultOp::Get, key)?;
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> KvResult<()> {
        self.check(FaultOp::Put, key)?;
        self.inner.put(key, value)
    }

    fn delete(&self, key: &str) -> KvResult<()> {
        self.check(FaultOp::Delete, key)?;
        self.inner.delete(key)
    }

    fn list(&self, prefix: &str, opts: &KvListOpts) -> KvResult<KvListResult> {
        self.check(FaultOp::List, prefix)?;
        self.inner.list(prefix, opts)
    }

    fn begin(&self) -> KvResult<Box<dyn KvTx + '_>> {
        Ok(Box::new(FaultyTx {
            kv: self,
            inner: self.inner.begin()?,
        }))
    }
}

struct FaultyTx<'a> {
    kv: &'a FaultyKv,
    inner: Box<dyn KvTx + 'a>,
}

impl KvTx for FaultyTx<'_> {
    fn get(&self, key: &str) -> KvResult<Vec<u8>> {
        self.kv.check(FaultOp::Get, key)?;
        self.inner.get(key)
    }

    fn put(&mut self, key: &str, value: &[u8]) -> KvResult<()> {
        self.kv.check(FaultOp::Put, key)?;
        self.inner.put(key, value)
    }

    fn delete(&mut self, key: &str) -> KvResult<()> {
        self.kv.check(FaultOp::Delete, key)?;
        self.inner.delete(key)
    }

    fn list(&self, prefix: &str, opts: &KvListOpts) -> KvResult<KvListResult> {
        self.kv.check(FaultOp::List, prefix)?;
        self.inner.list(prefix, opts)
    }

    fn commit(self: Box<Self>) -> KvResult<()> {
        if let Err(err) = self.kv.check(FaultOp::Commit, "") {
            self.inner.rollback()?;
            return Err(err);
        }
        self.inner.commit()
    }

    fn rollback(self: Box<Self>) -> KvResult<()> {
        self.inner.rollback()
    }
}
