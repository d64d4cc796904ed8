//! Key-value backend trait definitions.

use crate::error::{KvError, KvResult};

/// A single key-value entry returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    /// The full key.
    pub key: String,
    /// The stored value.
    pub value: Vec<u8>,
}

/// Paging parameters for a prefix listing.
///
/// Pages are 1-based. `page_size` must be at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KvListOpts {
    /// The 1-based page number.
    pub page: usize,
    /// Maximum number of entries in the page.
    pub page_size: usize,
}

impl KvListOpts {
    /// Creates paging parameters for the given page.
    #[must_use]
    pub const fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    /// Lists every entry under the prefix in a single page.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            page: 1,
            page_size: usize::MAX,
        }
    }

    /// Returns the number of entries skipped before this page starts.
    pub(crate) fn offset(&self) -> KvResult<usize> {
        if self.page == 0 {
            return Err(KvError::invalid_argument("page must be >= 1"));
        }
        if self.page_size == 0 {
            return Err(KvError::invalid_argument("page_size must be >= 1"));
        }
        Ok((self.page - 1).saturating_mul(self.page_size))
    }
}

impl Default for KvListOpts {
    fn default() -> Self {
        Self::all()
    }
}

/// The result of a prefix listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KvListResult {
    /// Entries in the requested page, ordered by key.
    pub kvs: Vec<KvPair>,
    /// Number of entries under the prefix across all pages.
    pub total_count: usize,
}

impl KvListResult {
    /// Slices an ordered sequence of entries into the requested page.
    pub(crate) fn paginate<I>(entries: I, opts: &KvListOpts) -> KvResult<Self>
    where
        I: ExactSizeIterator<Item = KvPair>,
    {
        let offset = opts.offset()?;
        let total_count = entries.len();
        let kvs = entries.skip(offset).take(opts.page_size).collect();
        Ok(Self { kvs, total_count })
    }
}

/// A key-value backend.
///
/// Keys are UTF-8 strings and values are opaque bytes. Backends do not
/// interpret either.
///
/// # Invariants
///
/// - `get` and `delete` return [`KvError::NotFound`] for absent keys
/// - `list` returns entries in ascending key order, with `total_count`
///   counting every key under the prefix
/// - Writes performed through a [`KvTx`] become visible only when the
///   transaction commits, and either all of them do or none do
/// - Two transactions that read-then-write the same key must not both
///   commit on stale reads (the in-memory backend serializes writers)
pub trait KvBackend: Send + Sync {
    /// Reads the value stored at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::NotFound`] if the key is absent.
    fn get(&self, key: &str) -> KvResult<Vec<u8>>;

    /// Stores `value` at `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn put(&self, key: &str, value: &[u8]) -> KvResult<()>;

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::NotFound`] if the key is absent.
    fn delete(&self, key: &str) -> KvResult<()>;

    /// Lists entries whose key starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::InvalidArgument`] for a zero page or page size.
    fn list(&self, prefix: &str, opts: &KvListOpts) -> KvResult<KvListResult>;

    /// Begins a transaction.
    ///
    /// The transaction is rolled back if it is dropped without a commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot start a transaction.
    fn begin(&self) -> KvResult<Box<dyn KvTx + '_>>;
}

/// An atomic batch of key-value operations.
///
/// Reads inside a transaction observe the transaction's own pending writes.
pub trait KvTx {
    /// Reads the value stored at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::NotFound`] if the key is absent.
    fn get(&self, key: &str) -> KvResult<Vec<u8>>;

    /// Stores `value` at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::TransactionClosed`] if the transaction has ended.
    fn put(&mut self, key: &str, value: &[u8]) -> KvResult<()>;

    /// Removes `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::NotFound`] if the key is absent.
    fn delete(&mut self, key: &str) -> KvResult<()>;

    /// Lists entries whose key starts with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::InvalidArgument`] for a zero page or page size.
    fn list(&self, prefix: &str, opts: &KvListOpts) -> KvResult<KvListResult>;

    /// Applies every pending write atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the writes could not be applied; in that case
    /// none of them are visible.
    fn commit(self: Box<Self>) -> KvResult<()>;

    /// Discards every pending write.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to release the transaction.
    fn rollback(self: Box<Self>) -> KvResult<()>;
}
