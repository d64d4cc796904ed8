//! # gwstore KV
//!
//! Key-value backend contract and an in-memory implementation.
//!
//! This crate is the lowest layer of gwstore. Backends are **opaque byte
//! stores** keyed by UTF-8 strings - they do not interpret keys or values.
//! The object store above builds records, unique indexes, and reverse
//! indexes purely out of key naming conventions.
//!
//! ## Design Principles
//!
//! - Four primitive operations: `get`, `put`, `delete`, prefix `list`
//! - A transaction (`KvTx`) offers the same four operations with
//!   all-or-nothing commit
//! - Transactions must serialize conflicting writers; the in-memory backend
//!   does this with a single-writer lock
//! - Backends must be `Send + Sync` for concurrent access
//!
//! ## Example
//!
//! ```rust
//! use gwstore_kv::{InMemoryKv, KvBackend, KvListOpts, KvTx};
//!
//! let kv = InMemoryKv::new();
//! kv.put("service/1", b"{}").unwrap();
//!
//! let mut tx = kv.begin().unwrap();
//! tx.put("service/2", b"{}").unwrap();
//! tx.commit().unwrap();
//!
//! let listed = kv.list("service/", &KvListOpts::all()).unwrap();
//! assert_eq!(listed.total_count, 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;

pub use backend::{KvBackend, KvListOpts, KvListResult, KvPair, KvTx};
pub use error::{KvError, KvResult};
pub use memory::InMemoryKv;
