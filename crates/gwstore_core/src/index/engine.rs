//! Index Engine - transactional maintenance of unique and foreign indexes.
//!
//! The engine turns an object's [`Index`] descriptors into keys and applies
//! them inside the caller's transaction. It never commits or rolls back.
//!
//! # Invariants
//!
//! - A unique key is written only after checking it is absent, in the same
//!   transaction; the backend's isolation makes check-then-write atomic
//! - A foreign index is written only if the referenced primary record exists
//! - An object with live reverse-index entries is never deleted
//! - Index cleanup on delete is best effort: failures are logged as
//!   integrity warnings and do not fail the delete

use crate::error::{ConstraintError, ObjectRef, StoreError, StoreResult};
use crate::index::{Index, IndexType};
use crate::keys::{KeySpace, FOREIGN_SENTINEL};
use crate::object::{Object, ObjectType};
use gwstore_kv::{KvError, KvListOpts, KvTx};

/// Applies index operations for one key space.
#[derive(Debug, Clone, Copy)]
pub struct IndexEngine<'a> {
    keys: &'a KeySpace,
    reference_scan_limit: usize,
}

impl<'a> IndexEngine<'a> {
    /// Creates an engine writing keys from `keys`.
    ///
    /// `reference_scan_limit` bounds how many reverse-index entries
    /// [`IndexEngine::check_foreign_indexes_for_delete`] reads.
    #[must_use]
    pub fn new(keys: &'a KeySpace, reference_scan_limit: usize) -> Self {
        Self {
            keys,
            reference_scan_limit: reference_scan_limit.max(1),
        }
    }

    /// Returns the key an index entry of `object` is stored under.
    ///
    /// # Panics
    ///
    /// Panics if a foreign index has no foreign type; that is a broken
    /// [`Object`] implementation, not a runtime condition.
    #[must_use]
    pub fn index_key(&self, object_type: ObjectType, id: &str, index: &Index) -> String {
        match index.index_type {
            IndexType::Unique => self.keys.unique(object_type, &index.name, &index.value),
            IndexType::Foreign => {
                let foreign_type = foreign_type_of(object_type, index);
                self.keys.foreign(foreign_type, &index.value, object_type, id)
            }
        }
    }

    /// Checks and writes every index of `object`.
    ///
    /// Indexes with an empty name or value are skipped.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Constraint`] naming the index if a unique value is
    ///   taken or a referenced object does not exist
    /// - [`StoreError::Internal`] on backend failures
    pub fn create_indexes<O: Object>(&self, tx: &mut dyn KvTx, object: &O) -> StoreResult<()> {
        let object_type = object.object_type();
        for index in object.indexes() {
            if index.is_empty() {
                continue;
            }
            match index.index_type {
                IndexType::Unique => self.create_unique(tx, object_type, object.id(), index)?,
                IndexType::Foreign => self.create_foreign(tx, object_type, object.id(), index)?,
            }
        }
        Ok(())
    }

    fn create_unique(
        &self,
        tx: &mut dyn KvTx,
        object_type: ObjectType,
        id: &str,
        index: Index,
    ) -> StoreResult<()> {
        let key = self.index_key(object_type, id, &index);
        self.check_index(tx, &key, index)?;
        tx.put(&key, id.as_bytes())
            .map_err(|e| StoreError::internal("write unique index", e))
    }

    fn create_foreign(
        &self,
        tx: &mut dyn KvTx,
        object_type: ObjectType,
        id: &str,
        index: Index,
    ) -> StoreResult<()> {
        let foreign_type = foreign_type_of(object_type, &index);
        let key = self.index_key(object_type, id, &index);
        let index = self.check_index(tx, &key, index)?;

        let referenced = self.keys.primary(foreign_type, &index.value);
        match tx.get(&referenced) {
            Ok(_) => {}
            Err(KvError::NotFound { .. }) => {
                tracing::debug!(
                    index = %index.name,
                    object_type = %object_type,
                    referenced = %referenced,
                    "foreign index references a missing object"
                );
                return Err(ConstraintError::foreign_not_found(index).into());
            }
            Err(e) => return Err(StoreError::internal("read referenced object", e)),
        }

        tx.put(&key, FOREIGN_SENTINEL)
            .map_err(|e| StoreError::internal("write foreign index", e))
    }

    /// Fails with a constraint error naming `index` if `key` exists.
    fn check_index(&self, tx: &mut dyn KvTx, key: &str, index: Index) -> StoreResult<Index> {
        match tx.get(key) {
            Ok(_) => Err(ConstraintError::unique(index).into()),
            Err(KvError::NotFound { .. }) => Ok(index),
            Err(e) => Err(StoreError::internal("check index", e)),
        }
    }

    /// Deletes every index entry of `object`.
    ///
    /// Failures are logged as integrity warnings and otherwise ignored. A
    /// stale unique entry left behind keeps its value reserved until it is
    /// removed by hand.
    pub fn delete_indexes<O: Object>(&self, tx: &mut dyn KvTx, object: &O) {
        let object_type = object.object_type();
        for index in object.indexes() {
            if index.is_empty() {
                continue;
            }
            let key = self.index_key(object_type, object.id(), &index);
            if let Err(error) = tx.delete(&key) {
                tracing::warn!(
                    target: "gwstore::integrity",
                    index = %index.name,
                    index_type = index.index_type.as_str(),
                    object_type = %object_type,
                    object_id = object.id(),
                    %error,
                    "failed to delete index entry"
                );
            }
        }
    }

    /// Refuses to delete `object_type/id` while anything refers to it.
    ///
    /// Reads at most `reference_scan_limit` reverse-index entries.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Constraint`] with message `foreign references exist`
    ///   listing the referrers that were read
    /// - [`StoreError::Internal`] on backend failures
    pub fn check_foreign_indexes_for_delete(
        &self,
        tx: &mut dyn KvTx,
        object_type: ObjectType,
        id: &str,
    ) -> StoreResult<()> {
        let prefix = self.keys.referrers_prefix(object_type, id);
        let listed = tx
            .list(&prefix, &KvListOpts::new(1, self.reference_scan_limit))
            .map_err(|e| StoreError::internal("scan reverse index", e))?;
        if listed.total_count == 0 {
            return Ok(());
        }

        let references: Vec<ObjectRef> = listed
            .kvs
            .iter()
            .filter_map(|kv| KeySpace::parse_referrer(&kv.key, &prefix))
            .collect();
        tracing::debug!(
            object_type = %object_type,
            object_id = id,
            total = listed.total_count,
            "delete refused: object is still referenced"
        );
        Err(ConstraintError::references_exist(references).into())
    }
}

fn foreign_type_of(object_type: ObjectType, index: &Index) -> ObjectType {
    match index.foreign_type {
        Some(foreign_type) => foreign_type,
        None => panic!(
            "foreign index '{}' of {object_type} has no foreign type",
            index.name
        ),
    }
}
