//! Storage key layout.
//!
//! ```text
//! <type>/<id>                                   primary record
//! ix/u/<type>/<index>/<value>                   unique index -> id
//! ix/f/<foreign type>/<value>/<type>/<id>       reverse index -> sentinel
//! ```
//!
//! A clustered key space prefixes every key with `c/<cluster>/`.

use crate::error::{ObjectRef, StoreError, StoreResult};
use crate::object::ObjectType;
use std::fmt;

/// Value stored under reverse-index keys; only their existence matters.
pub const FOREIGN_SENTINEL: &[u8] = &[0x01];

const MAX_CLUSTER_LEN: usize = 64;

/// A validated cluster identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterId(String);

impl ClusterId {
    /// Validates `id`: 1 to 64 ASCII alphanumerics, `-` or `_`.
    ///
    /// # Errors
    ///
    /// Returns a client error describing the problem.
    pub fn new(id: impl Into<String>) -> StoreResult<Self> {
        let id = id.into();
        if id.is_empty() || id.len() > MAX_CLUSTER_LEN {
            return Err(StoreError::client(format!(
                "invalid cluster id '{id}': length must be within range [1 - {MAX_CLUSTER_LEN}]"
            )));
        }
        if let Some(bad) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(StoreError::client(format!(
                "invalid cluster id '{id}': unexpected character {bad:?}"
            )));
        }
        Ok(Self(id))
    }

    /// Returns the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds every key the store reads or writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    /// The unprefixed key space.
    #[must_use]
    pub fn global() -> Self {
        Self::default()
    }

    /// A key space namespaced under `cluster`.
    #[must_use]
    pub fn clustered(cluster: &ClusterId) -> Self {
        Self {
            prefix: format!("c/{cluster}/"),
        }
    }

    /// Key of a primary record.
    #[must_use]
    pub fn primary(&self, object_type: ObjectType, id: &str) -> String {
        format!("{}{object_type}/{id}", self.prefix)
    }

    /// Prefix of every primary record of `object_type`.
    #[must_use]
    pub fn type_prefix(&self, object_type: ObjectType) -> String {
        format!("{}{object_type}/", self.prefix)
    }

    /// Key of a unique index entry.
    #[must_use]
    pub fn unique(&self, object_type: ObjectType, index: &str, value: &str) -> String {
        format!("{}ix/u/{object_type}/{index}/{value}", self.prefix)
    }

    /// Key of a reverse-index entry recording that `object_type/id` refers
    /// to `foreign_type/foreign_id`.
    #[must_use]
    pub fn foreign(
        &self,
        foreign_type: ObjectType,
        foreign_id: &str,
        object_type: ObjectType,
        id: &str,
    ) -> String {
        format!(
            "{}ix/f/{foreign_type}/{foreign_id}/{object_type}/{id}",
            self.prefix
        )
    }

    /// Prefix of every reverse-index entry pointing at `foreign_type/foreign_id`.
    #[must_use]
    pub fn referrers_prefix(&self, foreign_type: ObjectType, foreign_id: &str) -> String {
        format!("{}ix/f/{foreign_type}/{foreign_id}/", self.prefix)
    }

    /// Like [`KeySpace::referrers_prefix`], narrowed to referrers of one type.
    #[must_use]
    pub fn referrers_of_type_prefix(
        &self,
        foreign_type: ObjectType,
        foreign_id: &str,
        object_type: ObjectType,
    ) -> String {
        format!(
            "{}ix/f/{foreign_type}/{foreign_id}/{object_type}/",
            self.prefix
        )
    }

    /// Recovers the referring object from a reverse-index key listed under
    /// `prefix` (as returned by [`KeySpace::referrers_prefix`]).
    #[must_use]
    pub fn parse_referrer(key: &str, prefix: &str) -> Option<ObjectRef> {
        let (object_type, id) = key.strip_prefix(prefix)?.split_once('/')?;
        Some(ObjectRef {
            object_type: object_type.parse().ok()?,
            id: id.to_string(),
        })
    }
}
