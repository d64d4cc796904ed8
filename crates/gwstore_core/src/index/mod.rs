//! Secondary index descriptors and the engine that maintains them.
//!
//! Two kinds of index exist:
//! - **Unique**: at most one object of a type may hold a given value.
//! - **Foreign**: the referenced object must exist; a reverse entry lets the
//!   store list every object referring to it and refuse its deletion.

mod engine;

pub use engine::IndexEngine;

use crate::object::ObjectType;

/// The constraint an index enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// At most one live object per value.
    Unique,
    /// The value names an existing object of the foreign type.
    Foreign,
}

impl IndexType {
    /// Returns a lowercase name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            IndexType::Unique => "unique",
            IndexType::Foreign => "foreign",
        }
    }
}

/// One secondary index entry derived from an object field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    /// Logical index name, e.g. `name` or `svc_id`.
    pub name: String,
    /// Field the value comes from, used in error messages, e.g. `service.id`.
    pub field_name: String,
    /// The constraint this index enforces.
    pub index_type: IndexType,
    /// The indexed value. Empty values are not indexed.
    pub value: String,
    /// The referenced type; set only for foreign indexes.
    pub foreign_type: Option<ObjectType>,
}

impl Index {
    /// Creates a unique index.
    pub fn unique(
        name: impl Into<String>,
        field_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_name: field_name.into(),
            index_type: IndexType::Unique,
            value: value.into(),
            foreign_type: None,
        }
    }

    /// Creates a foreign index referencing an object of `foreign_type`.
    pub fn foreign(
        name: impl Into<String>,
        field_name: impl Into<String>,
        foreign_type: ObjectType,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field_name: field_name.into(),
            index_type: IndexType::Foreign,
            value: value.into(),
            foreign_type: Some(foreign_type),
        }
    }

    /// Returns true if the index has nothing to record.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() || self.value.is_empty()
    }
}
