//! Error types for the object store.

use crate::index::Index;
use crate::object::ObjectType;
use gwstore_filter::FilterError;
use gwstore_kv::KvError;
use std::fmt;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by the object store.
///
/// Every variant except [`StoreError::Internal`] is an expected outcome the
/// caller can act on. `Internal` carries no detail: the cause is logged where
/// it is detected and never handed back to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested object does not exist.
    #[error("not found")]
    NotFound,

    /// A unique, foreign-key, or reverse-reference constraint was violated.
    #[error(transparent)]
    Constraint(#[from] ConstraintError),

    /// The object failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The request itself was malformed.
    #[error("{}", .messages.join("; "))]
    Client {
        /// One entry per problem found, in the order it was reported.
        messages: Vec<String>,
    },

    /// The request context was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// The request context's deadline passed.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// An unexpected failure; details were logged.
    #[error("internal error")]
    Internal,
}

impl StoreError {
    /// Creates a client error.
    pub fn client(message: impl Into<String>) -> Self {
        Self::Client {
            messages: vec![message.into()],
        }
    }

    /// Logs `err` with `context` and returns the opaque internal error.
    pub fn internal(context: &str, err: impl fmt::Display) -> Self {
        tracing::error!(target: "gwstore::store", context, error = %err, "internal store error");
        Self::Internal
    }

    /// Maps a backend error: missing keys become [`StoreError::NotFound`],
    /// anything else is internal.
    pub fn from_kv(context: &str, err: KvError) -> Self {
        if err.is_not_found() {
            Self::NotFound
        } else {
            Self::internal(context, err)
        }
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns the constraint violation, if this is one.
    #[must_use]
    pub fn as_constraint(&self) -> Option<&ConstraintError> {
        match self {
            Self::Constraint(err) => Some(err),
            _ => None,
        }
    }

    /// Returns the individual messages of a client error.
    #[must_use]
    pub fn client_messages(&self) -> Option<&[String]> {
        match self {
            Self::Client { messages } => Some(messages),
            _ => None,
        }
    }

    /// Returns the validation failure, if this is one.
    #[must_use]
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

/// Field that an over-long filter expression is reported against.
pub const FILTER_FIELD: &str = "filter";

impl From<FilterError> for StoreError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::TooLong { .. } => {
                let mut validation = ValidationError::new();
                validation.add(FILTER_FIELD, err.to_string());
                Self::Validation(validation)
            }
            FilterError::Invalid { messages } => Self::Client { messages },
            FilterError::Evaluation { .. } => Self::internal("evaluate filter", err),
        }
    }
}

/// An object that refers to another through a foreign index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// Type of the referring object.
    pub object_type: ObjectType,
    /// ID of the referring object.
    pub id: String,
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.object_type, self.id)
    }
}

/// A constraint violation.
///
/// Unique violations carry only the offending index. Foreign-key violations
/// carry the index and the message `not found`. Refused deletes carry the
/// message `foreign references exist` and the referrers that were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintError {
    /// The index that was violated.
    pub index: Option<Index>,
    /// Extra detail; absent for plain uniqueness violations.
    pub message: Option<String>,
    /// Objects still referring to the one being deleted.
    pub references: Vec<ObjectRef>,
}

/// Message of a foreign-key violation.
pub const FOREIGN_NOT_FOUND: &str = "not found";

/// Message of a delete refused because of live referrers.
pub const FOREIGN_REFERENCES_EXIST: &str = "foreign references exist";

impl ConstraintError {
    /// A uniqueness violation on `index`.
    #[must_use]
    pub fn unique(index: Index) -> Self {
        Self {
            index: Some(index),
            message: None,
            references: Vec::new(),
        }
    }

    /// A foreign index pointing at a missing object.
    #[must_use]
    pub fn foreign_not_found(index: Index) -> Self {
        Self {
            index: Some(index),
            message: Some(FOREIGN_NOT_FOUND.to_string()),
            references: Vec::new(),
        }
    }

    /// A delete blocked by referring objects.
    #[must_use]
    pub fn references_exist(references: Vec<ObjectRef>) -> Self {
        Self {
            index: None,
            message: Some(FOREIGN_REFERENCES_EXIST.to_string()),
            references,
        }
    }
}

impl fmt::Display for ConstraintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.index, &self.message) {
            (Some(index), None) => write!(
                f,
                "unique constraint failed: {} '{}' already exists",
                index.field_name, index.value
            ),
            (Some(index), Some(message)) => write!(
                f,
                "{message}: {} '{}' (index '{}')",
                index.field_name, index.value, index.name
            ),
            (None, message) => {
                f.write_str(message.as_deref().unwrap_or("constraint violation"))?;
                if let Some((first, rest)) = self.references.split_first() {
                    write!(f, ": referenced by {first}")?;
                    for reference in rest {
                        write!(f, ", {reference}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConstraintError {}

/// Validation messages for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field path, e.g. `service.id`.
    pub field: String,
    /// One entry per rule the field broke.
    pub messages: Vec<String>,
}

/// Field-level validation failures collected from an object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    /// Failures in the order fields were checked.
    pub fields: Vec<FieldError>,
}

impl ValidationError {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` against `field`.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.fields.iter_mut().find(|f| f.field == field) {
            Some(existing) => existing.messages.push(message),
            None => self.fields.push(FieldError {
                field,
                messages: vec![message],
            }),
        }
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the messages recorded against `field`.
    #[must_use]
    pub fn messages_for(&self, field: &str) -> &[String] {
        self.fields
            .iter()
            .find(|f| f.field == field)
            .map(|f| f.messages.as_slice())
            .unwrap_or(&[])
    }

    /// `Ok(())` if nothing was recorded, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("validation failed")?;
        for (i, field) in self.fields.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", field.field, field.messages.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
