//! The object contract every stored resource implements.

use crate::error::{StoreError, StoreResult, ValidationError};
use crate::index::Index;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type discriminator of a stored object.
///
/// The string form is the storage-key namespace, e.g. `service/<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    /// An upstream service.
    Service,
    /// A routing rule.
    Route,
    /// An API consumer.
    Consumer,
    /// A plugin instance.
    Plugin,
    /// A load-balanced upstream.
    Upstream,
    /// A target inside an upstream.
    Target,
    /// A TLS certificate.
    Certificate,
    /// A server name bound to a certificate.
    Sni,
}

impl ObjectType {
    /// Every object type, in declaration order.
    pub const ALL: [ObjectType; 8] = [
        ObjectType::Service,
        ObjectType::Route,
        ObjectType::Consumer,
        ObjectType::Plugin,
        ObjectType::Upstream,
        ObjectType::Target,
        ObjectType::Certificate,
        ObjectType::Sni,
    ];

    /// Returns the storage namespace of this type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ObjectType::Service => "service",
            ObjectType::Route => "route",
            ObjectType::Consumer => "consumer",
            ObjectType::Plugin => "plugin",
            ObjectType::Upstream => "upstream",
            ObjectType::Target => "target",
            ObjectType::Certificate => "certificate",
            ObjectType::Sni => "sni",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| StoreError::client(format!("unknown object type '{s}'")))
    }
}

/// A typed, identifiable, serializable entity the store can persist.
///
/// `indexes` is recomputed from current field values on every write, so it
/// must be a pure function of the object's state.
pub trait Object: Clone + fmt::Debug + Send + Sync {
    /// The object's type discriminator.
    fn object_type(&self) -> ObjectType;

    /// The object's ID; empty until assigned.
    fn id(&self) -> &str;

    /// Assigns the object's ID.
    fn set_id(&mut self, id: String);

    /// Tags used by list filters.
    fn tags(&self) -> &[String];

    /// Secondary indexes derived from the current field values.
    fn indexes(&self) -> Vec<Index>;

    /// Fills defaults and timestamps. Runs before [`Object::validate`].
    ///
    /// # Errors
    ///
    /// Returns an internal error if defaults cannot be computed.
    fn process_defaults(&mut self) -> StoreResult<()>;

    /// Checks schema and business rules.
    ///
    /// # Errors
    ///
    /// Returns every field-level problem found.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Serializes the payload for storage.
    ///
    /// # Errors
    ///
    /// Returns an internal error if serialization fails.
    fn encode(&self) -> StoreResult<Vec<u8>>;

    /// Replaces the payload with a stored one.
    ///
    /// # Errors
    ///
    /// Returns an internal error if `bytes` is not a valid payload.
    fn decode_into(&mut self, bytes: &[u8]) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names_round_trip() {
        for ty in ObjectType::ALL {
            assert_eq!(ty.as_str().parse::<ObjectType>().unwrap(), ty);
        }
    }

    #[test]
    fn unknown_type_is_client_error() {
        let err = "widget".parse::<ObjectType>().unwrap_err();
        assert_eq!(err, StoreError::client("unknown object type 'widget'"));
    }

    #[test]
    fn serde_uses_namespace() {
        let json = serde_json::to_string(&ObjectType::Sni).unwrap();
        assert_eq!(json, "\"sni\"");
    }
}
