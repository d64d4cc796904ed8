//! Gateway resources: the closed set of object kinds the store persists.
//!
//! Each kind is a plain serde struct implementing [`ResourceKind`], which
//! gives it the [`Object`] contract. [`Resource`] is the tagged union over
//! all kinds, used wherever the kind is only known at runtime.

mod certificate;
mod consumer;
mod plugin;
mod route;
mod service;
mod sni;
mod target;
mod upstream;

pub use certificate::Certificate;
pub use consumer::Consumer;
pub use plugin::Plugin;
pub use route::Route;
pub use service::Service;
pub use sni::Sni;
pub use target::Target;
pub use upstream::Upstream;

use crate::error::{StoreError, StoreResult, ValidationError};
use crate::index::Index;
use crate::object::{Object, ObjectType};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const MAX_TAG_LEN: usize = 128;
const MAX_NAME_LEN: usize = 128;

/// Fields every resource carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    /// UUID of the resource.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Creation time, Unix seconds; 0 until first stored.
    #[serde(default)]
    pub created_at: u64,
    /// Last write time, Unix seconds.
    #[serde(default)]
    pub updated_at: u64,
    /// Free-form labels matched by list filters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A reference to another resource by ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// ID of the referenced resource.
    pub id: String,
}

impl ForeignKey {
    /// References the resource with `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A concrete resource kind.
///
/// Implementors get [`Object`] for free: IDs and timestamps are handled from
/// [`Meta`], and payloads are stored as JSON.
pub trait ResourceKind:
    Serialize + DeserializeOwned + Clone + Default + fmt::Debug + Send + Sync
{
    /// The kind's type discriminator.
    const TYPE: ObjectType;

    /// Shared resource fields.
    fn meta(&self) -> &Meta;

    /// Shared resource fields, mutably.
    fn meta_mut(&mut self) -> &mut Meta;

    /// Indexes derived from kind-specific fields.
    fn kind_indexes(&self) -> Vec<Index>;

    /// Fills kind-specific defaults.
    fn apply_defaults(&mut self) {}

    /// Records kind-specific rule violations in `errors`.
    fn validate_fields(&self, errors: &mut ValidationError);

    /// Wraps this value in the tagged union.
    fn into_resource(self) -> Resource;

    /// Unwraps the tagged union, handing it back on a kind mismatch.
    ///
    /// # Errors
    ///
    /// Returns `resource` unchanged if it holds another kind.
    fn from_resource(resource: Resource) -> Result<Self, Resource>;
}

impl<K: ResourceKind> Object for K {
    fn object_type(&self) -> ObjectType {
        K::TYPE
    }

    fn id(&self) -> &str {
        &self.meta().id
    }

    fn set_id(&mut self, id: String) {
        self.meta_mut().id = id;
    }

    fn tags(&self) -> &[String] {
        &self.meta().tags
    }

    fn indexes(&self) -> Vec<Index> {
        self.kind_indexes()
    }

    fn process_defaults(&mut self) -> StoreResult<()> {
        let now = now_unix()?;
        let meta = self.meta_mut();
        if meta.id.is_empty() {
            meta.id = Uuid::new_v4().to_string();
        }
        if meta.created_at == 0 {
            meta.created_at = now;
        }
        meta.updated_at = now;
        self.apply_defaults();
        Ok(())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        validate_meta(self.meta(), &mut errors);
        self.validate_fields(&mut errors);
        errors.into_result()
    }

    fn encode(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::internal("encode resource", e))
    }

    fn decode_into(&mut self, bytes: &[u8]) -> StoreResult<()> {
        *self = serde_json::from_slice(bytes).map_err(|e| {
            StoreError::internal(&format!("decode {} resource", K::TYPE), e)
        })?;
        Ok(())
    }
}

/// Any resource, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    /// A [`Service`].
    Service(Service),
    /// A [`Route`].
    Route(Route),
    /// A [`Consumer`].
    Consumer(Consumer),
    /// A [`Plugin`].
    Plugin(Plugin),
    /// An [`Upstream`].
    Upstream(Upstream),
    /// A [`Target`].
    Target(Target),
    /// A [`Certificate`].
    Certificate(Certificate),
    /// An [`Sni`].
    Sni(Sni),
}

macro_rules! dispatch {
    ($resource:expr, $inner:ident => $body:expr) => {
        match $resource {
            Resource::Service($inner) => $body,
            Resource::Route($inner) => $body,
            Resource::Consumer($inner) => $body,
            Resource::Plugin($inner) => $body,
            Resource::Upstream($inner) => $body,
            Resource::Target($inner) => $body,
            Resource::Certificate($inner) => $body,
            Resource::Sni($inner) => $body,
        }
    };
}

impl Resource {
    /// Creates an empty resource of `object_type`.
    #[must_use]
    pub fn new(object_type: ObjectType) -> Self {
        match object_type {
            ObjectType::Service => Service::default().into_resource(),
            ObjectType::Route => Route::default().into_resource(),
            ObjectType::Consumer => Consumer::default().into_resource(),
            ObjectType::Plugin => Plugin::default().into_resource(),
            ObjectType::Upstream => Upstream::default().into_resource(),
            ObjectType::Target => Target::default().into_resource(),
            ObjectType::Certificate => Certificate::default().into_resource(),
            ObjectType::Sni => Sni::default().into_resource(),
        }
    }

    /// Extracts the concrete kind.
    ///
    /// # Errors
    ///
    /// Returns `self` unchanged if it holds another kind.
    pub fn try_into_kind<K: ResourceKind>(self) -> Result<K, Resource> {
        K::from_resource(self)
    }

    /// Extracts the concrete kind, panicking on a mismatch.
    ///
    /// Use this only where the kind is guaranteed by construction; a
    /// mismatch means stored data or calling code is corrupt.
    ///
    /// # Panics
    ///
    /// Panics if `self` holds another kind.
    #[must_use]
    pub fn expect_kind<K: ResourceKind>(self) -> K {
        match K::from_resource(self) {
            Ok(kind) => kind,
            Err(other) => panic!(
                "expected {} resource, found {}",
                K::TYPE,
                other.object_type()
            ),
        }
    }
}

impl Object for Resource {
    fn object_type(&self) -> ObjectType {
        dispatch!(self, r => r.object_type())
    }

    fn id(&self) -> &str {
        dispatch!(self, r => r.id())
    }

    fn set_id(&mut self, id: String) {
        dispatch!(self, r => r.set_id(id))
    }

    fn tags(&self) -> &[String] {
        dispatch!(self, r => Object::tags(r))
    }

    fn indexes(&self) -> Vec<Index> {
        dispatch!(self, r => r.indexes())
    }

    fn process_defaults(&mut self) -> StoreResult<()> {
        dispatch!(self, r => r.process_defaults())
    }

    fn validate(&self) -> Result<(), ValidationError> {
        dispatch!(self, r => r.validate())
    }

    fn encode(&self) -> StoreResult<Vec<u8>> {
        dispatch!(self, r => r.encode())
    }

    fn decode_into(&mut self, bytes: &[u8]) -> StoreResult<()> {
        dispatch!(self, r => r.decode_into(bytes))
    }
}

fn now_unix() -> StoreResult<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| StoreError::internal("read system clock", e))
}

fn validate_meta(meta: &Meta, errors: &mut ValidationError) {
    if Uuid::parse_str(&meta.id).is_err() {
        errors.add("id", "must be a valid UUID");
    }
    for tag in &meta.tags {
        let valid = !tag.is_empty()
            && tag.chars().count() <= MAX_TAG_LEN
            && tag
                .chars()
                .all(|c| c.is_ascii_graphic() && c != ',' && c != '/');
        if !valid {
            errors.add(
                "tags",
                format!(
                    "'{tag}' must be 1 to {MAX_TAG_LEN} printable characters without ',' or '/'"
                ),
            );
        }
    }
}

/// Checks a resource name: 1 to 128 of `[0-9a-zA-Z.-_~]`.
fn validate_name(field: &str, name: &str, errors: &mut ValidationError) {
    if name.is_empty() {
        errors.add(field, "required");
        return;
    }
    if name.len() > MAX_NAME_LEN {
        errors.add(field, format!("length must be <= {MAX_NAME_LEN}"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '~'))
    {
        errors.add(
            field,
            "must only contain alphanumerics or '.', '-', '_', '~'",
        );
    }
}

/// Checks a hostname: dot-separated labels of alphanumerics and `-`, with an
/// optional leading `*.` wildcard when `allow_wildcard` is set.
fn validate_hostname(field: &str, host: &str, allow_wildcard: bool, errors: &mut ValidationError) {
    if host.is_empty() {
        errors.add(field, "required");
        return;
    }
    let host = match host.strip_prefix("*.") {
        Some(rest) if allow_wildcard => rest,
        _ => host,
    };
    let valid = host.len() <= 253
        && host.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
    if !valid {
        errors.add(field, format!("'{host}' is not a valid hostname"));
    }
}

/// Checks an optional reference; `required` turns absence into an error.
fn validate_foreign(
    field: &str,
    reference: Option<&ForeignKey>,
    required: bool,
    errors: &mut ValidationError,
) {
    match reference {
        Some(fk) if Uuid::parse_str(&fk.id).is_err() => {
            errors.add(format!("{field}.id"), "must be a valid UUID");
        }
        Some(_) => {}
        None if required => errors.add(field, "required"),
        None => {}
    }
}

/// Foreign index on an optional reference; empty when the reference is unset.
fn foreign_index(
    name: &str,
    field: &str,
    foreign_type: ObjectType,
    reference: Option<&ForeignKey>,
) -> Index {
    Index::foreign(
        name,
        format!("{field}.id"),
        foreign_type,
        reference.map(|fk| fk.id.as_str()).unwrap_or_default(),
    )
}
