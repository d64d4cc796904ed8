use super::{
    foreign_index, validate_foreign, validate_hostname, ForeignKey, Meta, Resource, ResourceKind,
};
use crate::error::ValidationError;
use crate::index::Index;
use crate::object::ObjectType;
use serde::{Deserialize, Serialize};

/// A TLS server name served with a certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sni {
    /// Shared fields.
    #[serde(flatten)]
    pub meta: Meta,
    /// Unique server name; may start with a `*.` wildcard.
    #[serde(default)]
    pub name: String,
    /// The certificate presented for this name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<ForeignKey>,
}

impl ResourceKind for Sni {
    const TYPE: ObjectType = ObjectType::Sni;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn kind_indexes(&self) -> Vec<Index> {
        vec![
            Index::unique("name", "name", self.name.as_str()),
            foreign_index(
                "certificate_id",
                "certificate",
                ObjectType::Certificate,
                self.certificate.as_ref(),
            ),
        ]
    }

    fn validate_fields(&self, errors: &mut ValidationError) {
        validate_hostname("name", &self.name, true, errors);
        validate_foreign("certificate", self.certificate.as_ref(), true, errors);
    }

    fn into_resource(self) -> Resource {
        Resource::Sni(self)
    }

    fn from_resource(resource: Resource) -> Result<Self, Resource> {
        match resource {
            Resource::Sni(sni) => Ok(sni),
            other => Err(other),
        }
    }
}
