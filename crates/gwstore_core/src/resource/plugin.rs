use super::{
    foreign_index, validate_foreign, validate_name, ForeignKey, Meta, Resource, ResourceKind,
};
use crate::error::ValidationError;
use crate::index::Index;
use crate::object::ObjectType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A plugin instance, optionally scoped to a service, route, and/or consumer.
///
/// One instance of a plugin may exist per scope; the `unique` index encodes
/// the plugin name together with all three scope IDs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    /// Shared fields.
    #[serde(flatten)]
    pub meta: Meta,
    /// Name of the plugin implementation.
    #[serde(default)]
    pub name: String,
    /// Plugin-specific configuration.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Whether the plugin runs; defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Protocols the plugin runs on.
    #[serde(default)]
    pub protocols: Vec<String>,
    /// Service scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ForeignKey>,
    /// Route scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<ForeignKey>,
    /// Consumer scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer: Option<ForeignKey>,
}

impl Plugin {
    fn scope_key(&self) -> String {
        let id = |fk: &Option<ForeignKey>| fk.as_ref().map(|f| f.id.clone()).unwrap_or_default();
        format!(
            "{}.{}.{}.{}",
            self.name,
            id(&self.service),
            id(&self.route),
            id(&self.consumer)
        )
    }
}

impl ResourceKind for Plugin {
    const TYPE: ObjectType = ObjectType::Plugin;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn kind_indexes(&self) -> Vec<Index> {
        let unique = if self.name.is_empty() {
            String::new()
        } else {
            self.scope_key()
        };
        vec![
            Index::unique("unique", "name", unique),
            foreign_index("svc_id", "service", ObjectType::Service, self.service.as_ref()),
            foreign_index("route_id", "route", ObjectType::Route, self.route.as_ref()),
            foreign_index(
                "consumer_id",
                "consumer",
                ObjectType::Consumer,
                self.consumer.as_ref(),
            ),
        ]
    }

    fn apply_defaults(&mut self) {
        self.enabled.get_or_insert(true);
        if self.protocols.is_empty() {
            self.protocols = ["grpc", "grpcs", "http", "https"]
                .iter()
                .map(|p| (*p).to_string())
                .collect();
        }
    }

    fn validate_fields(&self, errors: &mut ValidationError) {
        validate_name("name", &self.name, errors);
        validate_foreign("service", self.service.as_ref(), false, errors);
        validate_foreign("route", self.route.as_ref(), false, errors);
        validate_foreign("consumer", self.consumer.as_ref(), false, errors);
    }

    fn into_resource(self) -> Resource {
        Resource::Plugin(self)
    }

    fn from_resource(resource: Resource) -> Result<Self, Resource> {
        match resource {
            Resource::Plugin(plugin) => Ok(plugin),
            other => Err(other),
        }
    }
}
