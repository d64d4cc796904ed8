use super::{Meta, Resource, ResourceKind};
use crate::error::ValidationError;
use crate::index::Index;
use crate::object::ObjectType;
use serde::{Deserialize, Serialize};

/// An API consumer, identified by username and/or custom ID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    /// Shared fields.
    #[serde(flatten)]
    pub meta: Meta,
    /// Unique username.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    /// Unique identifier from an external system.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub custom_id: String,
}

impl ResourceKind for Consumer {
    const TYPE: ObjectType = ObjectType::Consumer;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn kind_indexes(&self) -> Vec<Index> {
        vec![
            Index::unique("username", "username", self.username.as_str()),
            Index::unique("custom_id", "custom_id", self.custom_id.as_str()),
        ]
    }

    fn validate_fields(&self, errors: &mut ValidationError) {
        if self.username.is_empty() && self.custom_id.is_empty() {
            errors.add("consumer", "at least one of 'username' or 'custom_id' is required");
        }
    }

    fn into_resource(self) -> Resource {
        Resource::Consumer(self)
    }

    fn from_resource(resource: Resource) -> Result<Self, Resource> {
        match resource {
            Resource::Consumer(consumer) => Ok(consumer),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    #[test]
    fn needs_an_identity() {
        let mut consumer = Consumer::default();
        consumer.process_defaults().unwrap();
        assert!(consumer.validate().is_err());

        consumer.custom_id = "ext-1".to_string();
        consumer.validate().unwrap();
    }

    #[test]
    fn both_identities_indexed() {
        let consumer = Consumer {
            username: "alice".to_string(),
            custom_id: "ext-1".to_string(),
            ..Consumer::default()
        };
        let names: Vec<String> = consumer.indexes().into_iter().map(|i| i.name).collect();
        assert_eq!(names, ["username", "custom_id"]);
    }
}
