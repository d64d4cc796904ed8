use super::{validate_hostname, Meta, Resource, ResourceKind};
use crate::error::ValidationError;
use crate::index::Index;
use crate::object::ObjectType;
use serde::{Deserialize, Serialize};

const ALGORITHMS: [&str; 4] = [
    "round-robin",
    "consistent-hashing",
    "least-connections",
    "latency",
];
const HASH_ON: [&str; 6] = ["none", "consumer", "ip", "header", "cookie", "path"];
const SLOTS_MIN: u32 = 10;
const SLOTS_MAX: u32 = 65_536;

/// A virtual hostname load-balancing across targets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upstream {
    /// Shared fields.
    #[serde(flatten)]
    pub meta: Meta,
    /// Unique hostname services use to address this upstream.
    #[serde(default)]
    pub name: String,
    /// Balancing algorithm; defaults to `round-robin`.
    #[serde(default)]
    pub algorithm: String,
    /// Hashing input for `consistent-hashing`; defaults to `none`.
    #[serde(default)]
    pub hash_on: String,
    /// Balancer ring size; defaults to 10000.
    #[serde(default)]
    pub slots: u32,
    /// Overrides the `Host` header sent to targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_header: Option<String>,
}

impl ResourceKind for Upstream {
    const TYPE: ObjectType = ObjectType::Upstream;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn kind_indexes(&self) -> Vec<Index> {
        vec![Index::unique("name", "name", self.name.as_str())]
    }

    fn apply_defaults(&mut self) {
        if self.algorithm.is_empty() {
            self.algorithm = "round-robin".to_string();
        }
        if self.hash_on.is_empty() {
            self.hash_on = "none".to_string();
        }
        if self.slots == 0 {
            self.slots = 10_000;
        }
    }

    fn validate_fields(&self, errors: &mut ValidationError) {
        validate_hostname("name", &self.name, false, errors);
        if !ALGORITHMS.contains(&self.algorithm.as_str()) {
            errors.add("algorithm", format!("must be one of: {}", ALGORITHMS.join(", ")));
        }
        if !HASH_ON.contains(&self.hash_on.as_str()) {
            errors.add("hash_on", format!("must be one of: {}", HASH_ON.join(", ")));
        }
        if !(SLOTS_MIN..=SLOTS_MAX).contains(&self.slots) {
            errors.add(
                "slots",
                format!("must be within range [{SLOTS_MIN} - {SLOTS_MAX}]"),
            );
        }
        if let Some(host) = &self.host_header {
            validate_hostname("host_header", host, false, errors);
        }
    }

    fn into_resource(self) -> Resource {
        Resource::Upstream(self)
    }

    fn from_resource(resource: Resource) -> Result<Self, Resource> {
        match resource {
            Resource::Upstream(upstream) => Ok(upstream),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    #[test]
    fn defaults() {
        let mut upstream = Upstream {
            name: "backend.internal".to_string(),
            ..Upstream::default()
        };
        upstream.process_defaults().unwrap();
        assert_eq!(upstream.algorithm, "round-robin");
        assert_eq!(upstream.hash_on, "none");
        assert_eq!(upstream.slots, 10_000);
        upstream.validate().unwrap();
    }

    #[test]
    fn slots_bounds() {
        let mut upstream = Upstream {
            name: "backend".to_string(),
            slots: 5,
            ..Upstream::default()
        };
        upstream.process_defaults().unwrap();
        let err = upstream.validate().unwrap_err();
        assert_eq!(err.messages_for("slots"), ["must be within range [10 - 65536]"]);
    }
}
