use super::{foreign_index, validate_foreign, ForeignKey, Meta, Resource, ResourceKind};
use crate::error::ValidationError;
use crate::index::Index;
use crate::object::ObjectType;
use serde::{Deserialize, Serialize};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_WEIGHT: u32 = 100;
const MAX_WEIGHT: u32 = 65_535;

/// A `host:port` backend inside an upstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Shared fields.
    #[serde(flatten)]
    pub meta: Meta,
    /// `host[:port]`; the port defaults to 8000.
    #[serde(default)]
    pub target: String,
    /// The owning upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upstream: Option<ForeignKey>,
    /// Balancer weight; defaults to 100, 0 disables the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

impl ResourceKind for Target {
    const TYPE: ObjectType = ObjectType::Target;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn kind_indexes(&self) -> Vec<Index> {
        let unique = match (&self.upstream, self.target.is_empty()) {
            (Some(upstream), false) => format!("{}:{}", upstream.id, self.target),
            _ => String::new(),
        };
        vec![
            Index::unique("target", "target", unique),
            foreign_index(
                "upstream_id",
                "upstream",
                ObjectType::Upstream,
                self.upstream.as_ref(),
            ),
        ]
    }

    fn apply_defaults(&mut self) {
        if !self.target.is_empty() && split_port(&self.target).1.is_none() {
            self.target = format!("{}:{DEFAULT_PORT}", self.target);
        }
        self.weight.get_or_insert(DEFAULT_WEIGHT);
    }

    fn validate_fields(&self, errors: &mut ValidationError) {
        validate_foreign("upstream", self.upstream.as_ref(), true, errors);
        if self.target.is_empty() {
            errors.add("target", "required");
        } else {
            let (host, port) = split_port(&self.target);
            if host.is_empty() {
                errors.add("target", "missing host");
            }
            if matches!(port, Some(p) if p.parse::<u16>().map_or(true, |p| p == 0)) {
                errors.add("target", "port must be within range [1 - 65535]");
            }
        }
        if self.weight.is_some_and(|w| w > MAX_WEIGHT) {
            errors.add("weight", format!("must be within range [0 - {MAX_WEIGHT}]"));
        }
    }

    fn into_resource(self) -> Resource {
        Resource::Target(self)
    }

    fn from_resource(resource: Resource) -> Result<Self, Resource> {
        match resource {
            Resource::Target(target) => Ok(target),
            other => Err(other),
        }
    }
}

/// Splits `host[:port]`; bracketed IPv6 hosts keep their colons.
fn split_port(target: &str) -> (&str, Option<&str>) {
    if let Some(rest) = target.strip_prefix('[') {
        return match rest.split_once(']') {
            Some((host, tail)) => (host, tail.strip_prefix(':')),
            None => (target, None),
        };
    }
    match target.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => (host, Some(port)),
        _ => (target, None),
    }
}
