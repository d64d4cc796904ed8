use super::{
    foreign_index, validate_foreign, validate_hostname, validate_name, ForeignKey, Meta, Resource,
    ResourceKind,
};
use crate::error::ValidationError;
use crate::index::Index;
use crate::object::ObjectType;
use serde::{Deserialize, Serialize};

const PROTOCOLS: [&str; 7] = ["http", "https", "grpc", "grpcs", "tcp", "tls", "udp"];

/// A rule matching client requests to a service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Shared fields.
    #[serde(flatten)]
    pub meta: Meta,
    /// Optional unique name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Matched `Host` header values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
    /// Matched path prefixes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    /// Matched HTTP methods.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    /// Accepted protocols; defaults to `http`, `https`.
    #[serde(default)]
    pub protocols: Vec<String>,
    /// The service traffic is forwarded to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<ForeignKey>,
    /// Strip the matched path prefix; defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_path: Option<bool>,
    /// Forward the client's `Host` header; defaults to false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_host: Option<bool>,
    /// Tie breaker between regex paths.
    #[serde(default)]
    pub regex_priority: i32,
}

impl ResourceKind for Route {
    const TYPE: ObjectType = ObjectType::Route;

    fn meta(&self) -> &Meta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut Meta {
        &mut self.meta
    }

    fn kind_indexes(&self) -> Vec<Index> {
        vec![
            Index::unique("name", "name", self.name.as_str()),
            foreign_index("svc_id", "service", ObjectType::Service, self.service.as_ref()),
        ]
    }

    fn apply_defaults(&mut self) {
        if self.protocols.is_empty() {
            self.protocols = vec!["http".to_string(), "https".to_string()];
        }
        self.strip_path.get_or_insert(true);
        self.preserve_host.get_or_insert(false);
    }

    fn validate_fields(&self, errors: &mut ValidationError) {
        if !self.name.is_empty() {
            validate_name("name", &self.name, errors);
        }
        validate_foreign("service", self.service.as_ref(), false, errors);

        for protocol in &self.protocols {
            if !PROTOCOLS.contains(&protocol.as_str()) {
                errors.add("protocols", format!("unknown protocol '{protocol}'"));
            }
        }
        let http = self
            .protocols
            .iter()
            .any(|p| matches!(p.as_str(), "http" | "https" | "grpc" | "grpcs"));
        if http && self.hosts.is_empty() && self.paths.is_empty() && self.methods.is_empty() {
            errors.add(
                "route",
                "must set at least one of 'hosts', 'paths', or 'methods' for http protocols",
            );
        }

        for host in &self.hosts {
            validate_hostname("hosts", host, true, errors);
        }
        for path in &self.paths {
            if !path.starts_with('/') && !path.starts_with("~/") {
                errors.add("paths", format!("'{path}' must begin with '/' or '~/'"));
            }
        }
        for method in &self.methods {
            if method.is_empty() || !method.chars().all(|c| c.is_ascii_uppercase()) {
                errors.add("methods", format!("'{method}' must be uppercase letters"));
            }
        }
    }

    fn into_resource(self) -> Resource {
        Resource::Route(self)
    }

    fn from_resource(resource: Resource) -> Result<Self, Resource> {
        match resource {
            Resource::Route(route) => Ok(route),
            other => Err(other),
        }
    }
}
