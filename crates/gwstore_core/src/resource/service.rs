use super::{validate_hostname, validate_name, Meta, Resource, ResourceKind};
use crate::error::ValidationError;
use crate::index::Index;
use crate::object::ObjectType;
use serde::{Deserialize, Serialize};

const PROTOCOLS: [&str; 7] = ["http", "https", "grpc", "grpcs", "tcp", "tls", "udp"];
const DEFAULT_TIMEOUT_MS: u32 = 60_000;
const DEFAULT_RETRIES: u32 = 5;

/// An upstream service requests are proxied to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    /// Shared fields.
    #[serde(flatten)]
    pub meta: Meta,
    /// Optional unique name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Upstream host or upstream name.
    #[serde(default)]
    pub host: String,
    /// Upstream port; defaults to 80.
    #[serde(default)]
    pub port: u16,
    /// Upstream protocol; defaults to `http`.
    #[serde(default)]
    pub protocol: String,
    /// Path prefix prepended to proxied requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Proxy retries; defaults to 5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
    /// Connect timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u32>,
    /// Read timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout: Option<u32>,
    /// Write timeout in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_timeout: Option<u32>,
    /// Whether the service receives traffic; defaults to true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ResourceKind for Service {
    const TYPE: ObjectType = ObjectType::Service;

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
        if self.port == 0 {
            self.port = 80;
        }
        if self.protocol.is_empty() {
            self.protocol = "http".to_string();
        }
        self.retries.get_or_insert(DEFAULT_RETRIES);
        self.connect_timeout.get_or_insert(DEFAULT_TIMEOUT_MS);
        self.read_timeout.get_or_insert(DEFAULT_TIMEOUT_MS);
        self.write_timeout.get_or_insert(DEFAULT_TIMEOUT_MS);
        self.enabled.get_or_insert(true);
    }

    fn validate_fields(&self, errors: &mut ValidationError) {
        if !self.name.is_empty() {
            validate_name("name", &self.name, errors);
        }
        validate_hostname("host", &self.host, false, errors);
        if self.port == 0 {
            errors.add("port", "must be within range [1 - 65535]");
        }
        if !PROTOCOLS.contains(&self.protocol.as_str()) {
            errors.add(
                "protocol",
                format!("must be one of: {}", PROTOCOLS.join(", ")),
            );
        }
        if let Some(path) = &self.path {
            if !path.starts_with('/') {
                errors.add("path", "must begin with '/'");
            }
            if matches!(self.protocol.as_str(), "tcp" | "tls" | "udp") {
                errors.add("path", "must not be set for stream protocols");
            }
        }
        for (field, timeout) in [
            ("connect_timeout", self.connect_timeout),
            ("read_timeout", self.read_timeout),
            ("write_timeout", self.write_timeout),
        ] {
            if timeout == Some(0) {
                errors.add(field, "must be > 0");
            }
        }
    }

    fn into_resource(self) -> Resource {
        Resource::Service(self)
    }

    fn from_resource(resource: Resource) -> Result<Self, Resource> {
        match resource {
            Resource::Service(service) => Ok(service),
            other => Err(other),
        }
    }
}
