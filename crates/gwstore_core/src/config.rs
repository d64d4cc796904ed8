//! Store configuration.

/// Configuration for an [`ObjectStore`](crate::ObjectStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Cluster every key is namespaced under; `None` for the global space.
    pub cluster: Option<String>,

    /// How many referring objects a refused delete reports.
    ///
    /// The reverse-index scan stops after this many entries, so the default
    /// of 1 stops at the first referrer.
    pub reference_scan_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cluster: None,
            reference_scan_limit: 1,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespaces every key under `cluster`.
    ///
    /// The identifier is validated when the store is built; an invalid one
    /// aborts store construction.
    #[must_use]
    pub fn cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = Some(cluster.into());
        self
    }

    /// Sets how many referrers a refused delete reports (at least 1).
    #[must_use]
    pub const fn reference_scan_limit(mut self, limit: usize) -> Self {
        self.reference_scan_limit = if limit == 0 { 1 } else { limit };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert!(config.cluster.is_none());
        assert_eq!(config.reference_scan_limit, 1);
    }

    #[test]
    fn builder_pattern() {
        let config = StoreConfig::new()
            .cluster("tenant-a")
            .reference_scan_limit(10);
        assert_eq!(config.cluster.as_deref(), Some("tenant-a"));
        assert_eq!(config.reference_scan_limit, 10);
    }

    #[test]
    fn zero_scan_limit_is_raised() {
        assert_eq!(StoreConfig::new().reference_scan_limit(0).reference_scan_limit, 1);
    }
}
