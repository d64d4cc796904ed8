//! # gwstore Testkit
//!
//! Test utilities for gwstore.
//!
//! This crate provides:
//! - Store fixtures and sample resources
//! - A fault-injecting key-value backend
//! - Property-based test generators using proptest
//! - Concurrent stress helpers
//! - One-time test logging setup
//!
//! ## Usage
//!
//! ```rust
//! use gwstore_testkit::prelude::*;
//!
//! let fx = TestStore::new();
//! let svc = fx.service("billing");
//! assert!(!svc.meta.id.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty;
pub mod fixtures;
pub mod generators;
pub mod stress;

use std::sync::Once;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faulty::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
    pub use crate::init_test_logging;
}

pub use faulty::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;

static LOGGING: Once = Once::new();

/// Installs a `tracing` subscriber honoring `RUST_LOG`, once per process.
///
/// Output goes through the test writer so it is captured per test.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
