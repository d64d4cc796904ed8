//! # gwstore Core
//!
//! Persistence core of the gateway control plane.
//!
//! This crate provides:
//! - The [`Object`] contract and the closed set of gateway [`Resource`]s
//! - The [`IndexEngine`]: unique and foreign-key indexes kept in the same
//!   key-value store as the records they describe
//! - The [`ObjectStore`]: create, read, upsert, delete, and paginated list,
//!   each mutation applied in one backend transaction
//! - [`ListOpts`], [`ReadOpts`], and [`DeleteOpts`]
//!
//! Tag filters for listings are compiled by `gwstore_filter`; the backend
//! contract lives in `gwstore_kv`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod error;
mod index;
mod keys;
mod object;
mod options;
pub mod resource;
mod store;

pub use config::StoreConfig;
pub use context::Context;
pub use error::{
    ConstraintError, FieldError, ObjectRef, StoreError, StoreResult, ValidationError,
    FILTER_FIELD, FOREIGN_NOT_FOUND, FOREIGN_REFERENCES_EXIST,
};
pub use index::{Index, IndexEngine, IndexType};
pub use keys::{ClusterId, KeySpace, FOREIGN_SENTINEL};
pub use object::{Object, ObjectType};
pub use options::{
    DeleteOpts, ListOpts, ListOptsBuilder, ListScope, ReadOpts, DEFAULT_PAGE, DEFAULT_PAGE_SIZE,
    MAX_PAGE_SIZE,
};
pub use resource::{
    Certificate, Consumer, ForeignKey, Meta, Plugin, Resource, ResourceKind, Route, Service, Sni,
    Target, Upstream,
};
pub use store::{ListPage, ObjectStore};

pub use gwstore_filter::{compile_filter, Filter};
