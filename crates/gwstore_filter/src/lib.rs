//! # gwstore filter
//!
//! A deliberately narrow boolean expression language for filtering list
//! results by tag membership.
//!
//! The accepted grammar is a subset of the common expression language:
//!
//! - string literals and the single variable `tags: list(string)`
//! - membership: `"blue" in tags`
//! - either `&&` or `||`, never both in one expression
//! - `all` / `exists` over a literal list:
//!   `["blue", "green"].all(x, x in tags)`
//!
//! Everything else is rejected with a precise message, usually
//! `undeclared reference to '<operator>'` or `unsupported expression: <kind>`.
//!
//! Compilation is a fixed pipeline: length check, parse, type check against a
//! [`FilterEnv`], then a structural walk ([`validate_expression_kind`]).
//!
//! ```rust
//! use gwstore_filter::{compile_filter, FilterError};
//!
//! let filter = compile_filter(r#"["a", "b"].exists(x, x in tags)"#)?;
//! assert!(filter.matches(&["b".to_string()])?);
//!
//! let err = compile_filter(r#"("a" in tags && "b" in tags) || "c" in tags"#).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "multiple logical operators are not supported in expressions"
//! );
//! # Ok::<(), FilterError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod ast;
mod checker;
mod env;
mod error;
mod eval;
mod filter;
mod lexer;
pub mod parser;
pub mod types;
mod validate;

pub use env::{FilterEnv, Overload, TAGS_VARIABLE};
pub use error::{FilterError, FilterResult};
pub use filter::{compile_filter, Filter, MAX_EXPRESSION_LENGTH};
pub use validate::{
    validate_expression_kind, MACRO_RANGE_NOT_LITERAL, MIXED_LOGICAL_OPERATORS,
};
