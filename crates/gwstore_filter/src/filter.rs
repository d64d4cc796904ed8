//! Filter compilation pipeline.

use crate::ast::Expr;
use crate::checker::{self, UNDECLARED_REFERENCE};
use crate::env::FilterEnv;
use crate::error::{FilterError, FilterResult};
use crate::eval;
use crate::parser;
use crate::types::Type;
use crate::validate;

/// Longest accepted expression, in characters.
pub const MAX_EXPRESSION_LENGTH: usize = 2048;

/// A compiled, statically verified tag filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    expression: String,
    ast: Expr,
}

impl Filter {
    /// The source text the filter was compiled from.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The checked expression tree.
    #[must_use]
    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Evaluates the filter against one candidate's tags.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Evaluation`] if evaluation fails. A filter
    /// produced by [`compile_filter`] only fails on internal inconsistencies.
    pub fn matches(&self, tags: &[String]) -> FilterResult<bool> {
        eval::evaluate(&self.ast, tags)
    }
}

/// Compiles `expression` against the process-wide [`FilterEnv`].
///
/// # Errors
///
/// - [`FilterError::TooLong`] if the expression exceeds
///   [`MAX_EXPRESSION_LENGTH`] characters.
/// - [`FilterError::Invalid`] if it fails to parse, type-check, or uses a
///   construct outside the tag-filter grammar.
///
/// # Example
///
/// ```rust
/// use gwstore_filter::compile_filter;
///
/// let filter = compile_filter(r#""blue" in tags && "green" in tags"#).unwrap();
/// assert!(filter.matches(&["green".into(), "blue".into()]).unwrap());
///
/// let err = compile_filter("1 == 2").unwrap_err();
/// assert_eq!(err.to_string(), "undeclared reference to '_==_'");
/// ```
pub fn compile_filter(expression: &str) -> FilterResult<Filter> {
    FilterEnv::global().compile(expression)
}

pub(crate) fn compile(env: &FilterEnv, expression: &str) -> FilterResult<Filter> {
    let length = expression.chars().count();
    if length > MAX_EXPRESSION_LENGTH {
        return Err(FilterError::TooLong {
            max: MAX_EXPRESSION_LENGTH,
            actual: length,
        });
    }

    let ast = parser::parse(expression).map_err(|e| FilterError::invalid(e.to_string()))?;

    let checked = checker::check(env, &ast);
    if !checked.errors.is_empty() {
        let messages = match checked
            .errors
            .iter()
            .find(|m| m.starts_with(UNDECLARED_REFERENCE))
        {
            Some(undeclared) => vec![undeclared.clone()],
            None => checked.errors,
        };
        tracing::debug!(expression, ?messages, "filter rejected by checker");
        return Err(FilterError::Invalid { messages });
    }
    if !matches!(checked.ty, Type::Bool | Type::Dyn) {
        return Err(FilterError::invalid(format!(
            "expression must evaluate to 'bool', got '{}'",
            checked.ty
        )));
    }

    validate::validate(&ast)?;

    Ok(Filter {
        expression: expression.to_string(),
        ast,
    })
}
