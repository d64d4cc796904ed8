//! The declaration environment filters are checked against.

use crate::ast::operators;
use crate::error::FilterResult;
use crate::filter::Filter;
use crate::types::Type;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Name of the only variable visible to filter expressions.
pub const TAGS_VARIABLE: &str = "tags";

/// One signature of a declared function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overload {
    /// Parameter types; may contain [`Type::Param`].
    pub params: Vec<Type>,
    /// Result type; may contain [`Type::Param`].
    pub result: Type,
}

impl Overload {
    fn new(params: Vec<Type>, result: Type) -> Self {
        Self { params, result }
    }
}

/// The set of variables and functions a filter expression may reference.
///
/// The standard environment declares exactly:
/// - `tags: list(string)`
/// - `@in` (membership over lists and maps)
/// - `_&&_`, `_||_`, `!_`
/// - `@not_strictly_false` (emitted by macro expansion)
///
/// Every other identifier, operator, or function is an undeclared reference.
///
/// An environment is immutable once built. [`FilterEnv::global`] returns a
/// process-wide instance; components that compile filters should take a
/// `&FilterEnv` so tests can supply their own.
#[derive(Debug, Clone)]
pub struct FilterEnv {
    variables: BTreeMap<String, Type>,
    functions: BTreeMap<String, Vec<Overload>>,
}

impl FilterEnv {
    /// Builds the standard tag-filter environment.
    #[must_use]
    pub fn new() -> Self {
        let mut variables = BTreeMap::new();
        variables.insert(TAGS_VARIABLE.to_string(), Type::list(Type::String));

        let mut functions = BTreeMap::new();
        functions.insert(
            operators::IN.to_string(),
            vec![
                Overload::new(
                    vec![Type::Param("A"), Type::list(Type::Param("A"))],
                    Type::Bool,
                ),
                Overload::new(
                    vec![
                        Type::Param("A"),
                        Type::map(Type::Param("A"), Type::Param("B")),
                    ],
                    Type::Bool,
                ),
            ],
        );
        for logical in [operators::LOGICAL_AND, operators::LOGICAL_OR] {
            functions.insert(
                logical.to_string(),
                vec![Overload::new(vec![Type::Bool, Type::Bool], Type::Bool)],
            );
        }
        for unary in [operators::LOGICAL_NOT, operators::NOT_STRICTLY_FALSE] {
            functions.insert(
                unary.to_string(),
                vec![Overload::new(vec![Type::Bool], Type::Bool)],
            );
        }

        Self {
            variables,
            functions,
        }
    }

    /// Returns the process-wide standard environment.
    ///
    /// Built on first use and never mutated afterwards.
    pub fn global() -> &'static FilterEnv {
        static GLOBAL: OnceLock<FilterEnv> = OnceLock::new();
        GLOBAL.get_or_init(FilterEnv::new)
    }

    /// Looks up a declared variable.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&Type> {
        self.variables.get(name)
    }

    /// Looks up the overloads of a declared function.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<&[Overload]> {
        self.functions.get(name).map(Vec::as_slice)
    }

    /// Compiles `expression` against this environment.
    ///
    /// # Errors
    ///
    /// See [`crate::compile_filter`].
    pub fn compile(&self, expression: &str) -> FilterResult<Filter> {
        crate::filter::compile(self, expression)
    }
}

impl Default for FilterEnv {
    fn default() -> Self {
        Self::new()
    }
}
