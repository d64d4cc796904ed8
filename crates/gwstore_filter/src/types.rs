//! Static types used by the checker.

use std::collections::HashMap;
use std::fmt;

/// The static type of an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// `bool`
    Bool,
    /// `int`
    Int,
    /// `uint`
    Uint,
    /// `double`
    Double,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// The type of `null`.
    Null,
    /// `list(elem)`
    List(Box<Type>),
    /// `map(key, value)`
    Map(Box<Type>, Box<Type>),
    /// Dynamically typed; assignable to and from anything.
    Dyn,
    /// A type parameter in a function signature.
    Param(&'static str),
    /// Placeholder for a sub-expression that already failed to check.
    Error,
}

impl Type {
    /// Shorthand for `list(elem)`.
    #[must_use]
    pub fn list(elem: Type) -> Self {
        Self::List(Box::new(elem))
    }

    /// Shorthand for `map(key, value)`.
    #[must_use]
    pub fn map(key: Type, value: Type) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// Returns true if this type is, or contains, an error placeholder.
    #[must_use]
    pub fn is_error(&self) -> bool {
        match self {
            Self::Error => true,
            Self::List(elem) => elem.is_error(),
            Self::Map(k, v) => k.is_error() || v.is_error(),
            _ => false,
        }
    }

    /// Replaces bound type parameters using `bindings`; unbound ones become `dyn`.
    #[must_use]
    pub fn substitute(&self, bindings: &HashMap<&'static str, Type>) -> Type {
        match self {
            Self::Param(name) => bindings.get(name).cloned().unwrap_or(Self::Dyn),
            Self::List(elem) => Self::list(elem.substitute(bindings)),
            Self::Map(k, v) => Self::map(k.substitute(bindings), v.substitute(bindings)),
            other => other.clone(),
        }
    }

    /// Joins two element types, widening to `dyn` when they differ.
    #[must_use]
    pub fn join(self, other: Type) -> Type {
        if self == other {
            self
        } else {
            Self::Dyn
        }
    }
}

/// Tests whether a value of type `arg` can be passed where `param` is
/// expected, binding type parameters as it goes.
pub(crate) fn is_assignable(
    param: &Type,
    arg: &Type,
    bindings: &mut HashMap<&'static str, Type>,
) -> bool {
    match (param, arg) {
        (_, Type::Error) | (Type::Dyn, _) | (_, Type::Dyn) => true,
        (Type::Param(name), _) => match bindings.get(name).cloned() {
            Some(bound) => {
                if is_assignable(&bound, arg, bindings) {
                    true
                } else if is_assignable(arg, &bound, bindings) {
                    // Widen the binding, e.g. from a list literal's element.
                    bindings.insert(*name, arg.clone());
                    true
                } else {
                    false
                }
            }
            None => {
                bindings.insert(*name, arg.clone());
                true
            }
        },
        (Type::List(p), Type::List(a)) => is_assignable(p, a, bindings),
        (Type::Map(pk, pv), Type::Map(ak, av)) => {
            is_assignable(pk, ak, bindings) && is_assignable(pv, av, bindings)
        }
        (p, a) => p == a,
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Uint => write!(f, "uint"),
            Self::Double => write!(f, "double"),
            Self::String => write!(f, "string"),
            Self::Bytes => write!(f, "bytes"),
            Self::Null => write!(f, "null_type"),
            Self::List(elem) => write!(f, "list({elem})"),
            Self::Map(k, v) => write!(f, "map({k}, {v})"),
            Self::Dyn => write!(f, "dyn"),
            Self::Param(name) => write!(f, "{name}"),
            Self::Error => write!(f, "*error*"),
        }
    }
}
