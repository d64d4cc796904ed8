//! Structural validation of a type-checked expression.
//!
//! Type checking only proves the expression is well-typed in the filter
//! environment. This walk enforces the narrower grammar list queries accept:
//! string literals, `tags`, membership, one kind of logical operator, and
//! `all`/`exists` over literal lists. Inside a macro body, membership may also
//! test against a list literal.

use crate::ast::{operators, Comprehension, Constant, Expr, ExprKind};
use crate::checker::UNDECLARED_REFERENCE;
use crate::error::{FilterError, FilterResult};
use std::collections::BTreeSet;

/// Rejection reported when `&&` and `||` both appear in one expression.
pub const MIXED_LOGICAL_OPERATORS: &str =
    "multiple logical operators are not supported in expressions";

/// Rejection reported when a macro ranges over anything but a list literal.
pub const MACRO_RANGE_NOT_LITERAL: &str =
    "macros must range upon a provided list value, not a variable";

/// Validates `expr` and rejects mixed logical operators.
///
/// # Errors
///
/// Returns [`FilterError::Invalid`] with the first unsupported construct, or
/// [`MIXED_LOGICAL_OPERATORS`] when the tree uses both `&&` and `||`.
pub fn validate(expr: &Expr) -> FilterResult<()> {
    let mut logical = BTreeSet::new();
    validate_expression_kind(expr, None, false, &mut logical)?;
    if logical.contains(operators::LOGICAL_AND) && logical.contains(operators::LOGICAL_OR) {
        return Err(FilterError::invalid(MIXED_LOGICAL_OPERATORS));
    }
    Ok(())
}

/// Recursively validates `expr`, recording every logical operator in the
/// tree in `logical`, including those a macro expands to.
///
/// `parent` is the immediately enclosing node, used to tell macro-generated
/// negation apart from a user-written `!`. `in_macro` is set while walking a
/// comprehension body, where the right-hand side of `in` may be a list
/// literal.
///
/// # Errors
///
/// Returns [`FilterError::Invalid`] for the first unsupported construct found.
pub fn validate_expression_kind(
    expr: &Expr,
    parent: Option<&Expr>,
    in_macro: bool,
    logical: &mut BTreeSet<&'static str>,
) -> FilterResult<()> {
    match &expr.kind {
        ExprKind::Const(Constant::String(_)) | ExprKind::Ident(_) => Ok(()),
        ExprKind::Const(other) => Err(unsupported(&format!(
            "{} constant",
            other.kind_name()
        ))),
        ExprKind::Call {
            target,
            function,
            args,
        } => {
            if target.is_some() {
                return Err(undeclared(function));
            }
            match function.as_str() {
                operators::IN | operators::NOT_STRICTLY_FALSE => {}
                operators::LOGICAL_AND => {
                    logical.insert(operators::LOGICAL_AND);
                }
                operators::LOGICAL_OR => {
                    logical.insert(operators::LOGICAL_OR);
                }
                operators::LOGICAL_NOT => {
                    let guarded = parent
                        .and_then(|p| p.kind.function())
                        .is_some_and(|f| f == operators::NOT_STRICTLY_FALSE);
                    if !guarded {
                        return Err(undeclared(function));
                    }
                }
                other => return Err(undeclared(other)),
            }
            for (position, arg) in args.iter().enumerate() {
                match &arg.kind {
                    ExprKind::List(elements)
                        if in_macro && position == 1 && function == operators::IN =>
                    {
                        for element in elements {
                            validate_expression_kind(element, Some(arg), in_macro, logical)?;
                        }
                    }
                    _ => validate_expression_kind(arg, Some(expr), in_macro, logical)?,
                }
            }
            Ok(())
        }
        ExprKind::Comprehension(comp) => validate_comprehension(expr, comp, logical),
        ExprKind::Select { .. } => Err(unsupported("field selection")),
        ExprKind::List(_) => Err(unsupported("list construction")),
        ExprKind::Map(_) => Err(unsupported("map construction")),
        ExprKind::Struct { .. } => Err(unsupported("struct construction")),
    }
}

fn validate_comprehension(
    expr: &Expr,
    comp: &Comprehension,
    logical: &mut BTreeSet<&'static str>,
) -> FilterResult<()> {
    let ExprKind::List(elements) = &comp.iter_range.kind else {
        return Err(FilterError::invalid(MACRO_RANGE_NOT_LITERAL));
    };
    for element in elements {
        validate_expression_kind(element, Some(&comp.iter_range), false, logical)?;
    }
    for part in [&comp.loop_condition, &comp.loop_step, &comp.result] {
        validate_expression_kind(part, Some(expr), true, logical)?;
    }
    Ok(())
}

fn undeclared(name: &str) -> FilterError {
    FilterError::invalid(format!("{UNDECLARED_REFERENCE}{name}'"))
}

fn unsupported(kind: &str) -> FilterError {
    FilterError::invalid(format!("unsupported expression: {kind}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn validate_str(input: &str) -> FilterResult<()> {
        validate(&parse(input).expect("parses"))
    }

    fn message(input: &str) -> String {
        validate_str(input).expect_err("rejected").to_string()
    }

    #[test]
    fn accepts_membership() {
        validate_str(r#""a" in tags"#).unwrap();
    }

    #[test]
    fn accepts_single_logical_kind() {
        validate_str(r#""a" in tags && "b" in tags && "c" in tags"#).unwrap();
        validate_str(r#""a" in tags || "b" in tags"#).unwrap();
    }

    #[test]
    fn accepts_macros_over_literal_lists() {
        validate_str(r#"["a", "b"].all(x, x in tags)"#).unwrap();
        validate_str(r#"["a", "b"].exists(x, x in tags)"#).unwrap();
    }

    #[test]
    fn macro_accumulator_counts_as_logical_operator() {
        assert_eq!(
            message(r#"["a"].all(x, x in tags) || "b" in tags"#),
            MIXED_LOGICAL_OPERATORS
        );
        assert_eq!(
            message(r#"["a"].exists(x, x in tags) && "b" in tags"#),
            MIXED_LOGICAL_OPERATORS
        );
        validate_str(r#"["a"].all(x, x in tags) && "b" in tags"#).unwrap();
        validate_str(r#"["a"].exists(x, x in tags || "b" in tags)"#).unwrap();
    }

    #[test]
    fn accepts_list_literal_membership_inside_macro() {
        validate_str(r#"["a"].exists(x, x in ["a", "b"])"#).unwrap();
        validate_str(r#"["a"].all(x, x in ["a"] && x in tags)"#).unwrap();
    }

    #[test]
    fn rejects_list_literal_on_left_of_membership_inside_macro() {
        assert_eq!(
            message(r#"["a"].exists(x, [x] in tags)"#),
            "unsupported expression: list construction"
        );
    }

    #[test]
    fn rejects_mixed_logical_operators() {
        assert_eq!(
            message(r#"("a" in tags && "b" in tags) || "c" in tags"#),
            MIXED_LOGICAL_OPERATORS
        );
    }

    #[test]
    fn rejects_mixed_operators_inside_macro_predicate() {
        assert_eq!(
            message(r#"["a"].all(x, x in tags || "b" in tags) && "c" in tags"#),
            MIXED_LOGICAL_OPERATORS
        );
    }

    #[test]
    fn rejects_user_negation() {
        assert_eq!(message(r#"!("a" in tags)"#), "undeclared reference to '!_'");
    }

    #[test]
    fn rejects_macro_over_variable() {
        assert_eq!(message("tags.all(x, x in tags)"), MACRO_RANGE_NOT_LITERAL);
    }

    #[test]
    fn rejects_bare_list_literal() {
        assert_eq!(
            message(r#""a" in ["a", "b"]"#),
            "unsupported expression: list construction"
        );
    }

    #[test]
    fn rejects_non_string_constants() {
        assert_eq!(message("true"), "unsupported expression: bool constant");
        assert_eq!(message("1 in tags"), "unsupported expression: int constant");
    }

    #[test]
    fn rejects_selection_and_construction() {
        assert_eq!(message("a.b"), "unsupported expression: field selection");
        assert_eq!(
            message(r#"{"a": "b"}"#),
            "unsupported expression: map construction"
        );
        assert_eq!(
            message(r#"Msg{f: "a"}"#),
            "unsupported expression: struct construction"
        );
    }

    #[test]
    fn rejects_receiver_calls() {
        assert_eq!(message("tags.size()"), "undeclared reference to 'size'");
    }
}
