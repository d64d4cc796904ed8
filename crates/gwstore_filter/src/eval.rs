//! Evaluation of compiled filters against a candidate's tags.

use crate::ast::{operators, Comprehension, Constant, Expr, ExprKind};
use crate::env::TAGS_VARIABLE;
use crate::error::{FilterError, FilterResult};

/// A runtime value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Value {
    Bool(bool),
    String(String),
    List(Vec<Value>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::String(_) => "string",
            Self::List(_) => "list",
        }
    }

    fn as_bool(&self) -> FilterResult<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(FilterError::evaluation(format!(
                "expected bool, got {}",
                other.type_name()
            ))),
        }
    }
}

/// Evaluates `expr` with `tags` bound to the candidate's tag list.
pub(crate) fn evaluate(expr: &Expr, tags: &[String]) -> FilterResult<bool> {
    let mut eval = Evaluator {
        tags,
        bindings: Vec::new(),
    };
    eval.eval(expr)?.as_bool()
}

struct Evaluator<'a> {
    tags: &'a [String],
    bindings: Vec<(String, Value)>,
}

impl Evaluator<'_> {
    fn eval(&mut self, expr: &Expr) -> FilterResult<Value> {
        match &expr.kind {
            ExprKind::Const(Constant::String(s)) => Ok(Value::String(s.clone())),
            ExprKind::Const(Constant::Bool(b)) => Ok(Value::Bool(*b)),
            ExprKind::Const(other) => Err(FilterError::evaluation(format!(
                "unsupported {} constant",
                other.kind_name()
            ))),
            ExprKind::Ident(name) => self.lookup(name),
            ExprKind::List(elements) => elements
                .iter()
                .map(|e| self.eval(e))
                .collect::<FilterResult<Vec<_>>>()
                .map(Value::List),
            ExprKind::Call {
                target: None,
                function,
                args,
            } => self.call(function, args),
            ExprKind::Comprehension(comp) => self.comprehension(comp),
            _ => Err(FilterError::evaluation("unsupported expression")),
        }
    }

    fn lookup(&self, name: &str) -> FilterResult<Value> {
        if let Some((_, value)) = self.bindings.iter().rev().find(|(n, _)| n == name) {
            return Ok(value.clone());
        }
        if name == TAGS_VARIABLE {
            return Ok(Value::List(
                self.tags.iter().cloned().map(Value::String).collect(),
            ));
        }
        Err(FilterError::evaluation(format!("no such variable '{name}'")))
    }

    fn call(&mut self, function: &str, args: &[Expr]) -> FilterResult<Value> {
        match (function, args) {
            (operators::IN, [needle, haystack]) => {
                let needle = self.eval(needle)?;
                if let ExprKind::Ident(name) = &haystack.kind {
                    // Avoid materializing the tag list for the common case.
                    if name == TAGS_VARIABLE && !self.is_bound(name) {
                        return Ok(Value::Bool(match &needle {
                            Value::String(s) => self.tags.iter().any(|t| t == s),
                            _ => false,
                        }));
                    }
                }
                match self.eval(haystack)? {
                    Value::List(items) => Ok(Value::Bool(items.contains(&needle))),
                    other => Err(FilterError::evaluation(format!(
                        "'in' requires a list, got {}",
                        other.type_name()
                    ))),
                }
            }
            (operators::LOGICAL_AND, [lhs, rhs]) => self.logical(lhs, rhs, false),
            (operators::LOGICAL_OR, [lhs, rhs]) => self.logical(lhs, rhs, true),
            (operators::LOGICAL_NOT, [operand]) => {
                Ok(Value::Bool(!self.eval(operand)?.as_bool()?))
            }
            (operators::NOT_STRICTLY_FALSE, [operand]) => {
                let strictly_false = matches!(self.eval(operand), Ok(Value::Bool(false)));
                Ok(Value::Bool(!strictly_false))
            }
            _ => Err(FilterError::evaluation(format!(
                "unsupported function '{function}'"
            ))),
        }
    }

    /// Commutative short-circuit: `absorbing` on either side wins even if
    /// the other side errors.
    fn logical(&mut self, lhs: &Expr, rhs: &Expr, absorbing: bool) -> FilterResult<Value> {
        let left = self.eval(lhs).and_then(|v| v.as_bool());
        if matches!(left, Ok(b) if b == absorbing) {
            return Ok(Value::Bool(absorbing));
        }
        let right = self.eval(rhs).and_then(|v| v.as_bool());
        if matches!(right, Ok(b) if b == absorbing) {
            return Ok(Value::Bool(absorbing));
        }
        left?;
        right?;
        Ok(Value::Bool(!absorbing))
    }

    fn comprehension(&mut self, comp: &Comprehension) -> FilterResult<Value> {
        let Value::List(items) = self.eval(&comp.iter_range)? else {
            return Err(FilterError::evaluation("comprehension range must be a list"));
        };
        let init = self.eval(&comp.accu_init)?;
        self.bindings.push((comp.accu_var.clone(), init));
        let accu_slot = self.bindings.len() - 1;

        let outcome = self.fold(comp, items, accu_slot);
        self.bindings.truncate(accu_slot);
        outcome
    }

    fn fold(
        &mut self,
        comp: &Comprehension,
        items: Vec<Value>,
        accu_slot: usize,
    ) -> FilterResult<Value> {
        for item in items {
            if !self.eval(&comp.loop_condition)?.as_bool()? {
                break;
            }
            self.bindings.push((comp.iter_var.clone(), item));
            let step = self.eval(&comp.loop_step);
            self.bindings.pop();
            self.bindings[accu_slot].1 = step?;
        }
        self.eval(&comp.result)
    }

    fn is_bound(&self, name: &str) -> bool {
        self.bindings.iter().any(|(n, _)| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn eval_str(input: &str, candidate: &[&str]) -> bool {
        evaluate(&parse(input).expect("parses"), &tags(candidate)).expect("evaluates")
    }

    #[test]
    fn membership() {
        assert!(eval_str(r#""a" in tags"#, &["a", "b"]));
        assert!(!eval_str(r#""c" in tags"#, &["a", "b"]));
        assert!(!eval_str(r#""a" in tags"#, &[]));
    }

    #[test]
    fn conjunction_and_disjunction() {
        assert!(eval_str(r#""a" in tags && "b" in tags"#, &["a", "b"]));
        assert!(!eval_str(r#""a" in tags && "c" in tags"#, &["a", "b"]));
        assert!(eval_str(r#""a" in tags || "c" in tags"#, &["a"]));
        assert!(!eval_str(r#""x" in tags || "y" in tags"#, &["a"]));
    }

    #[test]
    fn all_macro() {
        assert!(eval_str(r#"["a", "b"].all(x, x in tags)"#, &["a", "b", "c"]));
        assert!(!eval_str(r#"["a", "z"].all(x, x in tags)"#, &["a", "b"]));
        assert!(eval_str(r#"[].all(x, x in tags)"#, &[]));
    }

    #[test]
    fn exists_macro() {
        assert!(eval_str(r#"["z", "b"].exists(x, x in tags)"#, &["b"]));
        assert!(!eval_str(r#"["y", "z"].exists(x, x in tags)"#, &["b"]));
        assert!(!eval_str(r#"[].exists(x, x in tags)"#, &["b"]));
    }

    #[test]
    fn iteration_variable_shadows_tags() {
        assert!(eval_str(r#"[["a"]].all(tags, "a" in tags)"#, &[]));
    }

    #[test]
    fn non_bool_result_is_error() {
        let err = evaluate(&parse(r#""a""#).unwrap(), &[]).unwrap_err();
        assert!(matches!(err, FilterError::Evaluation { .. }));
    }
}
