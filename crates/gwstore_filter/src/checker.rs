//! Static type checking of parsed expressions against a [`FilterEnv`].
//!
//! The checker never stops at the first problem: every diagnostic is
//! collected so the compiler can decide which ones to surface. Arguments are
//! checked before the function they are passed to is resolved, which fixes
//! the order diagnostics appear in. Unexpanded macros are the exception: they
//! are reported by name and their arguments are never checked, since those
//! bind variables no scope declares.

use crate::ast::{Comprehension, Constant, Expr, ExprKind};
use crate::env::FilterEnv;
use crate::parser::is_unexpanded_macro;
use crate::types::{is_assignable, Type};
use std::collections::HashMap;

/// Prefix of the diagnostic emitted for unknown identifiers and functions.
pub(crate) const UNDECLARED_REFERENCE: &str = "undeclared reference to '";

/// Outcome of checking one expression.
#[derive(Debug)]
pub(crate) struct Checked {
    /// Static type of the whole expression.
    pub ty: Type,
    /// Diagnostics in the order they were found.
    pub errors: Vec<String>,
}

/// Type-checks `expr` in `env`.
pub(crate) fn check(env: &FilterEnv, expr: &Expr) -> Checked {
    let mut checker = Checker {
        env,
        scopes: Vec::new(),
        errors: Vec::new(),
    };
    let ty = checker.check(expr);
    Checked {
        ty,
        errors: checker.errors,
    }
}

struct Checker<'a> {
    env: &'a FilterEnv,
    scopes: Vec<HashMap<String, Type>>,
    errors: Vec<String>,
}

impl Checker<'_> {
    fn report(&mut self, message: String) -> Type {
        self.errors.push(message);
        Type::Error
    }

    fn undeclared(&mut self, name: &str) -> Type {
        self.report(format!("{UNDECLARED_REFERENCE}{name}'"))
    }

    fn check(&mut self, expr: &Expr) -> Type {
        match &expr.kind {
            ExprKind::Const(constant) => constant_type(constant),
            ExprKind::Ident(name) => self.ident(name),
            ExprKind::Select { operand, .. } => {
                let operand = self.check(operand);
                match operand {
                    Type::Error => Type::Error,
                    Type::Dyn => Type::Dyn,
                    Type::Map(_, value) => *value,
                    other => self.report(format!(
                        "type '{other}' does not support field selection"
                    )),
                }
            }
            ExprKind::Call {
                target,
                function,
                args,
            } => self.call(target.as_deref(), function, args),
            ExprKind::List(elements) => {
                let elem = elements
                    .iter()
                    .map(|e| self.check(e))
                    .reduce(Type::join)
                    .unwrap_or(Type::Dyn);
                Type::list(elem)
            }
            ExprKind::Map(entries) => {
                let mut key_ty: Option<Type> = None;
                let mut value_ty: Option<Type> = None;
                for (key, value) in entries {
                    let k = self.check(key);
                    let v = self.check(value);
                    key_ty = Some(key_ty.map_or(k.clone(), |prev| prev.join(k)));
                    value_ty = Some(value_ty.map_or(v.clone(), |prev| prev.join(v)));
                }
                Type::map(
                    key_ty.unwrap_or(Type::Dyn),
                    value_ty.unwrap_or(Type::Dyn),
                )
            }
            ExprKind::Struct { type_name, fields } => {
                for (_, value) in fields {
                    self.check(value);
                }
                self.undeclared(type_name)
            }
            ExprKind::Comprehension(comp) => self.comprehension(comp),
        }
    }

    fn ident(&mut self, name: &str) -> Type {
        if let Some(ty) = self.scopes.iter().rev().find_map(|scope| scope.get(name)) {
            return ty.clone();
        }
        match self.env.variable(name) {
            Some(ty) => ty.clone(),
            None => self.undeclared(name),
        }
    }

    fn call(&mut self, target: Option<&Expr>, function: &str, args: &[Expr]) -> Type {
        if is_unexpanded_macro(function, target.is_some(), args.len()) {
            let ty = self.undeclared(function);
            if let Some(target) = target {
                self.check(target);
            }
            return ty;
        }
        if let Some(target) = target {
            self.check(target);
        }
        let arg_types: Vec<Type> = args.iter().map(|arg| self.check(arg)).collect();

        // No receiver-style functions are declared.
        if target.is_some() {
            return self.undeclared(function);
        }
        let Some(overloads) = self.env.function(function) else {
            return self.undeclared(function);
        };

        for overload in overloads {
            if overload.params.len() != arg_types.len() {
                continue;
            }
            let mut bindings = HashMap::new();
            let matched = overload
                .params
                .iter()
                .zip(&arg_types)
                .all(|(param, arg)| is_assignable(param, arg, &mut bindings));
            if matched {
                return overload.result.substitute(&bindings);
            }
        }

        if arg_types.iter().any(Type::is_error) {
            // Already reported further down the tree.
            return Type::Error;
        }
        let rendered = arg_types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        self.report(format!(
            "found no matching overload for '{function}' applied to '({rendered})'"
        ))
    }

    fn comprehension(&mut self, comp: &Comprehension) -> Type {
        let range = self.check(&comp.iter_range);
        let iter_ty = match range {
            Type::List(elem) => *elem,
            Type::Map(key, _) => *key,
            Type::Dyn | Type::Error => Type::Dyn,
            other => {
                self.report(format!(
                    "expression of type '{other}' cannot be range of a comprehension \
                     (must be list, map, or dynamic)"
                ));
                Type::Dyn
            }
        };
        let accu_ty = self.check(&comp.accu_init);

        self.scopes
            .push(HashMap::from([(comp.accu_var.clone(), accu_ty.clone())]));
        self.scopes
            .push(HashMap::from([(comp.iter_var.clone(), iter_ty)]));
        self.check(&comp.loop_condition);
        let step = self.check(&comp.loop_step);
        self.scopes.pop();

        let mut bindings = HashMap::new();
        if !is_assignable(&accu_ty, &step, &mut bindings) {
            self.report(format!(
                "expected type '{accu_ty}' but found '{step}'"
            ));
        }
        let result = self.check(&comp.result);
        self.scopes.pop();
        result
    }
}

fn constant_type(constant: &Constant) -> Type {
    match constant {
        Constant::Null => Type::Null,
        Constant::Bool(_) => Type::Bool,
        Constant::Int(_) => Type::Int,
        Constant::Uint(_) => Type::Uint,
        Constant::Double(_) => Type::Double,
        Constant::String(_) => Type::String,
        Constant::Bytes(_) => Type::Bytes,
    }
}
