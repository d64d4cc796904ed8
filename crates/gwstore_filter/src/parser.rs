//! Recursive-descent parser with macro expansion.
//!
//! Calls are matched against the standard macro table by name, receiver style
//! and argument count. Only `all` and `exists` are expanded. The other macros
//! (`has`, `exists_one`, `map`, `filter`) parse as ordinary calls, which the
//! checker reports as undeclared references to the macro name.

use crate::ast::{operators, Comprehension, Constant, Expr, ExprId, ExprKind, ACCUMULATOR_VAR};
use crate::lexer::{LexError, Lexer, Spanned, Token};

/// Maximum nesting depth of sub-expressions.
pub const MAX_RECURSION_DEPTH: usize = 100;

/// A syntax error with its 1-based column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// Column at which the error was detected.
    pub column: usize,
    /// Description of the error.
    pub message: String,
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Syntax error at column {}: {}", self.column, self.message)
    }
}

impl From<LexError> for SyntaxError {
    fn from(err: LexError) -> Self {
        Self {
            column: err.column,
            message: err.message,
        }
    }
}

/// Parses `input` into an expression tree.
///
/// # Errors
///
/// Returns the first syntax error encountered.
pub fn parse(input: &str) -> Result<Expr, SyntaxError> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        next_id: 1,
        depth: 0,
    };
    let expr = parser.expr()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        other => Err(parser.error(format!("extraneous input {other}"))),
    }
}

/// Comprehension macros the parser expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Macro {
    All,
    Exists,
}

/// One entry of the standard macro table.
#[derive(Debug, Clone, Copy)]
struct MacroDef {
    name: &'static str,
    receiver: bool,
    arg_count: usize,
    expansion: Option<Macro>,
}

const fn macro_def(
    name: &'static str,
    receiver: bool,
    arg_count: usize,
    expansion: Option<Macro>,
) -> MacroDef {
    MacroDef {
        name,
        receiver,
        arg_count,
        expansion,
    }
}

/// The standard macros of the expression language. Entries without an
/// expansion parse as plain calls.
const MACROS: &[MacroDef] = &[
    macro_def("has", false, 1, None),
    macro_def("all", true, 2, Some(Macro::All)),
    macro_def("exists", true, 2, Some(Macro::Exists)),
    macro_def("exists_one", true, 2, None),
    macro_def("map", true, 2, None),
    macro_def("map", true, 3, None),
    macro_def("filter", true, 2, None),
];

fn lookup_macro(name: &str, receiver: bool, arg_count: usize) -> Option<&'static MacroDef> {
    MACROS
        .iter()
        .find(|m| m.name == name && m.receiver == receiver && m.arg_count == arg_count)
}

/// Returns true if a call with this shape is a standard macro left
/// unexpanded, such as `has(a.b)` or `list.map(x, y)`.
pub(crate) fn is_unexpanded_macro(name: &str, receiver: bool, arg_count: usize) -> bool {
    lookup_macro(name, receiver, arg_count).is_some_and(|m| m.expansion.is_none())
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    next_id: ExprId,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The token stream always ends with Eof and `advance` never moves past it.
        &self.tokens[self.pos].token
    }

    fn column(&self) -> usize {
        self.tokens[self.pos].column
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), SyntaxError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!(
                "mismatched input {} expecting {}",
                self.peek(),
                expected
            )))
        }
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            column: self.column(),
            message: message.into(),
        }
    }

    fn node(&mut self, kind: ExprKind) -> Expr {
        let id = self.next_id;
        self.next_id += 1;
        Expr { id, kind }
    }

    fn call(&mut self, function: &str, args: Vec<Expr>) -> Expr {
        self.node(ExprKind::Call {
            target: None,
            function: function.to_string(),
            args,
        })
    }

    /// expr := or ('?' or ':' expr)?
    fn expr(&mut self) -> Result<Expr, SyntaxError> {
        self.depth += 1;
        if self.depth > MAX_RECURSION_DEPTH {
            return Err(self.error(format!(
                "expression recursion limit exceeded: {MAX_RECURSION_DEPTH}"
            )));
        }
        let result = self.conditional();
        self.depth -= 1;
        result
    }

    fn conditional(&mut self) -> Result<Expr, SyntaxError> {
        let condition = self.or()?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let then = self.or()?;
        self.expect(&Token::Colon)?;
        let otherwise = self.expr()?;
        Ok(self.call(operators::CONDITIONAL, vec![condition, then, otherwise]))
    }

    fn or(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.and()?;
        while self.eat(&Token::OrOr) {
            let rhs = self.and()?;
            lhs = self.call(operators::LOGICAL_OR, vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.relation()?;
        while self.eat(&Token::AndAnd) {
            let rhs = self.relation()?;
            lhs = self.call(operators::LOGICAL_AND, vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn relation(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.addition()?;
        loop {
            let function = match self.peek() {
                Token::Less => operators::LESS,
                Token::LessEq => operators::LESS_EQUALS,
                Token::Greater => operators::GREATER,
                Token::GreaterEq => operators::GREATER_EQUALS,
                Token::EqEq => operators::EQUALS,
                Token::NotEq => operators::NOT_EQUALS,
                Token::In => operators::IN,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.addition()?;
            lhs = self.call(function, vec![lhs, rhs]);
        }
    }

    fn addition(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.multiplication()?;
        loop {
            let function = match self.peek() {
                Token::Plus => operators::ADD,
                Token::Minus => operators::SUBTRACT,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.multiplication()?;
            lhs = self.call(function, vec![lhs, rhs]);
        }
    }

    fn multiplication(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.unary()?;
        loop {
            let function = match self.peek() {
                Token::Star => operators::MULTIPLY,
                Token::Slash => operators::DIVIDE,
                Token::Percent => operators::MODULO,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = self.call(function, vec![lhs, rhs]);
        }
    }

    /// Prefix operators are collected iteratively so long `!!!!x` chains
    /// don't grow the stack.
    fn unary(&mut self) -> Result<Expr, SyntaxError> {
        let mut prefixes = Vec::new();
        loop {
            match self.peek() {
                Token::Bang => prefixes.push(operators::LOGICAL_NOT),
                Token::Minus => prefixes.push(operators::NEGATE),
                _ => break,
            }
            self.advance();
        }

        // A single minus directly before a numeric literal folds into it.
        let fold_negation = prefixes.last() == Some(&operators::NEGATE);
        let folded = match self.peek() {
            Token::Int(value) if fold_negation => Some(Constant::Int(-value)),
            Token::IntMinMagnitude if fold_negation => Some(Constant::Int(i64::MIN)),
            Token::Double(value) if fold_negation => Some(Constant::Double(-value)),
            _ => None,
        };
        let mut operand = match folded {
            Some(constant) => {
                prefixes.pop();
                self.advance();
                let literal = self.node(ExprKind::Const(constant));
                self.member_suffix(literal)?
            }
            None => self.member()?,
        };

        while let Some(function) = prefixes.pop() {
            operand = self.call(function, vec![operand]);
        }
        Ok(operand)
    }

    fn member(&mut self) -> Result<Expr, SyntaxError> {
        let primary = self.primary()?;
        self.member_suffix(primary)
    }

    fn member_suffix(&mut self, mut operand: Expr) -> Result<Expr, SyntaxError> {
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let field = match self.advance() {
                        Token::Ident(name) => name,
                        other => {
                            return Err(self.error(format!(
                                "mismatched input {other} expecting IDENTIFIER"
                            )))
                        }
                    };
                    if self.eat(&Token::LParen) {
                        let args = self.args(&Token::RParen)?;
                        operand = self.receiver_call(operand, field, args)?;
                    } else if self.peek() == &Token::LBrace {
                        if let Some(qualified) = qualified_name(&operand) {
                            let type_name = format!("{qualified}.{field}");
                            operand = self.struct_literal(type_name)?;
                        } else {
                            operand = self.select(operand, field);
                        }
                    } else {
                        operand = self.select(operand, field);
                    }
                }
                Token::LBracket => {
                    self.advance();
                    let index = self.expr()?;
                    self.expect(&Token::RBracket)?;
                    operand = self.call(operators::INDEX, vec![operand, index]);
                }
                _ => return Ok(operand),
            }
        }
    }

    fn select(&mut self, operand: Expr, field: String) -> Expr {
        self.node(ExprKind::Select {
            operand: Box::new(operand),
            field,
        })
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        let column = self.column();
        let token = self.advance();
        let kind = match token {
            Token::Int(v) => ExprKind::Const(Constant::Int(v)),
            Token::Uint(v) => ExprKind::Const(Constant::Uint(v)),
            Token::Double(v) => ExprKind::Const(Constant::Double(v)),
            Token::String(v) => ExprKind::Const(Constant::String(v)),
            Token::Bytes(v) => ExprKind::Const(Constant::Bytes(v)),
            Token::True => ExprKind::Const(Constant::Bool(true)),
            Token::False => ExprKind::Const(Constant::Bool(false)),
            Token::Null => ExprKind::Const(Constant::Null),
            Token::IntMinMagnitude => {
                return Err(SyntaxError {
                    column,
                    message: "int literal out of range".into(),
                })
            }
            Token::Dot => {
                // Leading-dot names resolve in the root scope.
                match self.advance() {
                    Token::Ident(name) => return self.ident_or_call(format!(".{name}")),
                    other => {
                        return Err(SyntaxError {
                            column,
                            message: format!("mismatched input {other} expecting IDENTIFIER"),
                        })
                    }
                }
            }
            Token::Ident(name) => return self.ident_or_call(name),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                return Ok(inner);
            }
            Token::LBracket => ExprKind::List(self.args(&Token::RBracket)?),
            Token::LBrace => ExprKind::Map(self.map_entries()?),
            other => {
                return Err(SyntaxError {
                    column,
                    message: format!("mismatched input {other} expecting expression"),
                })
            }
        };
        Ok(self.node(kind))
    }

    fn ident_or_call(&mut self, name: String) -> Result<Expr, SyntaxError> {
        if self.eat(&Token::LParen) {
            let args = self.args(&Token::RParen)?;
            return Ok(self.node(ExprKind::Call {
                target: None,
                function: name,
                args,
            }));
        }
        if self.peek() == &Token::LBrace {
            return self.struct_literal(name);
        }
        Ok(self.node(ExprKind::Ident(name)))
    }

    /// Parses a comma-separated expression list up to `close`, allowing a
    /// trailing comma. The opening delimiter is already consumed.
    fn args(&mut self, close: &Token) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expr()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(&Token::Comma)?;
            if self.eat(close) {
                return Ok(items);
            }
        }
    }

    fn map_entries(&mut self) -> Result<Vec<(Expr, Expr)>, SyntaxError> {
        let mut entries = Vec::new();
        if self.eat(&Token::RBrace) {
            return Ok(entries);
        }
        loop {
            let key = self.expr()?;
            self.expect(&Token::Colon)?;
            let value = self.expr()?;
            entries.push((key, value));
            if self.eat(&Token::RBrace) {
                return Ok(entries);
            }
            self.expect(&Token::Comma)?;
            if self.eat(&Token::RBrace) {
                return Ok(entries);
            }
        }
    }

    fn struct_literal(&mut self, type_name: String) -> Result<Expr, SyntaxError> {
        self.expect(&Token::LBrace)?;
        let mut fields = Vec::new();
        if !self.eat(&Token::RBrace) {
            loop {
                let field = match self.advance() {
                    Token::Ident(name) => name,
                    other => {
                        return Err(
                            self.error(format!("mismatched input {other} expecting IDENTIFIER"))
                        )
                    }
                };
                self.expect(&Token::Colon)?;
                fields.push((field, self.expr()?));
                if self.eat(&Token::RBrace) {
                    break;
                }
                self.expect(&Token::Comma)?;
                if self.eat(&Token::RBrace) {
                    break;
                }
            }
        }
        Ok(self.node(ExprKind::Struct { type_name, fields }))
    }

    fn receiver_call(
        &mut self,
        target: Expr,
        function: String,
        args: Vec<Expr>,
    ) -> Result<Expr, SyntaxError> {
        let expansion = lookup_macro(&function, true, args.len()).and_then(|m| m.expansion);
        let Some(mac) = expansion else {
            return Ok(self.method_call(target, function, args));
        };
        let [var, predicate] = match <[Expr; 2]>::try_from(args) {
            Ok(pair) => pair,
            Err(args) => return Ok(self.method_call(target, function, args)),
        };
        let ExprKind::Ident(iter_var) = var.kind else {
            return Err(self.error("argument must be a simple name"));
        };
        Ok(self.expand_comprehension(mac, target, iter_var, predicate))
    }

    fn method_call(&mut self, target: Expr, function: String, args: Vec<Expr>) -> Expr {
        self.node(ExprKind::Call {
            target: Some(Box::new(target)),
            function,
            args,
        })
    }

    /// Expands `range.all(x, p)` / `range.exists(x, p)`.
    ///
    /// `all`:    init `true`,  condition `@not_strictly_false(acc)`,
    ///           step `acc && p`
    /// `exists`: init `false`, condition `@not_strictly_false(!acc)`,
    ///           step `acc || p`
    fn expand_comprehension(
        &mut self,
        mac: Macro,
        iter_range: Expr,
        iter_var: String,
        predicate: Expr,
    ) -> Expr {
        let accu = |parser: &mut Self| parser.node(ExprKind::Ident(ACCUMULATOR_VAR.to_string()));

        let (init, step_op) = match mac {
            Macro::All => (true, operators::LOGICAL_AND),
            Macro::Exists => (false, operators::LOGICAL_OR),
        };

        let accu_init = self.node(ExprKind::Const(Constant::Bool(init)));
        let guard_arg = match mac {
            Macro::All => accu(self),
            Macro::Exists => {
                let acc = accu(self);
                self.call(operators::LOGICAL_NOT, vec![acc])
            }
        };
        let loop_condition = self.call(operators::NOT_STRICTLY_FALSE, vec![guard_arg]);
        let step_acc = accu(self);
        let loop_step = self.call(step_op, vec![step_acc, predicate]);
        let result = accu(self);

        self.node(ExprKind::Comprehension(Box::new(Comprehension {
            iter_var,
            iter_range,
            accu_var: ACCUMULATOR_VAR.to_string(),
            accu_init,
            loop_condition,
            loop_step,
            result,
        })))
    }
}

/// Returns the dotted name for an identifier or a chain of selections on one.
fn qualified_name(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Ident(name) => Some(name.clone()),
        ExprKind::Select { operand, field } => {
            qualified_name(operand).map(|prefix| format!("{prefix}.{field}"))
        }
        _ => None,
    }
}
