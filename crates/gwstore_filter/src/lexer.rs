//! Tokenizer for filter expressions.

use std::fmt;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Int(i64),
    /// Magnitude of an integer literal that only fits once negated.
    IntMinMagnitude,
    Uint(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    True,
    False,
    Null,
    In,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Dot,
    Comma,
    Colon,
    Question,
    Bang,
    Minus,
    Plus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    AndAnd,
    OrOr,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Ident(name) => return write!(f, "'{name}'"),
            Self::Int(i) => return write!(f, "'{i}'"),
            Self::IntMinMagnitude => "'9223372036854775808'",
            Self::Uint(u) => return write!(f, "'{u}u'"),
            Self::Double(d) => return write!(f, "'{d}'"),
            Self::String(s) => return write!(f, "{s:?}"),
            Self::Bytes(_) => "bytes literal",
            Self::True => "'true'",
            Self::False => "'false'",
            Self::Null => "'null'",
            Self::In => "'in'",
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::Dot => "'.'",
            Self::Comma => "','",
            Self::Colon => "':'",
            Self::Question => "'?'",
            Self::Bang => "'!'",
            Self::Minus => "'-'",
            Self::Plus => "'+'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::Percent => "'%'",
            Self::EqEq => "'=='",
            Self::NotEq => "'!='",
            Self::Less => "'<'",
            Self::LessEq => "'<='",
            Self::Greater => "'>'",
            Self::GreaterEq => "'>='",
            Self::AndAnd => "'&&'",
            Self::OrOr => "'||'",
            Self::Eof => "end of input",
        };
        f.write_str(text)
    }
}

/// A token with its 1-based column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub column: usize,
}

/// A tokenization failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexError {
    pub column: usize,
    pub message: String,
}

/// Words that may not be used as identifiers.
const RESERVED: &[&str] = &[
    "as",
    "break",
    "const",
    "continue",
    "else",
    "for",
    "function",
    "if",
    "import",
    "let",
    "loop",
    "package",
    "namespace",
    "return",
    "var",
    "void",
    "while",
];

pub(crate) struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub(crate) fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    /// Tokenizes the whole input, ending with [`Token::Eof`].
    pub(crate) fn tokenize(mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_comments();
            let column = self.pos + 1;
            let Some(c) = self.peek() else {
                tokens.push(Spanned {
                    token: Token::Eof,
                    column,
                });
                return Ok(tokens);
            };
            let token = self.next_token(c, column)?;
            tokens.push(Spanned { token, column });
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn error(&self, column: usize, message: impl Into<String>) -> LexError {
        LexError {
            column,
            message: message.into(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '/' && self.peek_at(1) == Some('/') {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self, c: char, column: usize) -> Result<Token, LexError> {
        if c.is_ascii_digit() {
            return self.number(column);
        }
        if c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) {
            return self.number(column);
        }
        if c == '"' || c == '\'' {
            self.pos += 1;
            return self.string(c, false, column).map(Token::String);
        }
        if (c == 'r' || c == 'R') && matches!(self.peek_at(1), Some('"' | '\'')) {
            let quote = self.peek_at(1).unwrap_or('"');
            self.pos += 2;
            return self.string(quote, true, column).map(Token::String);
        }
        if (c == 'b' || c == 'B') && matches!(self.peek_at(1), Some('"' | '\'')) {
            let quote = self.peek_at(1).unwrap_or('"');
            self.pos += 2;
            return self
                .string(quote, false, column)
                .map(|s| Token::Bytes(s.into_bytes()));
        }
        if c.is_alphabetic() || c == '_' {
            return self.word(column);
        }

        self.pos += 1;
        let two = |lexer: &mut Self, next: char, matched: Token, single: Option<Token>| {
            if lexer.peek() == Some(next) {
                lexer.pos += 1;
                Some(matched)
            } else {
                single
            }
        };
        let token = match c {
            '(' => Some(Token::LParen),
            ')' => Some(Token::RParen),
            '[' => Some(Token::LBracket),
            ']' => Some(Token::RBracket),
            '{' => Some(Token::LBrace),
            '}' => Some(Token::RBrace),
            '.' => Some(Token::Dot),
            ',' => Some(Token::Comma),
            ':' => Some(Token::Colon),
            '?' => Some(Token::Question),
            '-' => Some(Token::Minus),
            '+' => Some(Token::Plus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '!' => two(self, '=', Token::NotEq, Some(Token::Bang)),
            '=' => two(self, '=', Token::EqEq, None),
            '<' => two(self, '=', Token::LessEq, Some(Token::Less)),
            '>' => two(self, '=', Token::GreaterEq, Some(Token::Greater)),
            '&' => two(self, '&', Token::AndAnd, None),
            '|' => two(self, '|', Token::OrOr, None),
            _ => None,
        };
        token.ok_or_else(|| self.error(column, format!("token recognition error at: '{c}'")))
    }

    fn word(&mut self, column: usize) -> Result<Token, LexError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        let token = match word.as_str() {
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            "in" => Token::In,
            w if RESERVED.contains(&w) => {
                return Err(self.error(column, format!("reserved identifier: {w}")));
            }
            _ => Token::Ident(word),
        };
        Ok(token)
    }

    fn number(&mut self, column: usize) -> Result<Token, LexError> {
        let start = self.pos;

        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X')) {
            self.pos += 2;
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let digits: String = self.chars[digits_start..self.pos].iter().collect();
            if digits.is_empty() {
                return Err(self.error(column, "invalid hex literal"));
            }
            if matches!(self.peek(), Some('u' | 'U')) {
                self.pos += 1;
                return u64::from_str_radix(&digits, 16)
                    .map(Token::Uint)
                    .map_err(|_| self.error(column, "uint literal out of range"));
            }
            return i64::from_str_radix(&digits, 16)
                .map(Token::Int)
                .map_err(|_| self.error(column, "int literal out of range"));
        }

        let mut is_double = false;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_double = true;
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(1), Some('+' | '-')) {
                lookahead = 2;
            }
            if self.peek_at(lookahead).is_some_and(|c| c.is_ascii_digit()) {
                is_double = true;
                self.pos += lookahead;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let text: String = self.chars[start..self.pos].iter().collect();
        if is_double {
            return text
                .parse::<f64>()
                .map(Token::Double)
                .map_err(|_| self.error(column, "invalid double literal"));
        }
        if matches!(self.peek(), Some('u' | 'U')) {
            self.pos += 1;
            return text
                .parse::<u64>()
                .map(Token::Uint)
                .map_err(|_| self.error(column, "uint literal out of range"));
        }
        match text.parse::<i64>() {
            Ok(value) => Ok(Token::Int(value)),
            Err(_) if text == "9223372036854775808" => Ok(Token::IntMinMagnitude),
            Err(_) => Err(self.error(column, "int literal out of range")),
        }
    }

    /// Reads a quoted literal; the opening quote is already consumed.
    fn string(&mut self, quote: char, raw: bool, column: usize) -> Result<String, LexError> {
        let mut out = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error(column, "unterminated string literal"));
            };
            self.pos += 1;
            if c == quote {
                return Ok(out);
            }
            if c == '\n' {
                return Err(self.error(column, "unterminated string literal"));
            }
            if c != '\\' || raw {
                out.push(c);
                continue;
            }
            let Some(escaped) = self.peek() else {
                return Err(self.error(column, "unterminated string literal"));
            };
            self.pos += 1;
            match escaped {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                '\\' | '"' | '\'' | '`' | '?' => out.push(escaped),
                'u' => {
                    let digits: String = (0..4).filter_map(|i| self.peek_at(i)).collect();
                    let code = u32::from_str_radix(&digits, 16)
                        .ok()
                        .filter(|_| digits.len() == 4)
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.error(column, "invalid unicode escape"))?;
                    self.pos += 4;
                    out.push(code);
                }
                other => {
                    return Err(self.error(column, format!("invalid escape sequence: \\{other}")));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn membership_expression() {
        assert_eq!(
            tokens(r#""tag1" in tags"#),
            vec![
                Token::String("tag1".into()),
                Token::In,
                Token::Ident("tags".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            tokens("a && b || !c == d != e <= f >= g"),
            vec![
                Token::Ident("a".into()),
                Token::AndAnd,
                Token::Ident("b".into()),
                Token::OrOr,
                Token::Bang,
                Token::Ident("c".into()),
                Token::EqEq,
                Token::Ident("d".into()),
                Token::NotEq,
                Token::Ident("e".into()),
                Token::LessEq,
                Token::Ident("f".into()),
                Token::GreaterEq,
                Token::Ident("g".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(
            tokens("1 2u 3.5 0x10 1e3"),
            vec![
                Token::Int(1),
                Token::Uint(2),
                Token::Double(3.5),
                Token::Int(16),
                Token::Double(1000.0),
                Token::Eof
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            tokens(r#"'it\'s' "a\tb" r"\n""#),
            vec![
                Token::String("it's".into()),
                Token::String("a\tb".into()),
                Token::String("\\n".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn columns_are_one_based() {
        let spanned = Lexer::new("  tags").tokenize().unwrap();
        assert_eq!(spanned[0].column, 3);
    }

    #[test]
    fn unterminated_string() {
        let err = Lexer::new("\"abc").tokenize().unwrap_err();
        assert_eq!(err.message, "unterminated string literal");
    }

    #[test]
    fn single_ampersand_rejected() {
        let err = Lexer::new("a & b").tokenize().unwrap_err();
        assert_eq!(err.column, 3);
    }

    #[test]
    fn reserved_word_rejected() {
        let err = Lexer::new("if").tokenize().unwrap_err();
        assert!(err.message.contains("reserved identifier"));
    }

    #[test]
    fn line_comment_skipped() {
        assert_eq!(
            tokens("tags // trailing"),
            vec![Token::Ident("tags".into()), Token::Eof]
        );
    }
}
