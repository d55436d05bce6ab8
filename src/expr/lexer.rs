//! Lexer for guard and action source text.
//!
//! Newlines are significant (they separate statements) except inside
//! parentheses. `#` starts a comment running to the end of the line.

use super::ast::SourceLocation;
use super::error::EvalError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    True,
    False,
    None,

    // Keywords and their symbolic aliases
    And,
    Or,
    Not,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,

    // Comparison
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,

    // Assignment
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,

    // Punctuation
    LParen,
    RParen,
    Comma,
    Dot,
    Semicolon,
    Newline,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "integer {n}"),
            TokenKind::Float(x) => write!(f, "float {x:?}"),
            TokenKind::Str(s) => write!(f, "string '{s}'"),
            TokenKind::Ident(name) => write!(f, "name '{name}'"),
            TokenKind::True => write!(f, "'True'"),
            TokenKind::False => write!(f, "'False'"),
            TokenKind::None => write!(f, "'None'"),
            TokenKind::And => write!(f, "'and'"),
            TokenKind::Or => write!(f, "'or'"),
            TokenKind::Not => write!(f, "'not'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::SlashSlash => write!(f, "'//'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::PlusEq => write!(f, "'+='"),
            TokenKind::MinusEq => write!(f, "'-='"),
            TokenKind::StarEq => write!(f, "'*='"),
            TokenKind::SlashEq => write!(f, "'/='"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    depth: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            depth: 0,
        }
    }

    /// Tokenize the entire input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_blanks();
            let location = self.location();
            let Some(ch) = self.advance() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    location,
                });
                return Ok(tokens);
            };
            let kind = match ch {
                '\n' => {
                    // Collapse blank lines.
                    if matches!(
                        tokens.last(),
                        None | Some(Token {
                            kind: TokenKind::Newline,
                            ..
                        })
                    ) {
                        continue;
                    }
                    TokenKind::Newline
                }
                '"' | '\'' => self.string(ch, location)?,
                '0'..='9' => self.number(ch, location)?,
                'a'..='z' | 'A'..='Z' | '_' => self.word(ch),
                '+' => self.with_eq(TokenKind::PlusEq, TokenKind::Plus),
                '-' => self.with_eq(TokenKind::MinusEq, TokenKind::Minus),
                '*' => self.with_eq(TokenKind::StarEq, TokenKind::Star),
                '/' => {
                    if self.eat('/') {
                        TokenKind::SlashSlash
                    } else {
                        self.with_eq(TokenKind::SlashEq, TokenKind::Slash)
                    }
                }
                '%' => TokenKind::Percent,
                '=' => self.with_eq(TokenKind::EqEq, TokenKind::Eq),
                '!' => self.with_eq(TokenKind::NotEq, TokenKind::Not),
                '<' => self.with_eq(TokenKind::Le, TokenKind::Lt),
                '>' => self.with_eq(TokenKind::Ge, TokenKind::Gt),
                '&' if self.eat('&') => TokenKind::And,
                '|' if self.eat('|') => TokenKind::Or,
                '(' => {
                    self.depth += 1;
                    TokenKind::LParen
                }
                ')' => {
                    self.depth = self.depth.saturating_sub(1);
                    TokenKind::RParen
                }
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,
                ';' => TokenKind::Semicolon,
                other => {
                    return Err(EvalError::syntax(
                        format!("unexpected character '{other}'"),
                        location.line,
                        location.column,
                    ))
                }
            };
            tokens.push(Token { kind, location });
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn with_eq(&mut self, compound: TokenKind, single: TokenKind) -> TokenKind {
        if self.eat('=') {
            compound
        } else {
            single
        }
    }

    /// Skip spaces, comments, and newlines nested in parentheses.
    fn skip_blanks(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\n' if self.depth > 0 => {
                    self.advance();
                }
                '#' => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn string(&mut self, quote: char, start: SourceLocation) -> Result<TokenKind, EvalError> {
        let mut text = String::new();
        loop {
            match self.advance() {
                None | Some('\n') => {
                    return Err(EvalError::syntax(
                        "unterminated string literal",
                        start.line,
                        start.column,
                    ))
                }
                Some(c) if c == quote => return Ok(TokenKind::Str(text)),
                Some('\\') => {
                    let location = self.location();
                    let escaped = match self.advance() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('\\') => '\\',
                        Some('\'') => '\'',
                        Some('"') => '"',
                        other => {
                            return Err(EvalError::syntax(
                                format!(
                                    "unknown escape sequence '\\{}'",
                                    other.unwrap_or(' ')
                                ),
                                location.line,
                                location.column,
                            ))
                        }
                    };
                    text.push(escaped);
                }
                Some(c) => text.push(c),
            }
        }
    }

    fn number(&mut self, first: char, start: SourceLocation) -> Result<TokenKind, EvalError> {
        let mut text = String::from(first);
        let mut is_float = false;
        self.digits(&mut text);
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.advance();
            self.digits(&mut text);
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            text.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                text.push(sign);
                self.advance();
            }
            self.digits(&mut text);
        }

        let invalid = |what: &str| {
            EvalError::syntax(
                format!("invalid {what} literal '{text}'"),
                start.line,
                start.column,
            )
        };
        if is_float {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| invalid("float"))
        } else {
            text.parse::<i64>()
                .map(TokenKind::Int)
                .map_err(|_| invalid("integer"))
        }
    }

    fn digits(&mut self, text: &mut String) {
        while let Some(c) = self.peek().filter(|c| c.is_ascii_digit() || *c == '_') {
            if c != '_' {
                text.push(c);
            }
            self.advance();
        }
    }

    fn word(&mut self, first: char) -> TokenKind {
        let mut word = String::from(first);
        while let Some(c) = self.peek().filter(|c| c.is_ascii_alphanumeric() || *c == '_') {
            word.push(c);
            self.advance();
        }
        match word.as_str() {
            "True" | "true" => TokenKind::True,
            "False" | "false" => TokenKind::False,
            "None" => TokenKind::None,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            _ => TokenKind::Ident(word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_assignment_and_attribute() {
        assert_eq!(
            kinds("destination = event.floor"),
            vec![
                TokenKind::Ident("destination".into()),
                TokenKind::Eq,
                TokenKind::Ident("event".into()),
                TokenKind::Dot,
                TokenKind::Ident("floor".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_numbers() {
        assert_eq!(
            kinds("1 2.5 1e3 1_000"),
            vec![
                TokenKind::Int(1),
                TokenKind::Float(2.5),
                TokenKind::Float(1000.0),
                TokenKind::Int(1000),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn symbolic_aliases_map_to_keywords() {
        assert_eq!(
            kinds("!a && b || c"),
            vec![
                TokenKind::Not,
                TokenKind::Ident("a".into()),
                TokenKind::And,
                TokenKind::Ident("b".into()),
                TokenKind::Or,
                TokenKind::Ident("c".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn newlines_inside_parentheses_are_ignored() {
        assert_eq!(
            kinds("f(1,\n2)\n\n# done\nx"),
            vec![
                TokenKind::Ident("f".into()),
                TokenKind::LParen,
                TokenKind::Int(1),
                TokenKind::Comma,
                TokenKind::Int(2),
                TokenKind::RParen,
                TokenKind::Newline,
                TokenKind::Ident("x".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn strings_support_both_quotes_and_escapes() {
        assert_eq!(
            kinds(r#"'a\'b' "c\n""#),
            vec![
                TokenKind::Str("a'b".into()),
                TokenKind::Str("c\n".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn reports_location_of_bad_character() {
        let err = Lexer::new("x = 1\ny = @").tokenize().unwrap_err();
        assert_eq!(
            err,
            EvalError::Syntax {
                message: "unexpected character '@'".into(),
                line: 2,
                column: 5,
            }
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(matches!(
            Lexer::new("'open").tokenize(),
            Err(EvalError::Syntax { .. })
        ));
    }
}
