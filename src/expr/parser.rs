//! Recursive descent parser for guards and actions.
//!
//! Precedence, loosest first: `or`, `and`, `not`, comparisons (chained),
//! `+ -`, `* / // %`, unary `-`, then attribute access and calls.

use super::ast::{BinaryOp, CompareOp, Expr, Program, SourceLocation, Stmt, UnaryOp};
use super::error::EvalError;
use super::lexer::{Lexer, Token, TokenKind};
use crate::core::Value;

/// Parse an action body: statements separated by newlines or `;`.
pub fn parse_program(source: &str) -> Result<Program, EvalError> {
    Parser::new(source)?.program()
}

/// Parse a guard: exactly one expression, no assignment.
pub fn parse_guard(source: &str) -> Result<Expr, EvalError> {
    let program = parse_program(source)?;
    let mut statements = program.statements.into_iter();
    match (statements.next(), statements.next()) {
        (Some(Stmt::Expr(expr)), None) => Ok(expr),
        (Some(Stmt::Assign { name, .. }), _) => Err(EvalError::CapabilityDenied(format!(
            "guards cannot assign to '{name}'"
        ))),
        (None, _) => Err(EvalError::syntax("empty guard", 1, 1)),
        (Some(_), Some(_)) => Err(EvalError::syntax(
            "a guard must be a single expression",
            1,
            1,
        )),
    }
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, EvalError> {
        Ok(Self {
            tokens: Lexer::new(source).tokenize()?,
            position: 0,
        })
    }

    // ===== Helper methods =====

    fn peek(&self) -> &TokenKind {
        &self.current().kind
    }

    fn current(&self) -> &Token {
        // The token stream always ends with Eof, and `advance` never moves
        // past it.
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> &TokenKind {
        let index = (self.position + 1).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.position += 1;
        }
        token
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, EvalError> {
        if self.peek() == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("expected {kind}")))
        }
    }

    fn unexpected(&self, context: &str) -> EvalError {
        let token = self.current();
        EvalError::syntax(
            format!("{context}, found {}", token.kind),
            token.location.line,
            token.location.column,
        )
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    // ===== Statements =====

    fn program(&mut self) -> Result<Program, EvalError> {
        let mut program = Program::default();
        self.skip_separators();
        while *self.peek() != TokenKind::Eof {
            program.statements.push(self.statement()?);
            match self.peek() {
                TokenKind::Newline | TokenKind::Semicolon => self.skip_separators(),
                TokenKind::Eof => {}
                _ => return Err(self.unexpected("expected end of statement")),
            }
        }
        Ok(program)
    }

    fn statement(&mut self) -> Result<Stmt, EvalError> {
        if let TokenKind::Ident(name) = self.peek().clone() {
            let op = match self.peek_next() {
                TokenKind::Eq => Some(None),
                TokenKind::PlusEq => Some(Some(BinaryOp::Add)),
                TokenKind::MinusEq => Some(Some(BinaryOp::Sub)),
                TokenKind::StarEq => Some(Some(BinaryOp::Mul)),
                TokenKind::SlashEq => Some(Some(BinaryOp::Div)),
                _ => None,
            };
            if let Some(op) = op {
                if name == "event" {
                    return Err(EvalError::CapabilityDenied(
                        "'event' is read-only".to_string(),
                    ));
                }
                self.advance();
                self.advance();
                let value = self.expression()?;
                return Ok(Stmt::Assign { name, op, value });
            }
        }
        Ok(Stmt::Expr(self.expression()?))
    }

    // ===== Expressions =====

    fn expression(&mut self) -> Result<Expr, EvalError> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.and()?;
        while self.match_token(&TokenKind::Or) {
            let right = self.and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.not()?;
        while self.match_token(&TokenKind::And) {
            let right = self.not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, EvalError> {
        if self.match_token(&TokenKind::Not) {
            let operand = self.not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, EvalError> {
        let first = self.sum()?;
        let mut rest = Vec::new();
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => CompareOp::Eq,
                TokenKind::NotEq => CompareOp::Ne,
                TokenKind::Lt => CompareOp::Lt,
                TokenKind::Le => CompareOp::Le,
                TokenKind::Gt => CompareOp::Gt,
                TokenKind::Ge => CompareOp::Ge,
                _ => break,
            };
            self.advance();
            rest.push((op, self.sum()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare {
                first: Box::new(first),
                rest,
            })
        }
    }

    fn sum(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::SlashSlash => BinaryOp::FloorDiv,
                TokenKind::Percent => BinaryOp::Mod,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        if self.match_token(&TokenKind::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        if self.match_token(&TokenKind::Plus) {
            return self.unary();
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                TokenKind::Dot => {
                    self.advance();
                    let token = self.advance();
                    let name = match token.kind {
                        TokenKind::Ident(name) => name,
                        other => {
                            return Err(EvalError::syntax(
                                format!("expected attribute name, found {other}"),
                                token.location.line,
                                token.location.column,
                            ))
                        }
                    };
                    expr = Expr::Attribute {
                        object: Box::new(expr),
                        name,
                    };
                }
                TokenKind::LParen => {
                    let location = self.current().location;
                    let Expr::Variable(function) = expr else {
                        return Err(EvalError::syntax(
                            "only named functions can be called",
                            location.line,
                            location.column,
                        ));
                    };
                    self.advance();
                    expr = self.call(function, location)?;
                }
                _ => return Ok(expr),
            }
        }
    }

    fn call(&mut self, function: String, location: SourceLocation) -> Result<Expr, EvalError> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        while *self.peek() != TokenKind::RParen {
            if let (TokenKind::Ident(keyword), TokenKind::Eq) =
                (self.peek().clone(), self.peek_next())
            {
                self.advance();
                self.advance();
                keywords.push((keyword, self.expression()?));
            } else if keywords.is_empty() {
                args.push(self.expression()?);
            } else {
                return Err(self.unexpected("positional argument follows keyword argument"));
            }
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(Expr::Call {
            function,
            args,
            keywords,
            location,
        })
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let token = self.advance();
        let expr = match token.kind {
            TokenKind::Int(n) => Expr::Literal(Value::Int(n)),
            TokenKind::Float(x) => Expr::Literal(Value::Float(x)),
            TokenKind::Str(s) => Expr::Literal(Value::Str(s)),
            TokenKind::True => Expr::Literal(Value::Bool(true)),
            TokenKind::False => Expr::Literal(Value::Bool(false)),
            TokenKind::None => Expr::Literal(Value::None),
            TokenKind::Ident(name) => Expr::Variable(name),
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen)?;
                inner
            }
            other => {
                return Err(EvalError::syntax(
                    format!("expected an expression, found {other}"),
                    token.location.line,
                    token.location.column,
                ))
            }
        };
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Box<Expr> {
        Box::new(Expr::Variable(name.into()))
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse_guard("a + b * 2").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinaryOp::Add,
                left: var("a"),
                right: Box::new(Expr::Binary {
                    op: BinaryOp::Mul,
                    left: var("b"),
                    right: Box::new(Expr::Literal(Value::Int(2))),
                }),
            }
        );
    }

    #[test]
    fn comparisons_chain() {
        let expr = parse_guard("0 <= x < 10").unwrap();
        let Expr::Compare { rest, .. } = expr else {
            panic!("expected a comparison chain");
        };
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].0, CompareOp::Le);
        assert_eq!(rest[1].0, CompareOp::Lt);
    }

    #[test]
    fn not_binds_looser_than_comparison() {
        let expr = parse_guard("not x == 1").unwrap();
        assert!(matches!(
            expr,
            Expr::Unary {
                op: UnaryOp::Not,
                ..
            }
        ));
    }

    #[test]
    fn parses_statements_and_compound_assignment() {
        let program = parse_program("x = 1; y += x\nsend('go', floor=2)").unwrap();
        assert_eq!(program.statements.len(), 3);
        assert!(matches!(
            &program.statements[1],
            Stmt::Assign {
                op: Some(BinaryOp::Add),
                ..
            }
        ));
        let Stmt::Expr(Expr::Call { keywords, args, .. }) = &program.statements[2] else {
            panic!("expected a call statement");
        };
        assert_eq!(args.len(), 1);
        assert_eq!(keywords[0].0, "floor");
    }

    #[test]
    fn event_attribute_parses() {
        let expr = parse_guard("event.floor > 2").unwrap();
        let Expr::Compare { first, .. } = expr else {
            panic!("expected a comparison");
        };
        assert_eq!(
            *first,
            Expr::Attribute {
                object: var("event"),
                name: "floor".into()
            }
        );
    }

    #[test]
    fn guards_cannot_assign() {
        assert!(matches!(
            parse_guard("x = 1"),
            Err(EvalError::CapabilityDenied(_))
        ));
        assert!(matches!(
            parse_guard("x; y"),
            Err(EvalError::Syntax { .. })
        ));
    }

    #[test]
    fn event_is_read_only() {
        assert!(matches!(
            parse_program("event = 'x'"),
            Err(EvalError::CapabilityDenied(_))
        ));
    }

    #[test]
    fn reports_syntax_errors_with_location() {
        let err = parse_program("x = (1 +\n 2").unwrap_err();
        assert!(matches!(err, EvalError::Syntax { line: 2, .. }));

        let err = parse_program("x = 1 2").unwrap_err();
        assert_eq!(
            err,
            EvalError::Syntax {
                message: "expected end of statement, found integer 2".into(),
                line: 1,
                column: 7,
            }
        );
    }

    #[test]
    fn calls_require_a_name() {
        assert!(parse_guard("event.name(1)").is_err());
        assert!(parse_guard("f(a=1, 2)").is_err());
    }
}
