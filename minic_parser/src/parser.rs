//! Recursive descent parser for the minic source language

use crate::ast::*;
use minic_common::{MinicError, MinicResult, SourceLocation};
use minic_lexer::{Lexer, Token, TokenKind};
use std::sync::Arc;

/// Parse a whole translation unit from source text.
pub fn parse_program(source: &str, file: impl Into<Arc<str>>) -> MinicResult<Program> {
    let file = file.into();
    let tokens = Lexer::new(source, Arc::clone(&file)).tokenize()?;
    Parser::new(tokens, file).parse_program()
}

/// Parse a single expression; used by unit tests and the expression
/// entry point of the drivers.
pub fn parse_expression(source: &str, file: impl Into<Arc<str>>) -> MinicResult<Expression> {
    let file = file.into();
    let tokens = Lexer::new(source, Arc::clone(&file)).tokenize()?;
    let mut parser = Parser::new(tokens, file);
    let expression = parser.parse_expression()?;
    parser.expect_eof()?;
    Ok(expression)
}

/// The parser state: a token buffer and a cursor
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: Arc<str>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, file: impl Into<Arc<str>>) -> Self {
        Self { tokens, pos: 0, file: file.into() }
    }

    fn peek(&self) -> &Token {
        // The token stream always ends in EndOfFile.
        self.tokens.get(self.pos).unwrap_or_else(|| self.tokens.last().expect("empty token stream"))
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error_here(&self, message: impl Into<String>) -> MinicError {
        let loc = &self.peek().loc;
        MinicError::parse(format!("{}: {}", loc, message.into()))
    }

    fn expect(&mut self, kind: TokenKind) -> MinicResult<Token> {
        if *self.peek_kind() == kind {
            Ok(self.bump())
        } else {
            Err(self.error_here(format!("expected '{}', found '{}'", kind, self.peek_kind())))
        }
    }

    fn expect_identifier(&mut self) -> MinicResult<Identifier> {
        match self.peek_kind() {
            TokenKind::Identifier(_) => {
                let token = self.bump();
                let TokenKind::Identifier(name) = token.kind else { unreachable!() };
                Ok(Identifier::new(name, token.loc))
            }
            other => Err(self.error_here(format!("expected identifier, found '{}'", other))),
        }
    }

    fn expect_eof(&mut self) -> MinicResult<()> {
        if *self.peek_kind() == TokenKind::EndOfFile {
            Ok(())
        } else {
            Err(self.error_here(format!("expected end of file, found '{}'", self.peek_kind())))
        }
    }

    // ---------------------------------------------------------- Program

    pub fn parse_program(&mut self) -> MinicResult<Program> {
        let start = self.peek().loc.clone();
        let mut functions = Vec::new();
        while *self.peek_kind() != TokenKind::EndOfFile {
            functions.push(self.parse_function_definition()?);
        }
        let loc = match functions.last() {
            Some(f) => start.merge(&f.loc),
            None => SourceLocation::new(1, 1, 1, 1, Arc::clone(&self.file)),
        };
        log::debug!("parsed {} function definition(s) from {}", functions.len(), self.file);
        Ok(Program { functions, loc })
    }

    fn parse_function_definition(&mut self) -> MinicResult<FunctionDefinition> {
        let start = self.peek().loc.clone();
        let return_type = self.parse_function_type()?;
        let ident = self.expect_identifier()?;
        self.expect(TokenKind::LeftParen)?;
        let mut parameters = Vec::new();
        if *self.peek_kind() != TokenKind::RightParen {
            parameters.push(self.parse_declaration()?);
            while *self.peek_kind() == TokenKind::Comma {
                self.bump();
                parameters.push(self.parse_declaration()?);
            }
        }
        self.expect(TokenKind::RightParen)?;
        let body = self.parse_compound_statement()?;
        let loc = start.merge(&body.loc);
        Ok(FunctionDefinition { return_type, ident, parameters, body, loc })
    }

    fn parse_function_type(&mut self) -> MinicResult<FunctionType> {
        let ty = match self.peek_kind() {
            TokenKind::KeywordInt => FunctionType::Int,
            TokenKind::KeywordFloat => FunctionType::Float,
            TokenKind::KeywordBool => FunctionType::Bool,
            TokenKind::KeywordString => FunctionType::String,
            TokenKind::KeywordVoid => FunctionType::Void,
            other => return Err(self.error_here(format!("expected return type, found '{}'", other))),
        };
        self.bump();
        Ok(ty)
    }

    fn parse_type(&mut self) -> MinicResult<Type> {
        let ty = match self.peek_kind() {
            TokenKind::KeywordInt => Type::Int,
            TokenKind::KeywordFloat => Type::Float,
            TokenKind::KeywordBool => Type::Bool,
            TokenKind::KeywordString => Type::String,
            other => return Err(self.error_here(format!("expected type, found '{}'", other))),
        };
        self.bump();
        Ok(ty)
    }

    // ------------------------------------------------------- Statements

    fn parse_declaration(&mut self) -> MinicResult<Declaration> {
        let start = self.peek().loc.clone();
        let ty = self.parse_type()?;
        if *self.peek_kind() == TokenKind::LeftBracket {
            self.bump();
            let size_token = self.bump();
            let TokenKind::IntLiteral(size) = size_token.kind else {
                return Err(MinicError::parse(format!(
                    "{}: array size must be an integer literal",
                    size_token.loc
                )));
            };
            if size <= 0 {
                return Err(MinicError::parse(format!(
                    "{}: array size must be strictly positive",
                    size_token.loc
                )));
            }
            self.expect(TokenKind::RightBracket)?;
            let ident = self.expect_identifier()?;
            let loc = start.merge(&ident.loc);
            Ok(Declaration::Array { ty, size, ident, loc })
        } else {
            let ident = self.expect_identifier()?;
            let loc = start.merge(&ident.loc);
            Ok(Declaration::Variable { ty, ident, loc })
        }
    }

    fn parse_compound_statement(&mut self) -> MinicResult<CompoundStatement> {
        let start = self.expect(TokenKind::LeftBrace)?.loc;
        let mut statements = Vec::new();
        while *self.peek_kind() != TokenKind::RightBrace {
            if *self.peek_kind() == TokenKind::EndOfFile {
                return Err(self.error_here("expected '}', found end of file"));
            }
            statements.push(self.parse_statement()?);
        }
        let end = self.bump().loc;
        Ok(CompoundStatement { statements, loc: start.merge(&end) })
    }

    fn parse_statement(&mut self) -> MinicResult<Statement> {
        match self.peek_kind() {
            TokenKind::KeywordIf => self.parse_if_statement(),
            TokenKind::KeywordWhile => self.parse_while_statement(),
            TokenKind::KeywordReturn => self.parse_return_statement(),
            TokenKind::LeftBrace => Ok(Statement::Compound(self.parse_compound_statement()?)),
            TokenKind::KeywordInt
            | TokenKind::KeywordFloat
            | TokenKind::KeywordBool
            | TokenKind::KeywordString => {
                let declaration = self.parse_declaration()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Statement::Declaration(declaration))
            }
            _ => self.parse_expression_or_assignment(),
        }
    }

    fn parse_if_statement(&mut self) -> MinicResult<Statement> {
        let start = self.bump().loc;
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        let on_true = Box::new(self.parse_statement()?);
        if *self.peek_kind() == TokenKind::KeywordElse {
            self.bump();
            let on_false = Box::new(self.parse_statement()?);
            let loc = start.merge(on_false.loc());
            Ok(Statement::IfElse { condition, on_true, on_false, loc })
        } else {
            let loc = start.merge(on_true.loc());
            Ok(Statement::If { condition, on_true, loc })
        }
    }

    fn parse_while_statement(&mut self) -> MinicResult<Statement> {
        let start = self.bump().loc;
        self.expect(TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;
        let body = Box::new(self.parse_statement()?);
        let loc = start.merge(body.loc());
        Ok(Statement::While { condition, body, loc })
    }

    fn parse_return_statement(&mut self) -> MinicResult<Statement> {
        let start = self.bump().loc;
        if *self.peek_kind() == TokenKind::Semicolon {
            let end = self.bump().loc;
            return Ok(Statement::Return { value: None, loc: start.merge(&end) });
        }
        let value = self.parse_expression()?;
        let end = self.expect(TokenKind::Semicolon)?.loc;
        Ok(Statement::Return { value: Some(value), loc: start.merge(&end) })
    }

    /// Parse an expression; if it turns out to be the target of a `=`, it
    /// must be a variable or array element and becomes an assignment.
    fn parse_expression_or_assignment(&mut self) -> MinicResult<Statement> {
        let expression = self.parse_expression()?;
        if *self.peek_kind() != TokenKind::Assign {
            self.expect(TokenKind::Semicolon)?;
            return Ok(Statement::Expression(expression));
        }
        self.bump();
        let value = self.parse_expression()?;
        let end = self.expect(TokenKind::Semicolon)?.loc;
        match expression {
            Expression::Variable { ident, loc } => Ok(Statement::Assignment(Assignment::Variable {
                ident,
                value,
                loc: loc.merge(&end),
            })),
            Expression::ArrayElement { ident, index, loc } => {
                Ok(Statement::Assignment(Assignment::Array {
                    ident,
                    index: *index,
                    value,
                    loc: loc.merge(&end),
                }))
            }
            other => Err(MinicError::parse(format!(
                "{}: left-hand side of assignment must be a variable or array element",
                other.loc()
            ))),
        }
    }

    // ------------------------------------------------------ Expressions

    pub fn parse_expression(&mut self) -> MinicResult<Expression> {
        self.parse_binary_expression(0)
    }

    fn binary_op_precedence(kind: &TokenKind) -> Option<(BinaryOp, u8)> {
        let entry = match kind {
            TokenKind::Or => (BinaryOp::Disj, 1),
            TokenKind::And => (BinaryOp::Conj, 2),
            TokenKind::Equal => (BinaryOp::Equal, 3),
            TokenKind::NotEqual => (BinaryOp::NotEqual, 3),
            TokenKind::Smaller => (BinaryOp::Smaller, 4),
            TokenKind::Greater => (BinaryOp::Greater, 4),
            TokenKind::SmallerEq => (BinaryOp::SmallerEq, 4),
            TokenKind::GreaterEq => (BinaryOp::GreaterEq, 4),
            TokenKind::Plus => (BinaryOp::Add, 5),
            TokenKind::Minus => (BinaryOp::Sub, 5),
            TokenKind::Asterisk => (BinaryOp::Mul, 6),
            TokenKind::Slash => (BinaryOp::Div, 6),
            _ => return None,
        };
        Some(entry)
    }

    fn parse_binary_expression(&mut self, min_precedence: u8) -> MinicResult<Expression> {
        let mut lhs = self.parse_unary_expression()?;
        while let Some((op, precedence)) = Self::binary_op_precedence(self.peek_kind()) {
            if precedence < min_precedence {
                break;
            }
            self.bump();
            // All binary operators are left-associative.
            let rhs = self.parse_binary_expression(precedence + 1)?;
            let loc = lhs.loc().merge(rhs.loc());
            lhs = Expression::BinaryOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs), loc };
        }
        Ok(lhs)
    }

    fn parse_unary_expression(&mut self) -> MinicResult<Expression> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Not => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            let start = self.bump().loc;
            let child = self.parse_unary_expression()?;
            let loc = start.merge(child.loc());
            return Ok(Expression::UnaryOp { op, child: Box::new(child), loc });
        }
        self.parse_primary_expression()
    }

    fn parse_primary_expression(&mut self) -> MinicResult<Expression> {
        match self.peek_kind().clone() {
            TokenKind::IntLiteral(value) => {
                let loc = self.bump().loc;
                Ok(Expression::Literal { literal: Literal::Int(value), loc })
            }
            TokenKind::FloatLiteral(value) => {
                let loc = self.bump().loc;
                Ok(Expression::Literal { literal: Literal::Float(value), loc })
            }
            TokenKind::KeywordTrue => {
                let loc = self.bump().loc;
                Ok(Expression::Literal { literal: Literal::Bool(true), loc })
            }
            TokenKind::KeywordFalse => {
                let loc = self.bump().loc;
                Ok(Expression::Literal { literal: Literal::Bool(false), loc })
            }
            TokenKind::StringLiteral(value) => {
                let loc = self.bump().loc;
                Ok(Expression::Literal { literal: Literal::Str(value), loc })
            }
            TokenKind::LeftParen => {
                let start = self.bump().loc;
                let inner = self.parse_expression()?;
                let end = self.expect(TokenKind::RightParen)?.loc;
                Ok(Expression::Parenthesized {
                    expression: Box::new(inner),
                    loc: start.merge(&end),
                })
            }
            TokenKind::Identifier(_) => {
                let ident = self.expect_identifier()?;
                match self.peek_kind() {
                    TokenKind::LeftParen => {
                        self.bump();
                        let mut arguments = Vec::new();
                        if *self.peek_kind() != TokenKind::RightParen {
                            arguments.push(self.parse_expression()?);
                            while *self.peek_kind() == TokenKind::Comma {
                                self.bump();
                                arguments.push(self.parse_expression()?);
                            }
                        }
                        let end = self.expect(TokenKind::RightParen)?.loc;
                        let loc = ident.loc.merge(&end);
                        Ok(Expression::FunctionCall { ident, arguments, loc })
                    }
                    TokenKind::LeftBracket => {
                        self.bump();
                        let index = self.parse_expression()?;
                        let end = self.expect(TokenKind::RightBracket)?.loc;
                        let loc = ident.loc.merge(&end);
                        Ok(Expression::ArrayElement { ident, index: Box::new(index), loc })
                    }
                    _ => {
                        let loc = ident.loc.clone();
                        Ok(Expression::Variable { ident, loc })
                    }
                }
            }
            other => Err(self.error_here(format!("expected expression, found '{}'", other))),
        }
    }
}
