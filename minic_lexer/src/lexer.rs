//! The hand-written scanner for the minic source language

use crate::token::{Token, TokenKind};
use minic_common::{MinicError, MinicResult, SourceLocation};
use std::sync::Arc;

/// Scanner over a source buffer.
///
/// Operates on bytes; string literals pass their payload through
/// unchanged, so escape sequences survive to the data-section emitter.
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
    file: Arc<str>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: impl Into<Arc<str>>) -> Self {
        Self { src: source.as_bytes(), pos: 0, line: 1, col: 1, file: file.into() }
    }

    /// Scan the whole input. Stops at the first lexical error.
    pub fn tokenize(mut self) -> MinicResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::EndOfFile;
            tokens.push(token);
            if done {
                log::debug!("scanned {} tokens from {}", tokens.len(), self.file);
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error_at(&self, line: u32, col: u32, message: &str) -> MinicError {
        MinicError::lex(format!("{}:{}:{}: {}", self.file, line, col, message))
    }

    fn skip_trivia(&mut self) -> MinicResult<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b'/') if self.peek_next() == Some(b'/') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_next() == Some(b'*') => {
                    let (line, col) = (self.line, self.col);
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek() {
                            Some(b'*') if self.peek_next() == Some(b'/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                            None => return Err(self.error_at(line, col, "unterminated comment")),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> MinicResult<Token> {
        self.skip_trivia()?;

        let (start_line, start_col) = (self.line, self.col);
        let loc = |lexer: &Self| {
            SourceLocation::new(
                start_line,
                start_col,
                lexer.line,
                lexer.col.saturating_sub(1).max(1),
                Arc::clone(&lexer.file),
            )
        };

        let c = match self.bump() {
            Some(c) => c,
            None => {
                return Ok(Token::new(
                    TokenKind::EndOfFile,
                    SourceLocation::new(start_line, start_col, start_line, start_col, Arc::clone(&self.file)),
                ))
            }
        };

        let kind = match c {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Asterisk,
            b'/' => TokenKind::Slash,
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'[' => TokenKind::LeftBracket,
            b']' => TokenKind::RightBracket,
            b'{' => TokenKind::LeftBrace,
            b'}' => TokenKind::RightBrace,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    TokenKind::SmallerEq
                } else {
                    TokenKind::Smaller
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    TokenKind::GreaterEq
                } else {
                    TokenKind::Greater
                }
            }
            b'=' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    TokenKind::Equal
                } else {
                    TokenKind::Assign
                }
            }
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.bump();
                    TokenKind::NotEqual
                } else {
                    TokenKind::Not
                }
            }
            b'&' => {
                if self.peek() == Some(b'&') {
                    self.bump();
                    TokenKind::And
                } else {
                    return Err(self.error_at(start_line, start_col, "expected '&&'"));
                }
            }
            b'|' => {
                if self.peek() == Some(b'|') {
                    self.bump();
                    TokenKind::Or
                } else {
                    return Err(self.error_at(start_line, start_col, "expected '||'"));
                }
            }
            b'"' => self.scan_string(start_line, start_col)?,
            c if c.is_ascii_digit() => self.scan_number(c, start_line, start_col)?,
            c if c.is_ascii_alphabetic() || c == b'_' => self.scan_word(c),
            c => {
                return Err(self.error_at(
                    start_line,
                    start_col,
                    &format!("unexpected character '{}'", c as char),
                ))
            }
        };

        Ok(Token::new(kind, loc(self)))
    }

    fn scan_string(&mut self, start_line: u32, start_col: u32) -> MinicResult<TokenKind> {
        let mut payload = Vec::new();
        loop {
            match self.bump() {
                Some(b'"') => break,
                Some(b'\n') | None => {
                    return Err(self.error_at(start_line, start_col, "unterminated string literal"))
                }
                Some(c) => payload.push(c),
            }
        }
        // The payload is raw source bytes; escape sequences are not
        // interpreted here and reach the assembly data section verbatim.
        String::from_utf8(payload)
            .map(TokenKind::StringLiteral)
            .map_err(|_| self.error_at(start_line, start_col, "invalid byte sequence in string literal"))
    }

    fn scan_number(&mut self, first: u8, start_line: u32, start_col: u32) -> MinicResult<TokenKind> {
        let mut digits = String::new();
        digits.push(first as char);
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c as char);
                self.bump();
            } else {
                break;
            }
        }

        if self.peek() == Some(b'.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            digits.push('.');
            self.bump();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    digits.push(c as char);
                    self.bump();
                } else {
                    break;
                }
            }
            digits
                .parse::<f64>()
                .map(TokenKind::FloatLiteral)
                .map_err(|_| self.error_at(start_line, start_col, "invalid float literal"))
        } else {
            digits
                .parse::<i64>()
                .map(TokenKind::IntLiteral)
                .map_err(|_| self.error_at(start_line, start_col, "integer literal out of range"))
        }
    }

    fn scan_word(&mut self, first: u8) -> TokenKind {
        let mut word = String::new();
        word.push(first as char);
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                word.push(c as char);
                self.bump();
            } else {
                break;
            }
        }

        match word.as_str() {
            "bool" => TokenKind::KeywordBool,
            "float" => TokenKind::KeywordFloat,
            "int" => TokenKind::KeywordInt,
            "string" => TokenKind::KeywordString,
            "void" => TokenKind::KeywordVoid,
            "if" => TokenKind::KeywordIf,
            "else" => TokenKind::KeywordElse,
            "while" => TokenKind::KeywordWhile,
            "return" => TokenKind::KeywordReturn,
            "true" => TokenKind::KeywordTrue,
            "false" => TokenKind::KeywordFalse,
            _ => TokenKind::Identifier(word),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source, "test.mc")
            .tokenize()
            .expect("tokenization should succeed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn scans_function_header() {
        assert_eq!(
            kinds("int main()"),
            vec![
                TokenKind::KeywordInt,
                TokenKind::Identifier("main".into()),
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn scans_all_operators() {
        assert_eq!(
            kinds("+ - * / < > <= >= && || == != = !"),
            vec![
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Asterisk,
                TokenKind::Slash,
                TokenKind::Smaller,
                TokenKind::Greater,
                TokenKind::SmallerEq,
                TokenKind::GreaterEq,
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Equal,
                TokenKind::NotEqual,
                TokenKind::Assign,
                TokenKind::Not,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn scans_numbers() {
        assert_eq!(
            kinds("42 3.14 0"),
            vec![
                TokenKind::IntLiteral(42),
                TokenKind::FloatLiteral(3.14),
                TokenKind::IntLiteral(0),
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn string_payload_keeps_escapes_raw() {
        assert_eq!(
            kinds(r#""a\nb""#),
            vec![TokenKind::StringLiteral("a\\nb".into()), TokenKind::EndOfFile]
        );
    }

    #[test]
    fn skips_comments() {
        assert_eq!(
            kinds("1 // line\n/* block\n comment */ 2"),
            vec![TokenKind::IntLiteral(1), TokenKind::IntLiteral(2), TokenKind::EndOfFile]
        );
    }

    #[test]
    fn tracks_positions() {
        let tokens = Lexer::new("a\n  b", "test.mc").tokenize().unwrap();
        assert_eq!((tokens[0].loc.start_line, tokens[0].loc.start_col), (1, 1));
        assert_eq!((tokens[1].loc.start_line, tokens[1].loc.start_col), (2, 3));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = Lexer::new("\"abc", "test.mc").tokenize().unwrap_err();
        assert_eq!(err.message(), "test.mc:1:1: unterminated string literal");
    }

    #[test]
    fn int_division_is_not_a_float() {
        assert_eq!(
            kinds("1/2"),
            vec![
                TokenKind::IntLiteral(1),
                TokenKind::Slash,
                TokenKind::IntLiteral(2),
                TokenKind::EndOfFile,
            ]
        );
    }
}
