//! Single-pass scanner for Lox source.
//!
//! [`Scanner::scan`] walks the byte buffer once and produces the complete
//! token vector, terminated by an EOF token.  Lexical errors do not stop the
//! scan: the offending character is skipped, scanning continues, and every
//! error is reported together at the end, the same accumulation contract the
//! parser and resolver follow.

use log::{debug, info};
use phf::phf_map;

use crate::error::LoxError;
use crate::token::{Token, TokenType};

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and" => TokenType::AND,
    b"class" => TokenType::CLASS,
    b"else" => TokenType::ELSE,
    b"false" => TokenType::FALSE,
    b"fun" => TokenType::FUN,
    b"for" => TokenType::FOR,
    b"if" => TokenType::IF,
    b"nil" => TokenType::NIL,
    b"or" => TokenType::OR,
    b"print" => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super" => TokenType::SUPER,
    b"this" => TokenType::THIS,
    b"true" => TokenType::TRUE,
    b"var" => TokenType::VAR,
    b"while" => TokenType::WHILE,
};

#[derive(Debug)]
pub struct Scanner {
    source: Vec<u8>,
    start: usize,
    current: usize,
    line: usize,
    tokens: Vec<Token>,
    errors: Vec<LoxError>,
}

impl Scanner {
    /// `buf` must be valid UTF-8; the driver validates source on ingestion.
    pub fn new(buf: Vec<u8>) -> Self {
        info!("Initializing Scanner with buffer of {} bytes", buf.len());
        Self {
            source: buf,
            start: 0,
            current: 0,
            line: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Scan the whole buffer.  Returns every token including the trailing
    /// EOF, or the full list of lexical errors if any were found.
    pub fn scan(mut self) -> Result<Vec<Token>, Vec<LoxError>> {
        while self.current < self.source.len() {
            self.start = self.current;

            if let Err(e) = self.scan_token() {
                debug!("Lexical error: {}", e);
                self.errors.push(e);
            }
        }

        self.tokens
            .push(Token::new(TokenType::EOF, String::new(), self.line));

        info!(
            "Scanned {} token(s), {} error(s)",
            self.tokens.len(),
            self.errors.len()
        );

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(self.errors)
        }
    }

    /// Consume one lexeme starting at `self.start`.  Arms that produce no
    /// token (whitespace, comments) yield `None`.
    fn scan_token(&mut self) -> Result<(), LoxError> {
        let token_type: Option<TokenType> = match self.bump() {
            b'(' => Some(TokenType::LEFT_PAREN),
            b')' => Some(TokenType::RIGHT_PAREN),
            b'{' => Some(TokenType::LEFT_BRACE),
            b'}' => Some(TokenType::RIGHT_BRACE),
            b',' => Some(TokenType::COMMA),
            b'.' => Some(TokenType::DOT),
            b'-' => Some(TokenType::MINUS),
            b'+' => Some(TokenType::PLUS),
            b';' => Some(TokenType::SEMICOLON),
            b'*' => Some(TokenType::STAR),

            b'!' => Some(self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG)),
            b'=' => Some(self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL)),
            b'<' => Some(self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS)),
            b'>' => Some(self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER)),

            b'/' => {
                if self.eat(b'/') {
                    // Line comment: discard through end of line.
                    while self.current < self.source.len() && self.source[self.current] != b'\n' {
                        self.current += 1;
                    }
                    None
                } else {
                    Some(TokenType::SLASH)
                }
            }

            b' ' | b'\r' | b'\t' => None,

            b'\n' => {
                self.line += 1;
                None
            }

            b'"' => Some(self.string()?),

            b'0'..=b'9' => Some(self.number()),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => Some(self.identifier()),

            other => {
                return Err(LoxError::lex(
                    self.line,
                    format!("Unexpected character: {}", other as char),
                ));
            }
        };

        if let Some(token_type) = token_type {
            self.push_token(token_type);
        }

        Ok(())
    }

    fn string(&mut self) -> Result<TokenType, LoxError> {
        loop {
            match self.source.get(self.current) {
                None => return Err(LoxError::lex(self.line, "Unterminated string.")),

                Some(b'"') => break,

                Some(b'\n') => {
                    self.line += 1;
                    self.current += 1;
                }

                Some(_) => self.current += 1,
            }
        }

        // Closing quote.
        self.current += 1;

        let literal = self.slice(self.start + 1, self.current - 1).to_string();

        Ok(TokenType::STRING(literal))
    }

    fn number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.current += 1;
        }

        // A fractional part needs a digit after the dot; `12.` is a number
        // followed by DOT.
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.current += 1;

            while self.peek().is_ascii_digit() {
                self.current += 1;
            }
        }

        let number: f64 = self.slice(self.start, self.current).parse().unwrap_or(0.0);

        TokenType::NUMBER(number)
    }

    fn identifier(&mut self) -> TokenType {
        while matches!(self.peek(), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.current += 1;
        }

        let text: &[u8] = &self.source[self.start..self.current];

        KEYWORDS.get(text).cloned().unwrap_or(TokenType::IDENTIFIER)
    }

    fn push_token(&mut self, token_type: TokenType) {
        let lexeme = self.slice(self.start, self.current).to_string();

        self.tokens.push(Token::new(token_type, lexeme, self.line));
    }

    fn bump(&mut self) -> u8 {
        let byte = self.source[self.current];
        self.current += 1;
        byte
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.source.get(self.current) == Some(&expected) {
            self.current += 1;
            true
        } else {
            false
        }
    }

    fn either(&mut self, expected: u8, two: TokenType, one: TokenType) -> TokenType {
        if self.eat(expected) {
            two
        } else {
            one
        }
    }

    fn peek(&self) -> u8 {
        self.source.get(self.current).copied().unwrap_or(0)
    }

    fn peek_next(&self) -> u8 {
        self.source.get(self.current + 1).copied().unwrap_or(0)
    }

    /// Slices are taken at ASCII delimiter boundaries, which keeps them on
    /// char boundaries within the UTF-8 the driver validated.
    fn slice(&self, from: usize, to: usize) -> &str {
        unsafe { std::str::from_utf8_unchecked(&self.source[from..to]) }
    }
}
