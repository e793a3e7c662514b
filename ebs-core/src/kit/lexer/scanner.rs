//! Scanner trait
//!
//! A scanner drives a [`CharStream`] and produces one token per call.

use super::core::{CharStream, SourcePosition, SourceSpan};
use super::error::LexerError;

pub trait Scanner {
    /// Token kind produced by this scanner
    type TokenKind: Clone + PartialEq + std::fmt::Debug;

    /// Scan the next token
    fn next_token(&mut self, stream: &mut CharStream) -> ScanResult<Token<Self::TokenKind>>;
}

/// A token with its source span and lexeme
#[derive(Debug, Clone, PartialEq)]
pub struct Token<K> {
    pub kind: K,
    pub span: SourceSpan,
    /// Lexeme; for string literals the unescaped content
    pub text: Option<String>,
}

impl<K> Token<K> {
    pub fn new(kind: K, span: SourceSpan) -> Self {
        Self {
            kind,
            span,
            text: None,
        }
    }

    pub fn with_text(kind: K, span: SourceSpan, text: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            text: Some(text.into()),
        }
    }

    pub fn start(&self) -> SourcePosition {
        self.span.start
    }

    pub fn end(&self) -> SourcePosition {
        self.span.end
    }

    pub fn lexeme(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Outcome of one scan step
#[derive(Debug, Clone, PartialEq)]
pub enum ScanResult<T> {
    Token(T),
    Eof,
    Error(LexerError),
}

impl<T> ScanResult<T> {
    pub fn map_kind<U, F>(self, f: F) -> ScanResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            ScanResult::Token(t) => ScanResult::Token(f(t)),
            ScanResult::Eof => ScanResult::Eof,
            ScanResult::Error(e) => ScanResult::Error(e),
        }
    }
}

pub fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
