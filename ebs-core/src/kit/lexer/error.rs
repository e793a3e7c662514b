//! Lexer error types
//!
//! Structured lexical errors: what went wrong, where, and a rendered message.

use super::core::SourcePosition;

/// Lexical error category
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Character that starts no token
    InvalidChar(char),
    /// String literal with no closing quote
    UnterminatedString,
    /// Malformed `\u` / `\x` escape
    InvalidEscape(String),
    /// Numeric literal out of range or with a bad suffix
    InvalidNumber(String),
    /// Anything else
    Custom(String),
}

/// Lexical error with position
#[derive(Debug, Clone, PartialEq)]
pub struct LexerError {
    pub kind: ErrorKind,
    pub position: SourcePosition,
    pub message: String,
}

impl LexerError {
    /// Create an error at the given position
    pub fn at(kind: ErrorKind, position: SourcePosition) -> Self {
        let message = Self::format_message(&kind, position);
        Self {
            kind,
            position,
            message,
        }
    }

    /// 1-based line
    pub fn line(&self) -> usize {
        self.position.line
    }

    /// 1-based column
    pub fn column(&self) -> usize {
        self.position.column
    }

    fn format_message(kind: &ErrorKind, position: SourcePosition) -> String {
        match kind {
            ErrorKind::InvalidChar(ch) => {
                format!("Invalid character '{}' at {}:{}", ch, position.line, position.column)
            }
            ErrorKind::UnterminatedString => format!(
                "Unterminated string literal starting at {}:{}",
                position.line, position.column
            ),
            ErrorKind::InvalidEscape(seq) => format!(
                "Invalid escape sequence '{}' at {}:{}",
                seq, position.line, position.column
            ),
            ErrorKind::InvalidNumber(num) => format!(
                "Invalid number format '{}' at {}:{}",
                num, position.line, position.column
            ),
            ErrorKind::Custom(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] ", self.position.line, self.position.column)?;

        match &self.kind {
            ErrorKind::InvalidChar(ch) => write!(f, "Invalid character '{}'", ch),
            ErrorKind::UnterminatedString => write!(f, "Unterminated string literal"),
            ErrorKind::InvalidEscape(seq) => write!(f, "Invalid escape sequence '{}'", seq),
            ErrorKind::InvalidNumber(num) => write!(f, "Invalid number format '{}'", num),
            ErrorKind::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for LexerError {}
