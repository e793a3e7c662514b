use crate::kit::lexer::types::Coordinate;
use crate::kit::lexer::LexerError;

/// Syntax error with a source location
#[derive(Debug, Clone, PartialEq)]
pub struct ParserError {
    pub kind: ParserErrorKind,
    pub location: ErrorLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorLocation {
    At(Coordinate),
    /// Just past the given token
    After(Coordinate),
    Eof,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParserErrorKind {
    UnexpectedToken {
        found: String,
        expected: Vec<String>,
    },
    InvalidNumberFormat(String),
    MissingRightParen,
    MissingRightBracket,
    MissingRightCurly,
    UnexpectedEndOfInput,
    ExpectedIdentifier {
        found: String,
    },
    /// Left side of `=`, `+=`, `++` is not a variable, field or element
    InvalidAssignmentTarget,
    /// `break`, `continue` or `exit` with no enclosing loop
    OutsideLoop(String),
    /// Functions, types and imports are only allowed at top level
    NotAtTopLevel(String),
    UnknownErrorKind(String),
    InvalidBitRange(String),
    /// Tokenizing failed before parsing could start
    Lexical(LexerError),
    Custom(String),
}

impl ParserError {
    pub fn at(kind: ParserErrorKind, line: usize, column: usize) -> Self {
        Self {
            kind,
            location: ErrorLocation::At(Coordinate { line, column }),
        }
    }

    pub fn at_eof(kind: ParserErrorKind) -> Self {
        Self {
            kind,
            location: ErrorLocation::Eof,
        }
    }

    pub fn unknown(kind: ParserErrorKind) -> Self {
        Self {
            kind,
            location: ErrorLocation::Unknown,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match &self.location {
            ErrorLocation::At(coord) | ErrorLocation::After(coord) => Some(coord.line),
            _ => None,
        }
    }

    pub fn column(&self) -> Option<usize> {
        match &self.location {
            ErrorLocation::At(coord) | ErrorLocation::After(coord) => Some(coord.column),
            _ => None,
        }
    }

    /// Message without the location prefix
    pub fn message(&self) -> String {
        match &self.kind {
            ParserErrorKind::UnexpectedToken { found, expected } => {
                if expected.is_empty() {
                    format!("Unexpected token: '{found}'")
                } else {
                    format!(
                        "Unexpected token: '{}', expected: {}",
                        found,
                        expected.join(" or ")
                    )
                }
            }
            ParserErrorKind::InvalidNumberFormat(text) => {
                format!("Invalid number format: '{text}'")
            }
            ParserErrorKind::MissingRightParen => "Missing right parenthesis ')'".to_string(),
            ParserErrorKind::MissingRightBracket => "Missing right bracket ']'".to_string(),
            ParserErrorKind::MissingRightCurly => "Missing right curly brace '}'".to_string(),
            ParserErrorKind::UnexpectedEndOfInput => "Unexpected end of input".to_string(),
            ParserErrorKind::ExpectedIdentifier { found } => {
                format!("Expected identifier, found: '{found}'")
            }
            ParserErrorKind::InvalidAssignmentTarget => "Invalid assignment target".to_string(),
            ParserErrorKind::OutsideLoop(word) => format!("'{word}' used outside of a loop"),
            ParserErrorKind::NotAtTopLevel(what) => {
                format!("{what} is only allowed at the top level of a script")
            }
            ParserErrorKind::UnknownErrorKind(name) => format!("Unknown exception kind '{name}'"),
            ParserErrorKind::InvalidBitRange(msg) => msg.clone(),
            ParserErrorKind::Lexical(err) => err.message.clone(),
            ParserErrorKind::Custom(msg) => msg.clone(),
        }
    }
}

impl From<LexerError> for ParserError {
    fn from(err: LexerError) -> Self {
        let (line, column) = (err.line(), err.column());
        Self::at(ParserErrorKind::Lexical(err), line, column)
    }
}

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let location_prefix = match &self.location {
            ErrorLocation::At(coord) => format!("{}:{}", coord.line, coord.column),
            ErrorLocation::After(coord) => format!("after {}:{}", coord.line, coord.column),
            ErrorLocation::Eof => "EOF".to_string(),
            ErrorLocation::Unknown => "?".to_string(),
        };
        write!(f, "[{location_prefix}] {}", self.message())
    }
}

impl std::error::Error for ParserError {}

pub type ParseResult<T> = Result<T, ParserError>;

pub fn unexpected_token(
    found: impl Into<String>,
    expected: Vec<impl Into<String>>,
) -> ParserErrorKind {
    ParserErrorKind::UnexpectedToken {
        found: found.into(),
        expected: expected.into_iter().map(Into::into).collect(),
    }
}
