//! API error types
//!
//! One error type for every phase of a host call, plus a flat
//! [`ErrorReport`] for tools that want structured data instead of text.

use ebs_config::Phase;
use ebs_core::compiler::parser::{ErrorLocation, ParserErrorKind};
use ebs_vfs::VfsError;
use thiserror::Error;

pub use ebs_core::{LexerError, ParserError, RuntimeError};

/// Any failure surfaced by the EBS API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EbsError {
    #[error("{0}")]
    Lexer(#[from] LexerError),

    #[error("{0}")]
    Parser(#[from] ParserError),

    /// Uncaught script error
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// The entry script could not be read
    #[error("Cannot read script '{path}': {source}")]
    Source {
        path: String,
        #[source]
        source: VfsError,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EbsError {
    /// Split a parse failure into its lexical and syntactic cases
    pub fn from_parse(err: ParserError) -> Self {
        match err.kind {
            ParserErrorKind::Lexical(lex) => EbsError::Lexer(lex),
            kind => EbsError::Parser(ParserError {
                kind,
                location: err.location,
            }),
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            EbsError::Lexer(e) => Some(e.line()),
            EbsError::Parser(e) => e.line(),
            EbsError::Runtime(e) => e.line,
            EbsError::Source { .. } | EbsError::Config(_) => None,
        }
    }

    pub fn column(&self) -> Option<usize> {
        match self {
            EbsError::Lexer(e) => Some(e.column()),
            EbsError::Parser(e) => e.column(),
            _ => None,
        }
    }

    /// Name of the phase that failed
    pub fn phase(&self) -> &'static str {
        match self {
            EbsError::Lexer(_) => Phase::Lexer.as_str(),
            EbsError::Parser(_) => Phase::Parser.as_str(),
            EbsError::Runtime(_) => Phase::Interpreter.as_str(),
            EbsError::Source { .. } => Phase::Module.as_str(),
            EbsError::Config(_) => "config",
        }
    }

    /// Structured report, suitable for printing or serializing
    pub fn to_report(&self) -> ErrorReport {
        let (error_kind, message) = match self {
            EbsError::Lexer(e) => (variant_name(&e.kind), e.message.clone()),
            EbsError::Parser(e) => (variant_name(&e.kind), e.message()),
            EbsError::Runtime(e) => (e.kind.name().to_string(), e.message.clone()),
            EbsError::Source { source, .. } => (variant_name(source), self.to_string()),
            EbsError::Config(msg) => ("ConfigError".to_string(), msg.clone()),
        };

        ErrorReport {
            phase: self.phase(),
            line: self.line(),
            column: self.column(),
            location: match self {
                EbsError::Parser(e) => Some(location_name(&e.location)),
                _ => None,
            },
            error_kind,
            message,
        }
    }
}

/// `UnexpectedToken { .. }` -> `UnexpectedToken`
fn variant_name(kind: &impl std::fmt::Debug) -> String {
    let debug = format!("{kind:?}");
    debug
        .split(|c: char| c == ' ' || c == '(' || c == '{')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn location_name(location: &ErrorLocation) -> &'static str {
    match location {
        ErrorLocation::At(_) => "at",
        ErrorLocation::After(_) => "after",
        ErrorLocation::Eof => "eof",
        ErrorLocation::Unknown => "unknown",
    }
}

/// Flattened error data
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub phase: &'static str,
    pub line: Option<usize>,
    pub column: Option<usize>,
    /// For parser errors: whether the position is at, after or past the end
    pub location: Option<&'static str>,
    /// `UnexpectedToken`, `InvalidChar`, `MATH_ERROR`, ...
    pub error_kind: String,
    pub message: String,
}

impl std::fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(col)) => write!(f, "[{line}:{col}] ")?,
            (Some(line), None) => write!(f, "[line {line}] ")?,
            _ => {}
        }
        write!(f, "{} error: {}", self.phase, self.message)
    }
}

impl ErrorReport {
    pub fn to_json(&self) -> String {
        let mut json = serde_json::json!({
            "phase": self.phase,
            "line": self.line,
            "column": self.column,
            "error_kind": self.error_kind,
            "message": self.message,
        });
        if let Some(location) = self.location {
            json["location"] = serde_json::Value::from(location);
        }
        json.to_string()
    }

    /// One-line form without position, e.g. `parser: Unexpected token ';'`
    pub fn to_short(&self) -> String {
        format!("{}: {}", self.phase, self.message)
    }
}
