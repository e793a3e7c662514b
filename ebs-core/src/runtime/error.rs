//! Runtime error taxonomy
//!
//! A closed set of kinds; scripts can raise and catch them but never add
//! new ones. Control-flow signals are not errors and live in
//! [`crate::runtime::interpreter::Flow`].

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Catch-all in `when` clauses
    AnyError,
    IoError,
    DbError,
    TypeError,
    NullError,
    IndexError,
    MathError,
    ParseError,
    NetworkError,
    NotFoundError,
    AccessError,
    ValidationError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 12] = [
        ErrorKind::AnyError,
        ErrorKind::IoError,
        ErrorKind::DbError,
        ErrorKind::TypeError,
        ErrorKind::NullError,
        ErrorKind::IndexError,
        ErrorKind::MathError,
        ErrorKind::ParseError,
        ErrorKind::NetworkError,
        ErrorKind::NotFoundError,
        ErrorKind::AccessError,
        ErrorKind::ValidationError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::AnyError => "ANY_ERROR",
            ErrorKind::IoError => "IO_ERROR",
            ErrorKind::DbError => "DB_ERROR",
            ErrorKind::TypeError => "TYPE_ERROR",
            ErrorKind::NullError => "NULL_ERROR",
            ErrorKind::IndexError => "INDEX_ERROR",
            ErrorKind::MathError => "MATH_ERROR",
            ErrorKind::ParseError => "PARSE_ERROR",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::NotFoundError => "NOT_FOUND_ERROR",
            ErrorKind::AccessError => "ACCESS_ERROR",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
        }
    }

    /// Case-insensitive lookup by script name (`io_error`, `IO_ERROR`)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Whether a `when` clause of this kind handles `error`
    pub fn handles(self, error: ErrorKind) -> bool {
        self == ErrorKind::AnyError || self == error
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed script error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    /// Line of the statement that raised it, once known
    pub line: Option<usize>,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: None,
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn null_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NullError, message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IndexError, message)
    }

    pub fn math_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MathError, message)
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ParseError, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFoundError, message)
    }

    pub fn access_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessError, message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message)
    }

    /// Record the line if no inner statement already did
    pub fn at_line(mut self, line: usize) -> Self {
        self.line.get_or_insert(line);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_insensitive() {
        assert_eq!(ErrorKind::from_name("io_error"), Some(ErrorKind::IoError));
        assert_eq!(ErrorKind::from_name("Not_Found_Error"), Some(ErrorKind::NotFoundError));
        assert_eq!(ErrorKind::from_name("OOPS_ERROR"), None);
    }

    #[test]
    fn test_names_round_trip() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_any_error_handles_everything() {
        assert!(ErrorKind::AnyError.handles(ErrorKind::MathError));
        assert!(ErrorKind::MathError.handles(ErrorKind::MathError));
        assert!(!ErrorKind::IoError.handles(ErrorKind::MathError));
    }

    #[test]
    fn test_innermost_line_wins() {
        let err = RuntimeError::math_error("Division by zero").at_line(3).at_line(9);
        assert_eq!(err.line, Some(3));
        assert_eq!(err.to_string(), "MATH_ERROR: Division by zero");
    }
}
