//! Lexer entry point
//!
//! Drives an [`EbsScanner`] over a source string. The token sequence always
//! ends with a single `Eof` sentinel token.
//!
//! ```rust
//! use ebs_core::kit::lexer::tokenize;
//! use ebs_core::compiler::lexer::token_kind::EbsTokenKind;
//!
//! let tokens = tokenize("print 1;").unwrap();
//! assert_eq!(tokens.last().unwrap().kind, EbsTokenKind::Eof);
//! ```

use super::core::SourceSpan;
use super::error::LexerError;
use super::scanner::{ScanResult, Scanner, Token};
use super::{CharStream, EbsScanner};
use crate::compiler::lexer::token_kind::EbsTokenKind;

use tracing::{debug, trace};

pub struct Lexer {
    scanner: EbsScanner,
    stream: CharStream,
    finished: bool,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        trace!(target: "ebs::lexer", bytes = source.len(), "Creating lexer");
        Self {
            scanner: EbsScanner::new(),
            stream: CharStream::new(source),
            finished: false,
        }
    }

    /// Next token; after the `Eof` sentinel has been returned, returns `None`
    pub fn next_token(&mut self) -> Option<Result<Token<EbsTokenKind>, LexerError>> {
        if self.finished {
            return None;
        }

        match self.scanner.next_token(&mut self.stream) {
            ScanResult::Token(token) => Some(Ok(token)),
            ScanResult::Eof => {
                self.finished = true;
                let at = self.stream.position();
                Some(Ok(Token::with_text(EbsTokenKind::Eof, SourceSpan::at(at), "")))
            }
            ScanResult::Error(e) => {
                debug!(target: "ebs::lexer", error = %e, "Lex error");
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl Iterator for Lexer {
    type Item = Result<Token<EbsTokenKind>, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Tokenize a whole source text, stopping at the first error
pub fn tokenize(source: &str) -> Result<Vec<Token<EbsTokenKind>>, LexerError> {
    let tokens = Lexer::new(source).collect::<Result<Vec<_>, _>>()?;
    debug!(target: "ebs::lexer", count = tokens.len(), "Tokenized source");
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kit::lexer::ErrorKind;

    #[test]
    fn test_empty_source_yields_only_eof() {
        let tokens = tokenize("").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, EbsTokenKind::Eof);
    }

    #[test]
    fn test_statement_tokens() {
        let tokens = tokenize("var x: int = 5;").unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EbsTokenKind::Var,
                EbsTokenKind::Identifier,
                EbsTokenKind::Colon,
                EbsTokenKind::TypeInt,
                EbsTokenKind::Equal,
                EbsTokenKind::LiteralInt,
                EbsTokenKind::Semicolon,
                EbsTokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_first_error_stops() {
        let err = tokenize("var a = 1;\nvar b = $;").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidChar('$'));
        assert_eq!(err.line(), 2);
    }

    #[test]
    fn test_iterator_ends_after_eof() {
        let mut lexer = Lexer::new("x");
        assert!(matches!(lexer.next_token(), Some(Ok(t)) if t.kind == EbsTokenKind::Identifier));
        assert!(matches!(lexer.next_token(), Some(Ok(t)) if t.kind == EbsTokenKind::Eof));
        assert!(lexer.next_token().is_none());
    }
}
