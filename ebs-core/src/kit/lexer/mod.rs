//! Lexer kit
//!
//! Generic pieces shared by scanners:
//! - position tracking (line/column/byte offset)
//! - a character stream with arbitrary lookahead
//! - the `Scanner` trait and token type
//!
//! The EBS scanner itself lives in [`ebs`].

pub mod core;
pub mod ebs;
pub mod error;
pub mod lexer;
pub mod scanner;
pub mod types;

pub use self::core::{CharStream, SourcePosition, SourceSpan, StreamResult};
pub use ebs::EbsScanner;
pub use error::{ErrorKind, LexerError};
pub use lexer::{tokenize, Lexer};
pub use scanner::{ScanResult, Scanner, Token};
