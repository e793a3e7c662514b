pub mod error;
pub mod expr;
pub mod parser;
pub mod program;
pub mod stmt;
pub mod type_expr;
pub mod utils;

pub use error::{ErrorLocation, ParseResult, ParserError, ParserErrorKind};
pub use parser::Parser;
pub use program::Program;

use crate::kit::lexer::tokenize;

/// Tokenize and parse a script; lexical errors come back as
/// [`ParserErrorKind::Lexical`]
pub fn parse_program(source: &str) -> ParseResult<Program> {
    let tokens = tokenize(source)?;
    Parser::new(tokens).parse()
}
