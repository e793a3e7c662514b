pub mod lexer;
pub mod module;
pub mod parser;
