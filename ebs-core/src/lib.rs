//! EBS Core - lexer, parser and tree-walking interpreter
//!
//! Turns EBS source text into running behavior. The crate does no file IO of
//! its own: imported sources come through an `ebs_vfs::VirtualFileSystem`,
//! printed output through an [`runtime::output::OutputSink`] and library
//! functions through a [`runtime::builtins::BuiltinProvider`].
//!
//! Configuration is passed explicitly via parameters, not via global state.

pub mod compiler;
pub mod kit;
pub mod runtime;

// Re-export common types
pub use compiler::module::{ModuleResolver, ResolveError};
pub use compiler::parser::{parse_program, ParserError, Program};
pub use kit::lexer::LexerError;
pub use runtime::builtins::{BuiltinParam, BuiltinProvider, BuiltinRegistry, BuiltinSignature};
pub use runtime::error::{ErrorKind, RuntimeError, RuntimeResult};
pub use runtime::interpreter::{ArgValue, Flow, Interpreter};
pub use runtime::output::{CaptureSink, OutputSink, StdoutSink};
pub use runtime::types::TypeDesc;
pub use runtime::value::Value;

// Re-export config types from ebs-config
pub use ebs_config::{LimitConfig, Phase};
