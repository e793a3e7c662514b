//! Runtime: values, types, scopes and the tree-walking interpreter

pub mod array;
pub mod builtins;
pub mod coerce;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod json;
pub mod output;
pub mod queue;
pub mod types;
pub mod value;

pub use builtins::{BuiltinParam, BuiltinProvider, BuiltinRegistry, BuiltinSignature};
pub use environment::{Binding, Environment, NameKey, NameMap};
pub use error::{ErrorKind, RuntimeError, RuntimeResult};
pub use interpreter::{Flow, Interpreter};
pub use output::{CaptureSink, OutputSink, StdoutSink};
pub use types::TypeDesc;
pub use value::Value;
