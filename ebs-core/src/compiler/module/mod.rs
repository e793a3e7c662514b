//! Import resolution

pub mod resolver;

pub use resolver::{ModuleResolver, ResolveError};
