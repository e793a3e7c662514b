//! EBS Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It is the shared configuration vocabulary across all EBS crates.

use serde::{Deserialize, Serialize};

/// Execution limits enforced by the interpreter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Maximum nesting of user function calls
    pub max_recursion_depth: usize,
    /// Upper bound on iterations of a single loop statement (`None` = unbounded)
    pub max_loop_iterations: Option<u64>,
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_recursion_depth: 256,
            max_loop_iterations: None,
        }
    }
}

/// Execution phase, used to scope log targets and error reports
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Lexer,
    Parser,
    Module,
    Interpreter,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Lexer, Phase::Parser, Phase::Module, Phase::Interpreter];

    /// Get the string name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Lexer => "lexer",
            Phase::Parser => "parser",
            Phase::Module => "module",
            Phase::Interpreter => "interpreter",
        }
    }

    /// Get the log target name for this phase
    pub fn target(&self) -> String {
        format!("ebs::{}", self.as_str())
    }
}
