//! API input/output types

use ebs_core::Value;

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Value of a top-level `return`, `Null` when the script ran off the end
    pub value: Value,
    /// `print` lines, when the config captures output
    pub output: Vec<String>,
}
