//! Test helpers
//!
//! End-to-end runs through the public `ebs` API with captured output.

#![allow(dead_code)]

use ebs::{
    run_file, run_program, BuiltinParam, BuiltinRegistry, BuiltinSignature, EbsError, RunConfig,
    RunOutput, TypeDesc, Value,
};
use ebs_vfs::MemoryFileSystem;

/// `text.upper` and `text.repeat`, enough to exercise host dispatch
pub fn host_builtins() -> BuiltinRegistry {
    let mut registry = BuiltinRegistry::new();
    registry.register(
        "text.upper",
        BuiltinSignature::new(vec![BuiltinParam::required("s", TypeDesc::String)]),
        |args| Ok(Value::str(args[0].to_string().to_uppercase())),
    );
    registry.register(
        "text.repeat",
        BuiltinSignature::new(vec![
            BuiltinParam::required("s", TypeDesc::String),
            BuiltinParam::optional("times", TypeDesc::Int, Value::Int(2)),
        ]),
        |args| {
            let times = args[1].as_i64().unwrap_or(0).max(0) as usize;
            Ok(Value::str(args[0].to_string().repeat(times)))
        },
    );
    registry
}

/// Parse and run a script with the host builtins
pub fn run_code(code: &str) -> Result<RunOutput, EbsError> {
    let program = ebs::parse_program(code)?;
    run_program(&program, &RunConfig::capturing(), host_builtins(), Vec::new())
}

/// Run `entry` from an in-memory file tree
pub fn run_files(files: Vec<(&str, &str)>, entry: &str) -> Result<RunOutput, EbsError> {
    let config = RunConfig::capturing()
        .with_file_system(MemoryFileSystem::with_files(files))
        .with_root_dir("/");
    run_file(entry, &config, host_builtins())
}

/// Output lines of a script that must succeed
pub fn output_of(code: &str) -> Vec<String> {
    match run_code(code) {
        Ok(out) => out.output,
        Err(e) => panic!("script failed: {e}\n{code}"),
    }
}

pub fn get_int(out: &RunOutput) -> Option<i64> {
    out.value.as_i64()
}
