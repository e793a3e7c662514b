//! Test helpers
//!
//! Run EBS source end to end with captured `print` output and a small
//! demonstration builtin set.

#![allow(dead_code)]

use ebs_core::runtime::builtins::{BuiltinParam, BuiltinRegistry, BuiltinSignature};
use ebs_core::runtime::json::parse_json_text;
use ebs_core::{
    parse_program, CaptureSink, Interpreter, LimitConfig, ModuleResolver, RuntimeError, TypeDesc,
    Value,
};
use ebs_vfs::MemoryFileSystem;

/// Outcome of a successful run
#[derive(Debug)]
pub struct ExecResult {
    /// Value of a top-level `return`, `Null` otherwise
    pub return_value: Value,
    /// Lines written by `print`
    pub output: Vec<String>,
    pub interpreter: Interpreter,
}

impl ExecResult {
    pub fn global(&self, name: &str) -> Option<Value> {
        self.interpreter.global(name)
    }
}

#[derive(Debug)]
pub enum ExecError {
    Parser(String),
    Runtime(RuntimeError),
}

impl ExecError {
    pub fn runtime(self) -> RuntimeError {
        match self {
            ExecError::Runtime(e) => e,
            ExecError::Parser(msg) => panic!("expected a runtime error, got parse error: {msg}"),
        }
    }
}

impl std::fmt::Display for ExecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecError::Parser(msg) => write!(f, "Parser error: {}", msg),
            ExecError::Runtime(e) => write!(f, "Runtime error: {}", e),
        }
    }
}

impl std::error::Error for ExecError {}

/// `string.toupper`, `string.tolower`, `string.length`, `json.parse`
pub fn demo_builtins() -> BuiltinRegistry {
    let mut registry = BuiltinRegistry::new();
    let text = || BuiltinSignature::new(vec![BuiltinParam::required("text", TypeDesc::String)]);

    registry.register("string.toupper", text(), |args| {
        Ok(Value::str(args[0].to_string().to_uppercase()))
    });
    registry.register("string.tolower", text(), |args| {
        Ok(Value::str(args[0].to_string().to_lowercase()))
    });
    registry.register("string.length", text(), |args| {
        Ok(Value::Int(args[0].to_string().chars().count() as i32))
    });
    registry.register("json.parse", text(), |args| {
        parse_json_text(&args[0].to_string()).map(Value::json)
    });
    registry
}

/// Route core logs to the test harness; filter with `RUST_LOG=ebs::interpreter=trace`
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn interpreter(output: &CaptureSink) -> Interpreter {
    init_tracing();
    Interpreter::new()
        .with_builtins(demo_builtins())
        .with_output(output.clone())
        .with_limits(LimitConfig {
            max_recursion_depth: 64,
            max_loop_iterations: Some(100_000),
        })
}

fn finish(
    interpreter: Interpreter,
    output: CaptureSink,
    result: Result<Value, RuntimeError>,
) -> Result<ExecResult, ExecError> {
    let return_value = result.map_err(ExecError::Runtime)?;
    Ok(ExecResult {
        return_value,
        output: output.lines(),
        interpreter,
    })
}

/// Parse and run a single script
pub fn run_code(code: &str) -> Result<ExecResult, ExecError> {
    let program = parse_program(code).map_err(|e| ExecError::Parser(e.to_string()))?;
    let output = CaptureSink::new();
    let mut interpreter = interpreter(&output);
    let result = interpreter.run(&program);
    finish(interpreter, output, result)
}

/// Run `entry` from an in-memory file tree rooted at `/`
pub fn run_files(files: Vec<(&str, &str)>, entry: &str) -> Result<ExecResult, ExecError> {
    let fs = MemoryFileSystem::with_files(files);
    let source = files_source(&fs, entry)?;
    let program = parse_program(&source).map_err(|e| ExecError::Parser(e.to_string()))?;

    let output = CaptureSink::new();
    let mut interpreter = interpreter(&output)
        .with_resolver(ModuleResolver::new(Box::new(fs), "/"))
        .with_script_path(entry);
    let result = interpreter.run(&program);
    finish(interpreter, output, result)
}

fn files_source(fs: &MemoryFileSystem, entry: &str) -> Result<String, ExecError> {
    use ebs_vfs::VirtualFileSystem;
    fs.read_source(std::path::Path::new(entry))
        .map_err(|e| ExecError::Parser(e.to_string()))
}

/// Output lines of a script that must succeed
pub fn output_of(code: &str) -> Vec<String> {
    match run_code(code) {
        Ok(result) => result.output,
        Err(e) => panic!("script failed: {e}\n{code}"),
    }
}

/// Error of a script that must fail at run time
pub fn error_of(code: &str) -> RuntimeError {
    match run_code(code) {
        Ok(result) => panic!("script succeeded with output {:?}\n{code}", result.output),
        Err(e) => e.runtime(),
    }
}

pub fn get_int(result: &ExecResult) -> Option<i64> {
    result.return_value.as_i64()
}
