//! EBS API - host entry points
//!
//! Wires the parser, module resolver and interpreter together behind a
//! handful of functions:
//! - [`parse_program`]: source text to a [`Program`]
//! - [`run`] / [`run_program`]: execute source or a parsed program
//! - [`run_file`]: execute a script from disk (or a configured VFS)
//!
//! Hosts supply their builtins through [`BuiltinProvider`]; the engine has
//! none of its own.
//!
//! For CLI convenience, a global [`RunConfig`] can be installed once with
//! [`init_config`] and used by [`quick_run`].

use ebs_core::{CaptureSink, Interpreter, ModuleResolver};
use ebs_vfs::{NativeFileSystem, VfsError, VfsResult, VirtualFileSystem};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub mod config;
pub mod error;
pub mod types;

pub use config::{config as get_config, init as init_config, is_initialized, RunConfig};
pub use error::{EbsError, ErrorReport, LexerError, ParserError, RuntimeError};
pub use types::RunOutput;

pub use ebs_config::{LimitConfig, Phase};
pub use ebs_core::{
    ArgValue, BuiltinParam, BuiltinProvider, BuiltinRegistry, BuiltinSignature, ErrorKind,
    Program, TypeDesc, Value,
};
pub use {ebs_config, ebs_core, ebs_vfs};

const TARGET: &str = "ebs::api";

/// Parse source text, reporting lexical and syntax errors separately
pub fn parse_program(source: &str) -> Result<Program, EbsError> {
    ebs_core::parse_program(source).map_err(EbsError::from_parse)
}

/// Parse and run `source` with no builtins or host bindings
pub fn run(source: &str, config: &RunConfig) -> Result<RunOutput, EbsError> {
    let program = parse_program(source)?;
    run_program(&program, config, BuiltinRegistry::new(), Vec::new())
}

/// Run a parsed program
///
/// `bindings` are defined as globals before the first statement runs.
pub fn run_program<B, I>(
    program: &Program,
    config: &RunConfig,
    builtins: B,
    bindings: I,
) -> Result<RunOutput, EbsError>
where
    B: BuiltinProvider + 'static,
    I: IntoIterator<Item = (String, Value)>,
{
    info!(target: TARGET, script = ?config.script_path, "Starting execution");

    let capture = config.capture_output.then(CaptureSink::new);
    let mut interpreter = build_interpreter(config, builtins, capture.clone());
    let value = interpreter.run_with_bindings(program, bindings)?;

    info!(target: TARGET, "Execution completed");
    Ok(RunOutput {
        value,
        output: capture.map(|sink| sink.lines()).unwrap_or_default(),
    })
}

/// Read, parse and run the script at `path`
///
/// Imports resolve relative to the script's directory.
pub fn run_file<B>(
    path: impl AsRef<Path>,
    config: &RunConfig,
    builtins: B,
) -> Result<RunOutput, EbsError>
where
    B: BuiltinProvider + 'static,
{
    let fs = file_system(config);
    let path = entry_path(path.as_ref(), config)?;
    debug!(target: TARGET, path = %path.display(), "Reading script");

    let source = fs.read_source(&path).map_err(|source| EbsError::Source {
        path: path.display().to_string(),
        source,
    })?;
    let program = parse_program(&source)?;

    let mut file_config = config.clone().with_script_path(&path);
    if let Some(dir) = path.parent() {
        file_config.root_dir = dir.to_path_buf();
    }
    run_program(&program, &file_config, builtins, Vec::new())
}

/// Run `source` with the global config, or the default one if none is set
pub fn quick_run(source: &str) -> Result<RunOutput, EbsError> {
    match get_config() {
        Some(config) => run(source, config),
        None => run(source, &RunConfig::default()),
    }
}

fn build_interpreter<B>(config: &RunConfig, builtins: B, capture: Option<CaptureSink>) -> Interpreter
where
    B: BuiltinProvider + 'static,
{
    let resolver = ModuleResolver::new(Box::new(file_system(config)), &config.root_dir);
    let mut interpreter = Interpreter::new()
        .with_builtins(builtins)
        .with_limits(config.limits.clone())
        .with_resolver(resolver);
    if let Some(sink) = capture {
        interpreter = interpreter.with_output(sink);
    }
    if let Some(path) = &config.script_path {
        interpreter = interpreter.with_script_path(path);
    }
    interpreter
}

/// Relative script paths are taken from the working directory on the OS
/// file system, and from the root directory on a custom one.
fn entry_path(path: &Path, config: &RunConfig) -> Result<PathBuf, EbsError> {
    if path.is_absolute() {
        return Ok(ebs_vfs::normalize(path));
    }
    let base = match config.file_system {
        Some(_) => config.root_dir.clone(),
        None => std::env::current_dir().map_err(|e| EbsError::Source {
            path: path.display().to_string(),
            source: VfsError::from(e),
        })?,
    };
    Ok(ebs_vfs::normalize(&base.join(path)))
}

fn file_system(config: &RunConfig) -> SharedFileSystem {
    match &config.file_system {
        Some(fs) => SharedFileSystem(Arc::clone(fs)),
        None => SharedFileSystem(Arc::new(NativeFileSystem::new())),
    }
}

/// A configured file system, handed to each resolver without copying it
struct SharedFileSystem(Arc<dyn VirtualFileSystem>);

impl VirtualFileSystem for SharedFileSystem {
    fn read_file(&self, path: &Path) -> VfsResult<Vec<u8>> {
        self.0.read_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.0.exists(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.0.is_file(path)
    }
}
