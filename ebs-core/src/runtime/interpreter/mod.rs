//! Tree-walking interpreter
//!
//! Statements finish with a [`Flow`]; errors travel separately as
//! `Err(RuntimeError)`, so `try` only ever sees real errors and loops and
//! calls only ever see control-flow signals.

mod call;
mod execution;
mod index;
mod operators;

pub use call::ArgValue;
pub use operators::{binary, compare, equals, unary};

use crate::compiler::module::ModuleResolver;
use crate::compiler::parser::program::{FunctionDecl, Program, TypeDef, TypeDefDecl};
use crate::compiler::parser::stmt::LoopKind;
use crate::compiler::parser::type_expr::{ArrayDims, BaseType, TypeExpr};
use crate::runtime::array::ArrayShape;
use crate::runtime::builtins::{BuiltinProvider, BuiltinRegistry};
use crate::runtime::environment::{EnvRef, Environment, NameMap};
use crate::runtime::error::{ErrorKind, RuntimeError, RuntimeResult};
use crate::runtime::output::{OutputSink, StdoutSink};
use crate::runtime::types::{BitmapType, FieldType, RecordType, TypeDesc};
use crate::runtime::value::Value;
use ebs_config::LimitConfig;
use ebs_vfs::path::{normalize, to_key};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, trace, warn};

const TARGET: &str = "ebs::interpreter";

/// Remaining stack below which a nested evaluation or call moves to a
/// fresh segment
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROWTH: usize = 2 * 1024 * 1024;

/// How a statement finished
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    /// `break`/`exit`, optionally naming the loop keyword it leaves
    Break(Option<LoopKind>),
    Continue,
    Return(Value),
}

/// Per-loop iteration counter for `max_loop_iterations`
struct LoopGuard {
    limit: Option<u64>,
    count: u64,
}

impl LoopGuard {
    fn tick(&mut self) -> RuntimeResult<()> {
        self.count += 1;
        match self.limit {
            Some(limit) if self.count > limit => Err(RuntimeError::validation_error(format!(
                "Loop exceeded {limit} iterations"
            ))),
            _ => Ok(()),
        }
    }
}

pub struct Interpreter {
    globals: EnvRef,
    /// Innermost scope of the statement being executed
    env: EnvRef,
    functions: NameMap<Rc<FunctionDecl>>,
    types: NameMap<TypeDesc>,
    builtins: Box<dyn BuiltinProvider>,
    output: Box<dyn OutputSink>,
    limits: LimitConfig,
    depth: usize,
    resolver: Option<ModuleResolver>,
    /// File whose statements are running; imports resolve against it
    current_file: Option<PathBuf>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Environment::new();
        Self {
            env: Rc::clone(&globals),
            globals,
            functions: NameMap::new(),
            types: NameMap::new(),
            builtins: Box::new(BuiltinRegistry::new()),
            output: Box::new(StdoutSink),
            limits: LimitConfig::default(),
            depth: 0,
            resolver: None,
            current_file: None,
        }
    }

    pub fn with_builtins(mut self, builtins: impl BuiltinProvider + 'static) -> Self {
        self.builtins = Box::new(builtins);
        self
    }

    pub fn with_output(mut self, output: impl OutputSink + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    pub fn with_limits(mut self, limits: LimitConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Source of imported files; without one every import fails
    pub fn with_resolver(mut self, resolver: ModuleResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Path of the entry script, the base for its relative imports
    pub fn with_script_path(mut self, path: impl AsRef<Path>) -> Self {
        self.current_file = Some(normalize(path.as_ref()));
        self
    }

    pub fn limits(&self) -> &LimitConfig {
        &self.limits
    }

    pub fn resolver(&self) -> Option<&ModuleResolver> {
        self.resolver.as_ref()
    }

    pub fn define_global(&mut self, name: &str, value: Value) {
        self.globals.borrow_mut().define_value(name, value);
    }

    /// Read a global binding back after a run
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).ok()
    }

    pub fn global_names(&self) -> Vec<String> {
        self.globals.borrow().local_names()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    pub fn type_desc(&self, name: &str) -> Option<TypeDesc> {
        self.types.get(name).cloned()
    }

    pub fn run(&mut self, program: &Program) -> RuntimeResult<Value> {
        self.run_with_bindings(program, std::iter::empty())
    }

    /// Execute `program` against the global scope. `bindings` are defined
    /// first; a top-level `return` value becomes the result.
    pub fn run_with_bindings<I>(&mut self, program: &Program, bindings: I) -> RuntimeResult<Value>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        for (name, value) in bindings {
            self.define_global(&name, value);
        }
        if let Some(resolver) = &mut self.resolver {
            resolver.reset_imports();
            if let Some(file) = &self.current_file {
                resolver.mark_imported(file);
            }
        }
        self.env = Rc::clone(&self.globals);
        self.depth = 0;

        debug!(
            target: TARGET,
            imports = program.imports.len(),
            functions = program.functions.len(),
            statements = program.statements.len(),
            "Running program"
        );

        let result = self.load_program(program);
        self.env = Rc::clone(&self.globals);

        match result {
            Ok(Flow::Return(value)) => Ok(value),
            Ok(_) => Ok(Value::Null),
            Err(e) => {
                debug!(target: TARGET, error = %e, line = ?e.line, "Uncaught runtime error");
                Err(e)
            }
        }
    }

    /// Imports, then declarations, then top-level statements
    fn load_program(&mut self, program: &Program) -> RuntimeResult<Flow> {
        for import in &program.imports {
            self.import(&import.path)
                .map_err(|e| e.at_line(import.line))?;
        }
        self.register_types(&program.types)?;
        self.register_functions(&program.functions);
        self.exec_statements(&program.statements)
    }

    fn import(&mut self, path: &str) -> RuntimeResult<()> {
        let Some(resolver) = self.resolver.as_mut() else {
            return Err(RuntimeError::not_found(format!(
                "Import file not found: '{path}' (no module source configured)"
            )));
        };
        let (resolved, program) = resolver.load(self.current_file.as_deref(), path)?;
        if !resolver.mark_imported(&resolved) {
            trace!(target: TARGET, path = %to_key(&resolved), "Already imported");
            return Ok(());
        }

        debug!(target: TARGET, path = %to_key(&resolved), "Importing");
        let previous_file = self.current_file.replace(resolved);
        let previous_env = std::mem::replace(&mut self.env, Rc::clone(&self.globals));
        // a top-level return ends only the imported file
        let result = self.load_program(&program).map(|_| ());
        self.env = previous_env;
        self.current_file = previous_file;
        result
    }

    fn register_functions(&mut self, functions: &[FunctionDecl]) {
        for func in functions {
            if let Some(existing) = self.functions.get(&func.name) {
                if **existing != *func {
                    warn!(target: TARGET, name = %func.name, "Function redefined, previous definition replaced");
                }
            }
            trace!(target: TARGET, name = %func.name, "Register function");
            self.functions.insert(&func.name, Rc::new(func.clone()));
        }
    }

    /// Register type definitions. Definitions may refer to types defined
    /// later in the same file, so unresolved names are retried until no
    /// progress is made.
    fn register_types(&mut self, types: &[TypeDefDecl]) -> RuntimeResult<()> {
        let mut pending: Vec<&TypeDefDecl> = types.iter().collect();

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            let mut last_error = None;

            for decl in pending {
                match self.build_type(decl) {
                    Ok(desc) => {
                        if let Some(existing) = self.types.get(&decl.name) {
                            if !existing.same_as(&desc) {
                                warn!(target: TARGET, name = %decl.name, "Type redefined, previous definition replaced");
                            }
                        }
                        trace!(target: TARGET, name = %decl.name, "Register type");
                        self.types.insert(&decl.name, desc);
                    }
                    Err(e) if e.kind == ErrorKind::NotFoundError => {
                        last_error = Some(e.at_line(decl.line));
                        deferred.push(decl);
                    }
                    Err(e) => return Err(e.at_line(decl.line)),
                }
            }

            if deferred.len() == before {
                return Err(last_error
                    .unwrap_or_else(|| RuntimeError::not_found("Unresolved type definitions")));
            }
            pending = deferred;
        }
        Ok(())
    }

    fn build_type(&mut self, decl: &TypeDefDecl) -> RuntimeResult<TypeDesc> {
        Ok(match &decl.def {
            TypeDef::Record(fields) => {
                let mut resolved = Vec::with_capacity(fields.len());
                for field in fields {
                    resolved.push(FieldType {
                        name: field.name.clone(),
                        ty: self.resolve_type(&field.ty)?,
                    });
                }
                TypeDesc::Record(Rc::new(RecordType {
                    name: decl.name.clone(),
                    fields: resolved,
                }))
            }
            TypeDef::Bitmap { word, fields } => TypeDesc::Bitmap(Rc::new(BitmapType {
                name: decl.name.clone(),
                word: *word,
                fields: fields.clone(),
            })),
            TypeDef::Alias(alias) => self.resolve_type(alias)?,
        })
    }

    /// Resolve a written type. Array extents are evaluated in the current
    /// scope.
    pub(crate) fn resolve_type(&mut self, ty: &TypeExpr) -> RuntimeResult<TypeDesc> {
        let base = self.resolve_base(&ty.base)?;

        let shape = match &ty.dims {
            None => return Ok(base),
            Some(ArrayDims::Dynamic) => ArrayShape::Dynamic,
            Some(ArrayDims::Fixed(extents)) => {
                let mut dims = Vec::with_capacity(extents.len());
                for extent in extents {
                    let value = self.evaluate(extent)?;
                    let n = value.as_i64().ok_or_else(|| {
                        RuntimeError::type_error(format!(
                            "Array size must be an integer, got {}",
                            value.type_name()
                        ))
                    })?;
                    let n = usize::try_from(n).map_err(|_| {
                        RuntimeError::index_error(format!("Invalid array size {n}"))
                    })?;
                    dims.push(n);
                }
                ArrayShape::from_dims(dims)?
            }
        };

        Ok(TypeDesc::Array {
            elem: Box::new(base),
            shape,
        })
    }

    fn resolve_base(&self, base: &BaseType) -> RuntimeResult<TypeDesc> {
        Ok(match base {
            BaseType::Byte => TypeDesc::Byte,
            BaseType::Int => TypeDesc::Int,
            BaseType::Long => TypeDesc::Long,
            BaseType::Float => TypeDesc::Float,
            BaseType::Double => TypeDesc::Double,
            BaseType::String => TypeDesc::String,
            BaseType::Date => TypeDesc::Date,
            BaseType::Bool => TypeDesc::Bool,
            BaseType::Json => TypeDesc::Json,
            BaseType::Map => TypeDesc::Map,
            BaseType::Any => TypeDesc::Any,
            BaseType::Queue(elem) => TypeDesc::Queue(Box::new(self.resolve_base(elem)?)),
            BaseType::Named(name) => self
                .types
                .get(name)
                .cloned()
                .ok_or_else(|| RuntimeError::not_found(format!("Unknown type '{name}'")))?,
        })
    }

    fn loop_guard(&self) -> LoopGuard {
        LoopGuard {
            limit: self.limits.max_loop_iterations,
            count: 0,
        }
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("functions", &self.functions.len())
            .field("types", &self.types.len())
            .field("limits", &self.limits)
            .field("current_file", &self.current_file)
            .finish()
    }
}
